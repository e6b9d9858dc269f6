//! The form-login gate.
//!
//! One call to [`FormShield::handle`] per request, before routing:
//!
//! - `login.path_post`: POSTed credentials are checked and the visitor is sent on
//! - `logout.path`: the session is wiped and the visitor is sent to `logout.target`
//! - any other path: if the role resolver says it is protected, a valid
//!   principal holding the roles is required, otherwise the visitor goes to
//!   `login.path`
//!
//! Paths are compared for exact string equality, login first.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
};
use serde_json::Value;
use thiserror::Error;

use crate::shield::{
    collaborators::{
        Authenticator, AuthnError, Authorizer, AuthzError, Notifier, RoleResolver, SecurityEvent,
    },
    config::ShieldConfig,
    context::{SessionContext, SessionKey, current_user},
    form::Credentials,
    principal::Principal,
};

/// Largest login body the gate will buffer.
pub const DEFAULT_LOGIN_BODY_LIMIT: usize = 64 * 1024;

/// What the caller should do with the request.
#[derive(Debug)]
pub enum Decision {
    /// No decision: continue with normal handling. The request is handed back
    /// unchanged apart from the authorized `Principal` in its extensions.
    Pass(Request<Body>),
    /// Short-circuit with a redirect to this location.
    Redirect(String),
}

impl Decision {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass(_))
    }

    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Redirect(location) => Some(location.as_str()),
            Self::Pass(_) => None,
        }
    }
}

/// Collaborator failures, forwarded as-is.
#[derive(Debug, Error)]
pub enum ShieldError {
    #[error(transparent)]
    Authentication(#[from] AuthnError),

    #[error(transparent)]
    Authorization(#[from] AuthzError),
}

pub struct FormShield {
    config: Arc<ShieldConfig>,
    authenticator: Arc<dyn Authenticator>,
    authorizer: Arc<dyn Authorizer>,
    roles: Arc<dyn RoleResolver>,
    notifier: Arc<dyn Notifier>,
    login_body_limit: usize,
}

impl FormShield {
    pub fn new(
        config: Arc<ShieldConfig>,
        authenticator: Arc<dyn Authenticator>,
        authorizer: Arc<dyn Authorizer>,
        roles: Arc<dyn RoleResolver>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            authenticator,
            authorizer,
            roles,
            notifier,
            login_body_limit: DEFAULT_LOGIN_BODY_LIMIT,
        }
    }

    #[must_use]
    pub fn with_login_body_limit(mut self, limit: usize) -> Self {
        self.login_body_limit = limit;
        self
    }

    pub fn config(&self) -> &ShieldConfig {
        &self.config
    }

    pub async fn handle(
        &self,
        session: &dyn SessionContext,
        req: Request<Body>,
    ) -> Result<Decision, ShieldError> {
        let path = req.uri().path().to_owned();

        if path == self.config.login_path_post {
            return self.handle_form_login(session, req).await;
        }

        if path == self.config.logout_path {
            return Ok(self.handle_logout(session));
        }

        let (mut parts, body) = req.into_parts();

        let required = self.roles.roles_for(&parts);
        if required.is_empty() {
            return Ok(Decision::Pass(Request::from_parts(parts, body)));
        }

        let user = match current_user(session) {
            Some(user) => self.reload(&user).await,
            None => None,
        };

        let Some(user) = user else {
            if self.config.use_referrer {
                session.set(SessionKey::LoginTarget, Value::String(path.clone()));
            }
            tracing::debug!(%path, "protected path without a valid principal");
            return Ok(Decision::Redirect(self.config.login_path.clone()));
        };

        self.authorizer.authorize(&user, &required)?;

        tracing::debug!(%path, user = %user.username, "authorized");
        parts.extensions.insert(user);
        Ok(Decision::Pass(Request::from_parts(parts, body)))
    }

    async fn handle_form_login(
        &self,
        session: &dyn SessionContext,
        req: Request<Body>,
    ) -> Result<Decision, ShieldError> {
        if req.method() != Method::POST {
            return Ok(Decision::Pass(req));
        }

        let (parts, body) = req.into_parts();

        let bytes = match axum::body::to_bytes(body, self.login_body_limit).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::debug!(error = %err, "login body could not be read");
                return Ok(Decision::Pass(Request::from_parts(parts, Body::empty())));
            }
        };

        let credentials = Credentials::extract(
            &parts.headers,
            &bytes,
            &self.config.username_field,
            &self.config.password_field,
        )
        .await;

        // Downstream handlers get the body back untouched.
        let Some(credentials) = credentials else {
            return Ok(Decision::Pass(Request::from_parts(parts, Body::from(bytes))));
        };

        self.authenticator
            .authenticate(session, &credentials.username, &credentials.password)
            .await?;

        let target = self.login_redirect_target(session);
        tracing::debug!(user = %credentials.username, %target, "login accepted");

        Ok(Decision::Redirect(target))
    }

    fn handle_logout(&self, session: &dyn SessionContext) -> Decision {
        let user = current_user(session);

        session.clear();
        self.notifier.emit(SecurityEvent::logout(user));

        Decision::Redirect(self.config.logout_target.clone())
    }

    fn login_redirect_target(&self, session: &dyn SessionContext) -> String {
        if !self.config.use_referrer {
            return self.config.login_target.clone();
        }

        let target = session
            .get(SessionKey::LoginTarget)
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_else(|| self.config.login_target.clone());
        session.remove(SessionKey::LoginTarget);

        target
    }

    async fn reload(&self, user: &Principal) -> Option<Principal> {
        match self.authenticator.reload_user(user).await {
            Ok(reloaded) => reloaded,
            Err(err) => {
                tracing::warn!(
                    user = %user.username,
                    error = %err,
                    "principal reload failed; treating session as signed out"
                );
                None
            }
        }
    }
}
