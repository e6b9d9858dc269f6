/*
 * Responsibility
 * - Contracts for everything the gate delegates: credential checks, user
 *   reload, role lookup, authorization and event delivery.
 * - Each contract has one concrete implementation per deployment
 *   (see services/), and fakes in tests.
 */
use async_trait::async_trait;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::shield::context::SessionContext;
use crate::shield::principal::{Principal, RoleSet};

/// Failures raised by an `Authenticator`.
///
/// The gate forwards these untouched; mapping them to responses belongs to the
/// application's error layer.
#[derive(Debug, Error)]
pub enum AuthnError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account disabled: {0}")]
    Disabled(String),

    #[error("user directory error: {0}")]
    Backend(String),
}

/// Denials raised by an `Authorizer`.
#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("forbidden")]
    Forbidden,

    #[error("access denied; redirect to {location}")]
    Redirect { location: String },
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Verify the credentials and establish the principal in `session`.
    async fn authenticate(
        &self,
        session: &dyn SessionContext,
        username: &str,
        password: &str,
    ) -> Result<(), AuthnError>;

    /// Re-read `principal` from the source of truth.
    ///
    /// `Ok(None)` means the identity is gone (deleted, revoked, disabled).
    async fn reload_user(&self, principal: &Principal) -> Result<Option<Principal>, AuthnError>;
}

pub trait Authorizer: Send + Sync {
    fn authorize(&self, principal: &Principal, required: &RoleSet) -> Result<(), AuthzError>;
}

pub trait RoleResolver: Send + Sync {
    /// Roles needed to access the request. Empty means public.
    fn roles_for(&self, parts: &Parts) -> RoleSet;
}

/// Fire-and-forget delivery of security events.
///
/// Implementations report their own delivery failures; nothing is returned to
/// the caller.
pub trait Notifier: Send + Sync {
    fn emit(&self, event: SecurityEvent);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event")]
pub enum SecurityEvent {
    #[serde(rename = "security.logout")]
    Logout {
        principal: Option<Principal>,
        at: DateTime<Utc>,
    },
}

impl SecurityEvent {
    pub const LOGOUT: &'static str = "security.logout";

    pub fn logout(principal: Option<Principal>) -> Self {
        Self::Logout {
            principal,
            at: Utc::now(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Logout { .. } => Self::LOGOUT,
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Self::Logout { principal, .. } => principal.as_ref(),
        }
    }
}
