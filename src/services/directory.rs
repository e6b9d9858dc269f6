/*
 * Responsibility
 * - Load the security file (users, role rules, denial target)
 * - StaticAuthenticator: check credentials against it and reload principals
 *
 * Passwords are stored as Argon2 PHC strings, as printed by passwd-gen.
 */
use std::collections::HashMap;
use std::path::Path;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::shield::{
    Authenticator, AuthnError, Principal, SessionContext, SessionKey, principal::role_set,
};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("cannot read security file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid security file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate user: {0}")]
    DuplicateUser(String),

    #[error("password hash of {username} is not a PHC string: {reason}")]
    InvalidHash { username: String, reason: String },
}

/// Contents of the security file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityFile {
    #[serde(default)]
    pub users: Vec<UserEntry>,
    /// Path rules, first match wins.
    #[serde(default)]
    pub rules: Vec<RoleRuleEntry>,
    /// Where to send principals lacking the required roles (403 when unset).
    #[serde(default)]
    pub denied_target: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserEntry {
    pub id: Uuid,
    pub username: String,
    /// `$argon2id$v=19$...`
    pub password_hash: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleRuleEntry {
    pub pattern: String,
    pub roles: Vec<String>,
}

impl SecurityFile {
    pub fn load(path: &Path) -> Result<Self, DirectoryError> {
        let raw = std::fs::read_to_string(path).map_err(|source| DirectoryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, DirectoryError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Argon2id PHC string for `password` with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
        .is_ok()
}

/// Authenticator over a fixed user list.
///
/// Every reload goes back to the list, so after a restart with an edited file,
/// sessions that survived it (Valkey backend) pick up the new roles or the
/// `disabled` flag on their next request.
#[derive(Debug, Clone)]
pub struct StaticAuthenticator {
    by_username: HashMap<String, UserEntry>,
    by_id: HashMap<Uuid, String>,
}

impl StaticAuthenticator {
    pub fn new(users: Vec<UserEntry>) -> Result<Self, DirectoryError> {
        let mut by_username = HashMap::with_capacity(users.len());
        let mut by_id = HashMap::with_capacity(users.len());

        for user in users {
            if by_id.contains_key(&user.id) || by_username.contains_key(&user.username) {
                return Err(DirectoryError::DuplicateUser(user.username));
            }
            if let Err(err) = PasswordHash::new(&user.password_hash) {
                return Err(DirectoryError::InvalidHash {
                    username: user.username,
                    reason: err.to_string(),
                });
            }
            by_id.insert(user.id, user.username.clone());
            by_username.insert(user.username.clone(), user);
        }

        Ok(Self { by_username, by_id })
    }

    fn principal(user: &UserEntry) -> Principal {
        Principal {
            id: user.id,
            username: user.username.clone(),
            roles: role_set(user.roles.iter().cloned()),
        }
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn authenticate(
        &self,
        session: &dyn SessionContext,
        username: &str,
        password: &str,
    ) -> Result<(), AuthnError> {
        let Some(user) = self.by_username.get(username) else {
            tracing::info!(%username, "login rejected: unknown user");
            return Err(AuthnError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash) {
            tracing::info!(%username, "login rejected: wrong password");
            return Err(AuthnError::InvalidCredentials);
        }

        if user.disabled {
            tracing::info!(%username, "login rejected: account disabled");
            return Err(AuthnError::Disabled(user.username.clone()));
        }

        let principal = serde_json::to_value(Self::principal(user))
            .map_err(|e| AuthnError::Backend(e.to_string()))?;
        session.set(SessionKey::User, principal);
        session.renew();

        tracing::info!(%username, "user signed in");
        Ok(())
    }

    async fn reload_user(&self, principal: &Principal) -> Result<Option<Principal>, AuthnError> {
        let user = self
            .by_id
            .get(&principal.id)
            .and_then(|username| self.by_username.get(username))
            .filter(|user| !user.disabled);

        Ok(user.map(Self::principal))
    }
}
