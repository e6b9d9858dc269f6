//! Session contract consumed by the gate.
//!
//! The gate never sees how sessions are stored. It reads and writes a handful
//! of named entries through [`SessionContext`], and the keys it may use are the
//! variants of [`SessionKey`].

use serde_json::Value;

use crate::shield::principal::Principal;

/// Session entries the gate and its collaborators know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
    /// The authenticated principal (`user`).
    User,
    /// Page to return to after a successful login (`login.target`).
    LoginTarget,
}

impl SessionKey {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::LoginTarget => "login.target",
        }
    }
}

/// Per-session key-value storage.
///
/// Implementations must give read-your-writes within one request; anything
/// beyond that (persistence, locking across requests) is theirs to decide.
pub trait SessionContext: Send + Sync {
    fn get(&self, key: SessionKey) -> Option<Value>;

    fn set(&self, key: SessionKey, value: Value);

    fn remove(&self, key: SessionKey);

    /// Drop every entry, not only the ones named by `SessionKey`.
    fn clear(&self);

    /// Keep the entries but move them to a new session identifier, so an id
    /// known before sign-in stops working. No-op for contexts without ids.
    fn renew(&self) {}

    fn get_or(&self, key: SessionKey, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }
}

/// The principal stored under `user`, if there is one and it is well-formed.
pub fn current_user(session: &dyn SessionContext) -> Option<Principal> {
    let value = session.get(SessionKey::User)?;

    match serde_json::from_value(value) {
        Ok(user) => Some(user),
        Err(err) => {
            tracing::warn!(error = %err, "session holds a malformed principal; ignoring it");
            None
        }
    }
}
