use std::time::Duration;

use async_trait::async_trait;

use crate::services::cache::CacheError;
use crate::services::session::session::{SessionData, SessionId};

pub type SessionResult<T> = Result<T, SessionError>;

/// Persistence for sessions between requests.
///
/// Any `Err` is a backend failure; callers fail the request rather than
/// continue with a session they could not read or write.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    fn backend_name(&self) -> &'static str;

    /// `Ok(None)` when the session is unknown or expired.
    async fn load(&self, id: SessionId) -> SessionResult<Option<SessionData>>;

    async fn save(&self, id: SessionId, data: &SessionData, ttl: Duration) -> SessionResult<()>;

    async fn delete(&self, id: SessionId) -> SessionResult<()>;
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("session payload error: {0}")]
    Payload(#[from] serde_json::Error),
}
