use std::time::Duration;

use async_trait::async_trait;

use crate::services::{
    cache::{CacheClient, ValkeyClient},
    session::{
        session::{SessionData, SessionId},
        store::{SessionResult, SessionStore},
    },
};

/// Valkey-backed session store (Redis protocol).
///
/// Each session is one JSON object under `<prefix>:<id>`, expiring with the
/// session TTL.
#[derive(Clone)]
pub struct ValkeySessionStore<C: CacheClient> {
    cache: C,
    // Key prefix to avoid collisions with other users of the same instance
    prefix: String,
}

impl ValkeySessionStore<ValkeyClient> {
    pub async fn new(redis_url: &str) -> SessionResult<Self> {
        Self::new_with_prefix(redis_url, "session").await
    }

    pub async fn new_with_prefix(
        redis_url: &str,
        prefix: impl Into<String>,
    ) -> SessionResult<Self> {
        let client = ValkeyClient::new(redis_url).await?;

        Ok(Self::new_with_cache(client, prefix))
    }
}

impl<C: CacheClient> ValkeySessionStore<C> {
    pub fn new_with_cache(cache: C, prefix: impl Into<String>) -> Self {
        Self {
            cache,
            prefix: prefix.into(),
        }
    }

    pub fn key(&self, id: SessionId) -> String {
        format!("{}:{}", self.prefix, id)
    }
}

#[async_trait]
impl<C: CacheClient> SessionStore for ValkeySessionStore<C> {
    fn backend_name(&self) -> &'static str {
        self.cache.backend_name()
    }

    async fn load(&self, id: SessionId) -> SessionResult<Option<SessionData>> {
        let Some(raw) = self.cache.get_string(&self.key(id)).await? else {
            return Ok(None);
        };

        let data = serde_json::from_str(&raw)?;
        Ok(Some(data))
    }

    async fn save(&self, id: SessionId, data: &SessionData, ttl: Duration) -> SessionResult<()> {
        let raw = serde_json::to_string(data)?;
        self.cache.set_with_ttl(&self.key(id), &raw, ttl).await?;
        Ok(())
    }

    async fn delete(&self, id: SessionId) -> SessionResult<()> {
        self.cache.del(&self.key(id)).await?;
        Ok(())
    }
}
