use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::services::session::session::{SessionData, SessionId};
use crate::services::session::store::{SessionResult, SessionStore};

/// Expired entries are swept once every this many writes.
pub const SWEEP_EVERY: usize = 64;

/// Process-local session store. Sessions vanish on restart.
///
/// Expired sessions are dropped when loaded and by a sweep that runs every
/// [`SWEEP_EVERY`] saves, so abandoned sessions do not pile up.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    entries: Arc<RwLock<HashMap<SessionId, Entry>>>,
    writes: Arc<AtomicUsize>,
}

struct Entry {
    data: SessionData,
    expires_at: Instant,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live sessions (expired entries not yet evicted are excluded).
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        before - entries.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self, id: SessionId) -> SessionResult<Option<SessionData>> {
        let now = Instant::now();

        {
            let entries = self.entries.read();
            match entries.get(&id) {
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.data.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // expired: evict
        self.entries.write().remove(&id);
        Ok(None)
    }

    async fn save(&self, id: SessionId, data: &SessionData, ttl: Duration) -> SessionResult<()> {
        let entry = Entry {
            data: data.clone(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().insert(id, entry);

        if (self.writes.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_EVERY == 0 {
            let removed = self.purge_expired();
            if removed > 0 {
                tracing::debug!(removed, "expired sessions swept");
            }
        }
        Ok(())
    }

    async fn delete(&self, id: SessionId) -> SessionResult<()> {
        self.entries.write().remove(&id);
        Ok(())
    }
}
