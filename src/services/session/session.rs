use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::shield::context::{SessionContext, SessionKey};

/// Everything stored for one session.
pub type SessionData = HashMap<String, Value>;

/// Opaque session identifier carried in the session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim()).ok().map(Self)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Request-local view of a session.
///
/// Loaded once by the session middleware, shared (cheap clone) between the
/// middleware, the gate and handlers, then persisted if it was modified.
#[derive(Clone, Default)]
pub struct Session {
    inner: Arc<Mutex<SessionInner>>,
}

#[derive(Default)]
struct SessionInner {
    id: Option<SessionId>,
    // id given up by `renew`, still to be deleted from the store
    retired: Option<SessionId>,
    data: SessionData,
    modified: bool,
}

impl Session {
    /// A session that has never been stored.
    pub fn fresh() -> Self {
        Self::default()
    }

    pub fn loaded(id: SessionId, data: SessionData) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                id: Some(id),
                retired: None,
                data,
                modified: false,
            })),
        }
    }

    pub fn id(&self) -> Option<SessionId> {
        self.inner.lock().id
    }

    /// Existing id, or a newly generated one that sticks to this session.
    pub fn ensure_id(&self) -> SessionId {
        let mut inner = self.inner.lock();
        *inner.id.get_or_insert_with(SessionId::generate)
    }

    pub fn is_modified(&self) -> bool {
        self.inner.lock().modified
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().data.is_empty()
    }

    pub fn snapshot(&self) -> SessionData {
        self.inner.lock().data.clone()
    }

    /// The id dropped by the last `renew`, if it was never deleted yet.
    pub fn take_retired(&self) -> Option<SessionId> {
        self.inner.lock().retired.take()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        // values may hold credentials-adjacent data; keys only
        f.debug_struct("Session")
            .field("id", &inner.id)
            .field("keys", &inner.data.keys().collect::<Vec<_>>())
            .field("modified", &inner.modified)
            .finish()
    }
}

impl SessionContext for Session {
    fn get(&self, key: SessionKey) -> Option<Value> {
        self.inner.lock().data.get(key.as_str()).cloned()
    }

    fn set(&self, key: SessionKey, value: Value) {
        let mut inner = self.inner.lock();
        inner.data.insert(key.as_str().to_string(), value);
        inner.modified = true;
    }

    fn remove(&self, key: SessionKey) {
        let mut inner = self.inner.lock();
        if inner.data.remove(key.as_str()).is_some() {
            inner.modified = true;
        }
    }

    fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.data.clear();
        inner.modified = true;
    }

    fn renew(&self) {
        let mut inner = self.inner.lock();
        if let Some(old) = inner.id.take() {
            // a second renew in the same request keeps the stored id as the one to delete
            inner.retired.get_or_insert(old);
        }
        inner.modified = true;
    }
}
