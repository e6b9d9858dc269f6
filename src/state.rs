/*
 * Responsibility
 * - Shared context attached to the Router (AppState)
 *   - the gate, the session store, cookie settings
 * - Cheap to clone (Arc inside)
 */
use std::sync::Arc;
use std::time::Duration;

use crate::services::session::SessionStore;
use crate::shield::FormShield;

#[derive(Clone)]
pub struct AppState {
    pub shield: Arc<FormShield>,
    pub sessions: Arc<dyn SessionStore>,
    pub session_ttl: Duration,
    // adds `Secure` to the session cookie
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(
        shield: Arc<FormShield>,
        sessions: Arc<dyn SessionStore>,
        session_ttl: Duration,
        secure_cookies: bool,
    ) -> Self {
        Self {
            shield,
            sessions,
            session_ttl,
            secure_cookies,
        }
    }
}
