/*
 * Responsibility
 * - Request-local Session (implements the gate's SessionContext)
 * - SessionStore contract + memory / Valkey backends
 */
pub mod memory;
#[allow(clippy::module_inception)]
pub mod session;
pub mod store;
pub mod valkey;

pub use memory::MemorySessionStore;
pub use session::{Session, SessionData, SessionId};
pub use store::{SessionError, SessionResult, SessionStore};
pub use valkey::ValkeySessionStore;
