/*
 * Responsibility
 * - The authentication gate (FormShield) and the contracts it depends on
 * - Nothing here knows about cookies, stores or HTTP servers
 */
pub mod collaborators;
pub mod config;
pub mod context;
pub mod form;
pub mod gate;
pub mod principal;

pub use collaborators::{
    Authenticator, AuthnError, Authorizer, AuthzError, Notifier, RoleResolver, SecurityEvent,
};
pub use config::ShieldConfig;
pub use context::{SessionContext, SessionKey, current_user};
pub use gate::{Decision, FormShield, ShieldError};
pub use principal::{Principal, RoleSet, role_set};
