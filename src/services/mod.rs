pub mod cache;
pub mod directory;
pub mod events;
pub mod roles;
pub mod session;
