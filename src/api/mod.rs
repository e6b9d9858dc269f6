/*
 * Responsibility
 * - Page/endpoint surface behind the gate; re-exports routes()
 */
pub mod extractors;
pub mod handlers;
mod routes;

pub use routes::routes;
