/*
 * Responsibility
 * - Router-level layers, each exposed as `apply(router, ...)`
 * - Order matters: see app::build_router
 */
pub mod http;
pub mod security_headers;
pub mod session;
pub mod shield;
