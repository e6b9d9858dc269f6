/*
 * Responsibility
 * - URL structure of the pages behind the gate
 * - The login form is served on both login paths; a POST only reaches the
 *   handler when the gate did not take it (missing/blank fields)
 * - Which paths are protected is decided by the role rules, not here
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::handlers::{
    health::health,
    login::login_form,
    pages::{account, admin, home},
};
use crate::shield::ShieldConfig;
use crate::state::AppState;

pub fn routes(config: &ShieldConfig) -> Router<AppState> {
    let router = Router::new()
        .route("/health", get(health))
        .route("/", get(home))
        .route("/account", get(account))
        .route("/admin", get(admin));

    if config.login_path == config.login_path_post {
        router.route(&config.login_path, get(login_form).post(login_form))
    } else {
        router
            .route(&config.login_path, get(login_form))
            .route(&config.login_path_post, post(login_form))
    }
}
