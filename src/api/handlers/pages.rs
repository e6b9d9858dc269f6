/*
 * Responsibility
 * - Sample pages: a public home page and two protected ones
 * - Protected handlers take CurrentUser; the gate has already checked roles
 */
use axum::{Extension, extract::State, response::Html};

use crate::api::extractors::current_user::CurrentUser;
use crate::api::handlers::login::escape_attr;
use crate::services::session::Session;
use crate::shield::current_user;
use crate::state::AppState;

pub async fn home(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Html<String> {
    let config = state.shield.config();
    let status = match current_user(&session) {
        Some(user) => format!(
            r#"Signed in as {}. <a href="{}">Sign out</a>"#,
            escape_attr(&user.username),
            escape_attr(&config.logout_path)
        ),
        None => format!(
            r#"<a href="{}">Sign in</a>"#,
            escape_attr(&config.login_path)
        ),
    };

    page("Home", &status)
}

pub async fn account(CurrentUser(user): CurrentUser) -> Html<String> {
    let roles = user
        .roles
        .iter()
        .map(|r| escape_attr(r))
        .collect::<Vec<_>>()
        .join(", ");

    page(
        "Account",
        &format!(
            "{} ({}), roles: {}",
            escape_attr(&user.username),
            user.id,
            roles
        ),
    )
}

pub async fn admin(CurrentUser(user): CurrentUser) -> Html<String> {
    page(
        "Admin",
        &format!("Administration for {}", escape_attr(&user.username)),
    )
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!doctype html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body>\n<h1>{title}</h1>\n<p>{body}</p>\n</body>\n</html>\n"
    ))
}
