//! The login form.
//!
//! Field names and the form action follow the gate configuration, so the form
//! always posts what the gate looks for.

use axum::{extract::State, response::Html};

use crate::state::AppState;

pub async fn login_form(State(state): State<AppState>) -> Html<String> {
    let config = state.shield.config();
    Html(render_form(
        &config.login_path_post,
        &config.username_field,
        &config.password_field,
    ))
}

fn render_form(action: &str, username_field: &str, password_field: &str) -> String {
    format!(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Sign in</title></head>
<body>
<form method="post" action="{action}">
<label>Username <input type="text" name="{username}" autocomplete="username" required></label>
<label>Password <input type="password" name="{password}" autocomplete="current-password" required></label>
<button type="submit">Sign in</button>
</form>
</body>
</html>
"#,
        action = escape_attr(action),
        username = escape_attr(username_field),
        password = escape_attr(password_field),
    )
}

pub(crate) fn escape_attr(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
