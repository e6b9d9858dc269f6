//! Runs the form-login gate in front of every route.
//!
//! Requires the session middleware to sit outside this one: the gate works on
//! the `Session` that middleware puts into request extensions.
//!
//! Layering (outermost last):
//! ```ignore
//! let router = middleware::shield::apply(router, state.clone());
//! let router = middleware::session::apply(router, state.clone());
//! ```

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderValue, Request, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::services::session::Session;
use crate::shield::Decision;
use crate::state::AppState;

pub fn apply(router: Router, state: AppState) -> Router {
    router.layer(middleware::from_fn_with_state(state, shield_middleware))
}

async fn shield_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let session = req.extensions().get::<Session>().cloned().ok_or_else(|| {
        tracing::error!("no session in request extensions; is the session layer installed?");
        AppError::Internal
    })?;

    match state.shield.handle(&session, req).await? {
        Decision::Pass(req) => Ok(next.run(req).await),
        Decision::Redirect(location) => Ok(found(&location)),
    }
}

/// `302 Found` to `location`.
pub fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => {
            tracing::error!(%location, "redirect target is not a valid header value");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
