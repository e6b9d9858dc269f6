use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::shield::Principal;
use crate::state::AppState;

/// The principal the gate authorized for this request.
///
/// The gate inserts it into request extensions only on protected paths, so
/// using this on a public route always rejects with 401.
pub struct CurrentUser(pub Principal);

impl FromRequestParts<AppState> for CurrentUser
where
    AppState: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(CurrentUser)
            .ok_or(AppError::Unauthorized)
    }
}
