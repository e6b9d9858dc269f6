/*
 * Responsibility
 * - Application-wide AppError
 * - IntoResponse (HTTP status / JSON error body)
 * - Turns gate failures (authentication, authorization) into responses;
 *   the gate itself never interprets them
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::middleware::shield::found;
use crate::shield::{AuthnError, AuthzError, ShieldError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Shield(#[from] ShieldError),

    #[error("unauthorized")]
    Unauthorized,

    #[error("internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Shield(ShieldError::Authentication(
                AuthnError::InvalidCredentials | AuthnError::Disabled(_),
            )) => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "invalid username or password".into(),
            ),
            AppError::Shield(ShieldError::Authentication(AuthnError::Backend(err))) => {
                tracing::error!(error = %err, "authentication backend failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "internal server error".into(),
                )
            }
            AppError::Shield(ShieldError::Authorization(AuthzError::Forbidden)) => {
                (StatusCode::FORBIDDEN, "FORBIDDEN", "forbidden".into())
            }
            AppError::Shield(ShieldError::Authorization(AuthzError::Redirect { location })) => {
                return found(&location);
            }
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "unauthorized".into(),
            ),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "internal server error".into(),
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}
