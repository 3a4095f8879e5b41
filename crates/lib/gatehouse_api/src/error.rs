//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gatehouse_core::auth::AuthError;
use gatehouse_core::exec::GateError;
use gatehouse_core::store::StoreError;
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            AppError::Conflict(m) => (StatusCode::CONFLICT, "conflict", m.as_str()),
            AppError::Unprocessable(m) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "unprocessable", m.as_str())
            }
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str()),
            AppError::Internal(detail) => {
                error!("internal error: {detail}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidRequest(msg) => AppError::Validation(msg),
            AuthError::Unauthenticated(msg) => AppError::Unauthorized(msg),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<GateError> for AppError {
    fn from(e: GateError) -> Self {
        match e {
            GateError::NotFound(msg) => AppError::NotFound(msg),
            e @ GateError::Conflict(_) => AppError::Conflict(e.to_string()),
            GateError::PreconditionFailed(msg) => AppError::Validation(msg),
            e @ GateError::PluginNotEnabled(_) => AppError::Unprocessable(e.to_string()),
            GateError::Client(msg) => AppError::Validation(msg),
            GateError::Storage(e) => AppError::from(e),
            GateError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_errors_map_to_status_codes() {
        let cases = [
            (GateError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (GateError::Conflict("s1".into()), StatusCode::CONFLICT),
            (
                GateError::PreconditionFailed("x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                GateError::PluginNotEnabled("pg".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                GateError::Storage(StoreError::Invalid("x".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn auth_errors_map_to_status_codes() {
        let resp = AppError::from(AuthError::invalid_authentication()).into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let resp = AppError::from(AuthError::InvalidRequest("missing client origin".into()))
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
