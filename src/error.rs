//! Application error type.
//!
//! One `AppError` covers the whole failure taxonomy: client input errors are
//! 400-class and never reach an external call, shipping-carrier failures are
//! absorbed before they get here, and payment-gateway failures forward the
//! gateway-reported status verbatim.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed client input; reported before any external call.
    #[error("{0}")]
    BadRequest(String),

    /// No usable bearer token.
    #[error("{0}")]
    Unauthorized(String),

    /// Token present but invalid, or role not allowed.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Uniqueness conflict (duplicate registration email).
    #[error("{0}")]
    Conflict(String),

    /// Payment gateway reported a status; forwarded as-is.
    #[error("{message}")]
    Gateway { status: u16, message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Gateway { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "request failed");
        }
        // Structured payload; the raw database error text stays in the logs.
        let message = match &self {
            Self::Database(_) => "Erro ao acessar o banco de dados".to_string(),
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_status_is_forwarded() {
        let err = AppError::Gateway { status: 400, message: "invalid payer".into() };
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unknown_gateway_status_degrades_to_bad_gateway() {
        let err = AppError::Gateway { status: 0, message: "boom".into() };
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }
}
