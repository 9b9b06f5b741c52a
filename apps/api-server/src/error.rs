//! Error types for the HTTP API.
//!
//! Every failure leaves the server as `{ "code": "...", "message": "..." }`.
//!
//! ```text
//! DbError::Domain(InsufficientStock)   → 409 INSUFFICIENT_STOCK
//! DbError::Domain(SaleNotRefundable)   → 409 SALE_NOT_REFUNDABLE
//! DbError::Domain(InvalidStatus...)    → 409 INVALID_STATUS
//! DbError::UniqueViolation             → 409 CONFLICT
//! DbError::NotFound                    → 404 NOT_FOUND
//! DbError::QueryFailed / Internal      → 500 INTERNAL (detail logged only)
//! ```

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rxpos_core::{CoreError, ValidationError};
use rxpos_db::DbError;
use serde::Serialize;
use tracing::error;

/// API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing, malformed or expired token, or bad credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed here.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Response body of every error.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(entity: &str, id: &str) -> Self {
        ApiError::NotFound(format!("{entity} not found: {id}"))
    }

    /// Status code and machine-readable code.
    pub fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
            ApiError::Db(err) => match err {
                DbError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                DbError::UniqueViolation { .. } => (StatusCode::CONFLICT, "CONFLICT"),
                DbError::ForeignKeyViolation { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                // Only quantity CHECKs can fire once input is validated.
                DbError::CheckViolation { .. } => (StatusCode::CONFLICT, "INSUFFICIENT_STOCK"),
                DbError::Domain(core) => match core {
                    CoreError::InsufficientStock { .. } => (StatusCode::CONFLICT, "INSUFFICIENT_STOCK"),
                    CoreError::NoDefaultInventory { .. } => (StatusCode::CONFLICT, "NO_DEFAULT_INVENTORY"),
                    CoreError::SaleNotRefundable { .. } => (StatusCode::CONFLICT, "SALE_NOT_REFUNDABLE"),
                    CoreError::InvalidStatusTransition { .. } => (StatusCode::CONFLICT, "INVALID_STATUS"),
                    CoreError::ProtectedAccount { .. } => (StatusCode::FORBIDDEN, "FORBIDDEN"),
                    CoreError::EmptyCart | CoreError::CartTooLarge { .. } | CoreError::Validation(_) => {
                        (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
                    }
                },
                DbError::ConnectionFailed(_)
                | DbError::MigrationFailed(_)
                | DbError::QueryFailed(_)
                | DbError::PoolExhausted
                | DbError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.classify();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorBody { code, message })).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        ApiError::Internal(format!("Token signing failed: {err}"))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_map_to_conflict() {
        let err = ApiError::from(DbError::from(CoreError::InsufficientStock {
            product: "Panadol".to_string(),
            available: 2,
            requested: 5,
        }));
        assert_eq!(err.classify(), (StatusCode::CONFLICT, "INSUFFICIENT_STOCK"));

        let err = ApiError::from(DbError::from(CoreError::transition("Sale", "REFUNDED", "REFUNDED")));
        assert_eq!(err.classify(), (StatusCode::CONFLICT, "INVALID_STATUS"));

        let err = ApiError::from(DbError::duplicate("barcode", "622"));
        assert_eq!(err.classify(), (StatusCode::CONFLICT, "CONFLICT"));
    }

    #[test]
    fn test_protected_account_is_forbidden() {
        let err = ApiError::from(DbError::from(CoreError::ProtectedAccount {
            username: "nile".to_string(),
            role: "PHARMACY_OWNER".to_string(),
        }));
        assert_eq!(err.classify(), (StatusCode::FORBIDDEN, "FORBIDDEN"));
    }

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err = ApiError::from(DbError::from(CoreError::EmptyCart));
        assert_eq!(err.classify(), (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"));
    }

    #[test]
    fn test_internal_errors_hide_detail() {
        let response = ApiError::from(DbError::QueryFailed("disk I/O error".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
