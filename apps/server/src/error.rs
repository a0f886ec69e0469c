//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Tally                                  │
//! │                                                                         │
//! │  Web client                  Rust Backend                               │
//! │  ──────────                  ────────────                               │
//! │                                                                         │
//! │  POST /api/sales                                                        │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Handler                                                         │  │
//! │  │  Result<T, ApiError>                                             │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Rule failure? ─── CoreError::InsufficientStock ──┐              │  │
//! │  │         │                                         │              │  │
//! │  │         ▼                                         ▼              │  │
//! │  │  Storage failure? ─── DbError::Busy ────────── ApiError ────────►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  409 { "code": "INSUFFICIENT_STOCK",                                    │
//! │        "message": "Insufficient stock for Notebook: available 4, ..." } │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tally_core::{CoreError, ValidationError};
use tally_db::DbError;

/// Error body returned by every failing endpoint.
///
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Product not found: 6f1c..."
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed (400)
    ValidationError,

    /// Missing, invalid or expired bearer token (401)
    Unauthorized,

    /// Resource not found (404)
    NotFound,

    /// Requested quantity exceeds stock (409)
    InsufficientStock,

    /// Lost a race with another writer, or a unique field is taken (409)
    Conflict,

    /// Storage temporarily unavailable, retry (503)
    PersistenceError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::InsufficientStock | ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::PersistenceError => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthorized, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    fn persistence(message: &str) -> Self {
        ApiError::new(
            ErrorCode::PersistenceError,
            format!("{}, please try again", message),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => core.into(),
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::Conflict,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::CheckViolation { message } => {
                tracing::warn!("Check constraint rejected write: {}", message);
                ApiError::validation("Value violates a data constraint")
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            DbError::Busy(e) => {
                tracing::warn!("Database busy: {}", e);
                ApiError::persistence("Database is busy")
            }
            DbError::PoolExhausted => ApiError::persistence("Database pool exhausted"),
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::persistence("Database connection failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ApiError::persistence("Database transaction failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Migration failed: {}", e);
                ApiError::internal("Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::internal("Database operation failed")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::internal("Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", &id),
            CoreError::CustomerNotFound(id) => ApiError::not_found("Customer", &id),
            CoreError::SaleNotFound(id) => ApiError::not_found("Sale", &id),
            err @ CoreError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, err.to_string())
            }
            CoreError::Conflict(message) => ApiError::new(
                ErrorCode::Conflict,
                format!("{}, please try again", message),
            ),
            err @ CoreError::TotalMismatch { .. } => ApiError::validation(err.to_string()),
            CoreError::SessionExpired => ApiError::unauthorized("Session expired"),
            CoreError::Validation(e) => e.into(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_is_distinguishable() {
        let stock: ApiError = DbError::Domain(CoreError::InsufficientStock {
            product: "Notebook".to_string(),
            available: 4,
            requested: 5,
        })
        .into();
        assert_eq!(stock.code, ErrorCode::InsufficientStock);
        assert!(stock.message.contains("Notebook"));

        let conflict: ApiError = DbError::Domain(CoreError::Conflict("stock changed".into())).into();
        assert_eq!(conflict.code, ErrorCode::Conflict);

        let busy: ApiError = DbError::Busy("database is locked".into()).into();
        assert_eq!(busy.code, ErrorCode::PersistenceError);
        assert!(busy.message.contains("please try again"));

        let empty: ApiError = ValidationError::Empty {
            field: "items".to_string(),
        }
        .into();
        assert_eq!(empty.code, ErrorCode::ValidationError);

        let missing: ApiError = DbError::not_found("Sale", "s-1").into();
        assert_eq!(missing.code, ErrorCode::NotFound);
        assert_eq!(missing.message, "Sale not found: s-1");
    }

    #[test]
    fn test_duplicate_email_is_conflict() {
        let err: ApiError = DbError::duplicate("email", "asha@example.com").into();
        assert_eq!(err.code, ErrorCode::Conflict);
        assert_eq!(err.code.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_wire_format() {
        let err = ApiError::new(ErrorCode::PersistenceError, "busy");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "PERSISTENCE_ERROR");
        assert_eq!(json["message"], "busy");
    }
}
