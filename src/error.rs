//! Console error types with HTTP status code mapping.
//!
//! [`ConsoleError`] is the central error type for the console. Each
//! variant maps to a specific HTTP status code and structured JSON error
//! response. Workflow handlers never let an error escape unshaped: every
//! failure becomes one of these variants and is traced at the boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{RequestId, RequestStatus, UserId};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2003,
///     "message": "request already settled: status is approved",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges below).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category          | HTTP Status                  |
/// |-----------|-------------------|------------------------------|
/// | 1000–1999 | Validation/Auth   | 400 Bad Request / 403        |
/// | 2000–2999 | State/Not Found   | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server/Timeout    | 500 / 504                    |
/// | 4000–4999 | Ledger-Specific   | 422 Unprocessable Entity     |
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// Request with the given ID was not found.
    #[error("request not found: {0}")]
    RequestNotFound(RequestId),

    /// User with the given ID was not found.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// The request has already left the pending state. Re-applying a
    /// decision is refused so a balance can never settle twice.
    #[error("request {id} already settled: status is {}", status.as_str())]
    InvalidTransition {
        /// Request that was already settled.
        id: RequestId,
        /// Its current terminal status.
        status: RequestStatus,
    },

    /// Request validation failed before any external call.
    #[error("invalid request: {0}")]
    ValidationError(String),

    /// A ledger mutation would leave a negative balance or bonus.
    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Funds currently available.
        available: Decimal,
        /// Amount the mutation tried to remove.
        requested: Decimal,
    },

    /// Bonus conversion requested with a zero bonus.
    #[error("nothing to convert: bonus is zero")]
    NothingToConvert,

    /// An external call exceeded its configured bound.
    #[error("timed out: {0}")]
    Timeout(String),

    /// A later step of a multi-step transition failed and compensation
    /// of the earlier steps also failed; manual reconciliation needed.
    #[error("partial failure: completed {completed}, then failed: {failed}")]
    PartialFailure {
        /// Description of the step that had already been applied.
        completed: String,
        /// Description of the step that failed.
        failed: String,
    },

    /// Record store failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Caller is not an authenticated admin.
    #[error("forbidden: admin credentials required")]
    Forbidden,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ConsoleError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::ValidationError(_) => 1001,
            Self::Forbidden => 1003,
            Self::RequestNotFound(_) => 2001,
            Self::UserNotFound(_) => 2002,
            Self::InvalidTransition { .. } => 2003,
            Self::InsufficientFunds { .. } => 4001,
            Self::NothingToConvert => 4002,
            Self::PersistenceError(_) => 3001,
            Self::Timeout(_) => 3002,
            Self::PartialFailure { .. } => 3003,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::RequestNotFound(_) | Self::UserNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidTransition { .. } | Self::NothingToConvert => StatusCode::CONFLICT,
            Self::InsufficientFunds { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::PersistenceError(_) | Self::PartialFailure { .. } | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ConsoleError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::error!(code = self.error_code(), error = %self, "request failed");
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn invalid_transition_is_conflict() {
        let err = ConsoleError::InvalidTransition {
            id: RequestId::new(),
            status: RequestStatus::Approved,
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.error_code(), 2003);
        assert!(err.to_string().contains("approved"));
    }

    #[test]
    fn insufficient_funds_is_unprocessable() {
        let err = ConsoleError::InsufficientFunds {
            available: dec!(10),
            requested: dec!(25),
        };
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.to_string().contains("10"));
        assert!(err.to_string().contains("25"));
    }

    #[test]
    fn timeout_is_gateway_timeout() {
        let err = ConsoleError::Timeout("list users".to_string());
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(err.error_code(), 3002);
    }

    #[test]
    fn not_found_variants_map_to_404() {
        assert_eq!(
            ConsoleError::RequestNotFound(RequestId::new()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ConsoleError::UserNotFound(UserId::new()).status_code(),
            StatusCode::NOT_FOUND
        );
    }
}
