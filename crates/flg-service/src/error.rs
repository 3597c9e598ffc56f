//! API error types and responses.

use axum::http::header::RETRY_AFTER;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use flg_core::{LedgerError, ProfileError};

/// Seconds a client should wait before retrying an unavailable ledger.
const RETRY_AFTER_SECONDS: &str = "1";

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Resource already exists or is held by someone else.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Insufficient credits.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Required amount.
        required: i64,
    },

    /// The store could not be reached; the outcome of a write is unknown.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::InsufficientCredits { balance, required } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_credits",
                self.to_string(),
                Some(serde_json::json!({
                    "balance": balance,
                    "required": required
                })),
            ),
            Self::Unavailable(msg) => {
                tracing::error!(error = %msg, "Store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "unavailable",
                    "The ledger is temporarily unavailable; check your balance before retrying"
                        .to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        if status == StatusCode::SERVICE_UNAVAILABLE {
            return (status, [(RETRY_AFTER, RETRY_AFTER_SECONDS)], Json(body)).into_response();
        }
        (status, Json(body)).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidAmount { .. } => Self::BadRequest(err.to_string()),
            LedgerError::InsufficientCredits { balance, required } => {
                Self::InsufficientCredits { balance, required }
            }
            LedgerError::NotAuthenticated => Self::Unauthorized,
            LedgerError::LedgerUnavailable(msg) | LedgerError::HistoryUnavailable(msg) => {
                Self::Unavailable(msg)
            }
        }
    }
}

impl From<ProfileError> for ApiError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::NotAuthenticated => Self::Unauthorized,
            ProfileError::ProfileNotFound { .. } => Self::NotFound(err.to_string()),
            ProfileError::ProfileExists { .. } | ProfileError::UsernameTaken { .. } => {
                Self::Conflict(err.to_string())
            }
            ProfileError::InvalidProfile(msg) => Self::BadRequest(msg),
            ProfileError::Unavailable(msg) => Self::Unavailable(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_errors_map_to_status_codes() {
        let cases = [
            (LedgerError::InvalidAmount { amount: 0 }, StatusCode::BAD_REQUEST),
            (
                LedgerError::InsufficientCredits {
                    balance: 1,
                    required: 2,
                },
                StatusCode::PAYMENT_REQUIRED,
            ),
            (LedgerError::NotAuthenticated, StatusCode::UNAUTHORIZED),
            (
                LedgerError::LedgerUnavailable("down".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn profile_errors_map_to_status_codes() {
        let cases = [
            (
                ProfileError::ProfileNotFound {
                    user_id: "u".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                ProfileError::ProfileExists {
                    user_id: "u".into(),
                },
                StatusCode::CONFLICT,
            ),
            (
                ProfileError::UsernameTaken {
                    username: "flg".into(),
                },
                StatusCode::CONFLICT,
            ),
            (
                ProfileError::InvalidProfile("blank".into()),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn unavailable_carries_retry_after() {
        let response = ApiError::Unavailable("down".into()).into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[RETRY_AFTER], RETRY_AFTER_SECONDS);
    }
}
