use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Creator has never completed the OAuth exchange; they must (re)connect.
    #[error("No stored credential for creator")]
    NoCredential,

    /// The refresh token was rejected upstream. Never retried with the same
    /// token - the creator must reconnect their account.
    #[error("Token refresh failed: {status} {body}")]
    RefreshFailed { status: u16, body: String },

    /// Non-retryable 4xx from the payment API, surfaced verbatim.
    #[error("Gateway rejected request: {status} {body}")]
    GatewayRejected { status: u16, body: String },

    /// Retries exhausted against 5xx / network errors / rate limiting.
    #[error("Gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// Persistence failure after a gateway call already moved money.
    #[error("Ledger write failed: {0}")]
    LedgerWriteFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable taxonomy code surfaced to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NoCredential => "no_credential",
            AppError::RefreshFailed { .. } => "refresh_failed",
            AppError::GatewayRejected { .. } => "gateway_rejected",
            AppError::GatewayUnavailable(_) => "gateway_unavailable",
            AppError::LedgerWriteFailed(_) => "ledger_write_failed",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Unauthorized => "unauthorized",
            AppError::Database(_) => "database_error",
            AppError::Pool(_) => "database_error",
            AppError::Json(_) => "invalid_json",
            AppError::Internal(_) => "internal_error",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, details) = match &self {
            AppError::NoCredential => (
                StatusCode::UNAUTHORIZED,
                Some("Connect your Whop account to continue".to_string()),
            ),
            AppError::RefreshFailed { status, body } => {
                tracing::warn!("Token refresh rejected upstream: {} {}", status, body);
                (
                    StatusCode::UNAUTHORIZED,
                    Some("Whop connection expired - please reconnect".to_string()),
                )
            }
            AppError::GatewayRejected { status, body } => (
                StatusCode::BAD_GATEWAY,
                Some(format!("Whop API error: {} - {}", status, body)),
            ),
            AppError::GatewayUnavailable(msg) => {
                (StatusCode::BAD_GATEWAY, Some(msg.clone()))
            }
            AppError::LedgerWriteFailed(msg) => {
                tracing::error!("Ledger write failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, Some(msg.clone())),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, Some(msg.clone())),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, None),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
            AppError::Json(e) => (StatusCode::BAD_REQUEST, Some(e.to_string())),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
        };

        let body = ErrorResponse {
            error: self.code(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
