use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Chain client error: {0}")]
    ChainClient(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Spend request not found: {0}")]
    RequestNotFound(i64),

    #[error("Insufficient balance: available={0}, requested={1}")]
    InsufficientBalance(i64, i64),

    #[error("Too many pending spend requests (limit {0})")]
    TooManyPending(i64),

    #[error("Spend request {0} has already been reviewed")]
    AlreadyReviewed(i64),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Concurrent update conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for TokenError {
    fn into_response(self) -> Response {
        let (status, error_message, details) = match &self {
            TokenError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error occurred", self.to_string())
            }
            TokenError::ChainClient(e) => {
                tracing::error!("Chain client error: {}", e);
                (StatusCode::BAD_GATEWAY, "Blockchain communication error", self.to_string())
            }
            TokenError::AccountNotFound(_) => {
                tracing::warn!("Account not found: {}", self);
                (StatusCode::NOT_FOUND, "Account not found", self.to_string())
            }
            TokenError::RequestNotFound(_) => {
                tracing::warn!("Spend request not found: {}", self);
                (StatusCode::NOT_FOUND, "Spend request not found", self.to_string())
            }
            TokenError::InsufficientBalance(_, _) => {
                tracing::warn!("Insufficient balance: {}", self);
                (StatusCode::BAD_REQUEST, "Insufficient token balance", self.to_string())
            }
            TokenError::TooManyPending(_) => {
                tracing::warn!("Too many pending requests: {}", self);
                (StatusCode::TOO_MANY_REQUESTS, "Too many pending requests. Wait for approval.", self.to_string())
            }
            TokenError::AlreadyReviewed(_) => {
                tracing::warn!("Request already reviewed: {}", self);
                (StatusCode::CONFLICT, "Request already reviewed", self.to_string())
            }
            TokenError::InvalidAmount(_) => {
                tracing::warn!("Invalid amount: {}", self);
                (StatusCode::BAD_REQUEST, "Invalid amount", self.to_string())
            }
            TokenError::Validation(_) => {
                tracing::warn!("Validation failed: {}", self);
                (StatusCode::BAD_REQUEST, "Invalid input", self.to_string())
            }
            TokenError::Conflict(_) => {
                tracing::warn!("Write conflict: {}", self);
                (StatusCode::CONFLICT, "The account was updated concurrently, try again", self.to_string())
            }
            TokenError::Unauthorized(_) => {
                tracing::warn!("Unauthorized request: {}", self);
                (StatusCode::UNAUTHORIZED, "Unauthorized", self.to_string())
            }
            TokenError::Config(_) => {
                tracing::error!("Configuration error: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Configuration error", self.to_string())
            }
            TokenError::Internal(_) => {
                tracing::error!("Internal error: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", self.to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "details": details,
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for TokenError {
    fn from(error: sqlx::Error) -> Self {
        TokenError::Database(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TokenError>;
