//! Error types for the freshcve server.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response}
};
use errors::ConfigError;
use serde::Serialize;
use thiserror::Error;

/// Result type alias for the server.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors raised while starting or running the server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Listener or serving failure.
    #[error("Server error: {0}")]
    Server(String),

    /// A feature the request needs is not enabled.
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String)
}

impl From<ConfigError> for ServerError {
    fn from(err: ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

/// Error response body for HTTP endpoints.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Configuration(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIGURATION_ERROR",
                msg.as_str(),
                None
            ),
            Self::Server(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "SERVER_ERROR",
                msg.as_str(),
                None
            ),
            Self::Unavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "UNAVAILABLE",
                msg.as_str(),
                None
            ),
            Self::Internal(msg) => {
                tracing::error!(message = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred",
                    Some(msg.clone())
                )
            }
        };

        let body = ErrorResponse {
            error: message.to_string(),
            code: code.to_string(),
            details
        };

        (status, Json(body)).into_response()
    }
}
