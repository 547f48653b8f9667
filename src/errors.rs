use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::Serialize;

/// Failures that terminate a single request.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Auth errors
    #[error("Authorization header required")]
    MissingCredential,
    #[error("Invalid authorization header format")]
    MalformedCredential,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Invalid issuer")]
    IssuerMismatch,
    #[error("Invalid audience")]
    AudienceMismatch,

    // Dispatch errors
    #[error("Missing path parameter: {0}")]
    MissingParameter(String),

    // Proxy errors
    #[error("Error proxying request")]
    Upstream(#[from] reqwest::Error),
    #[error("Failed to map response")]
    Mapping(#[from] MapperError),
}

/// Fatal failures of the response mapper.
#[derive(Debug, thiserror::Error)]
pub enum MapperError {
    #[error("failed to parse response body: {0}")]
    MalformedPrimaryResponse(#[source] serde_json::Error),
    #[error("failed to marshal final response: {0}")]
    EncodingFailure(#[source] serde_json::Error),
}

/// Startup failures; any of these aborts the process before serving.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("invalid upstream '{0}'")]
    InvalidUpstream(String),
    #[error("invalid method '{method}' for route {path}")]
    InvalidMethod { method: String, path: String },
    #[error("invalid route path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },
    #[error("route {second} conflicts with {first}")]
    ConflictingRoute { first: String, second: String },
    #[error("duplicate route {method} {path}")]
    DuplicateRoute { method: String, path: String },
    #[error("no auth secret configured and {0} is not set")]
    MissingSecret(&'static str),
    #[error("invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: &'static str },
}

/// Body of every auth failure. Field names are part of the client contract.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub success: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::MissingCredential
            | AppError::MalformedCredential
            | AppError::InvalidToken
            | AppError::IssuerMismatch
            | AppError::AudienceMismatch => {
                let body = ErrorResponse { error: self.to_string(), success: false };
                return (StatusCode::UNAUTHORIZED, Json(body)).into_response();
            }
            AppError::MissingParameter(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream(e) => {
                tracing::error!("Proxy error: {}", e);
                StatusCode::BAD_GATEWAY
            }
            AppError::Mapping(e) => {
                tracing::error!("Error mapping response: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, self.to_string()).into_response()
    }
}
