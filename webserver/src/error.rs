//! WebServer-specific error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use engine::CoreError;
use serde_json::json;
use shared::SharedError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebServerError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Missing or empty {header} header")]
    Unauthenticated { header: &'static str },

    #[error("Invalid request format: {details}")]
    InvalidRequest { details: String },

    #[error("Server startup error: {0}")]
    ServerStartup(String),

    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Shared component error")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl WebServerError {
    pub fn websocket(message: impl Into<String>) -> Self {
        Self::WebSocketError(message.into())
    }

    pub fn invalid_request(details: impl Into<String>) -> Self {
        Self::InvalidRequest { details: details.into() }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// HTTP status and a stable machine-readable kind
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            WebServerError::Core(core) => match core {
                CoreError::Validation { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "validation"),
                CoreError::Conflict { .. } => (StatusCode::CONFLICT, "conflict"),
                CoreError::Authorization { .. } => (StatusCode::FORBIDDEN, "authorization"),
                CoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
                CoreError::Persistence { .. } | CoreError::Io(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "persistence")
                }
                CoreError::Configuration { .. } | CoreError::Shared(_) | CoreError::Json(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal")
                }
            },
            WebServerError::Unauthenticated { .. } => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            WebServerError::InvalidRequest { .. } | WebServerError::SharedError(_) | WebServerError::JsonError(_) => {
                (StatusCode::BAD_REQUEST, "invalid_request")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for WebServerError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status();
        if status.is_server_error() {
            shared::process_error!(shared::ProcessId::current(), "❌ Request failed: {}", self);
        }
        let body = Json(json!({
            "error": kind,
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

pub type WebServerResult<T> = Result<T, WebServerError>;
