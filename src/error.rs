use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("Lotus API error: {0}")]
    LotusApi(String),

    #[error("Lotus RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Request {method} timed out after {after:?}")]
    Timeout { method: String, after: Duration },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("HTTP server error: {0}")]
    Server(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExporterError>;
