//! Error types for the hostwatch service

/// Errors that can occur in the hostwatch service
#[derive(Debug, thiserror::Error)]
pub enum HostwatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Monitor error: {0}")]
    Monitor(String),

    #[error("Notifier error: {0}")]
    Notifier(String),

    #[error("Probe error: {0}")]
    Probe(String),

    #[error("State store error: {0}")]
    State(String),
}

/// Result type alias for hostwatch operations
pub type Result<T> = std::result::Result<T, HostwatchError>;
