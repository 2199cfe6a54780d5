use thiserror::Error;

#[derive(Error, Debug)]
pub enum CallError {
    #[error("Tag must not be empty")]
    InvalidTag,

    #[error("Media unavailable: {reason}")]
    MediaUnavailable { reason: String },

    #[error("Permission denied: {device}")]
    PermissionDenied { device: String },

    #[error("Negotiation failed: {reason}")]
    Negotiation { reason: String },

    #[error("Backend error: {reason}")]
    Backend { reason: String },
}

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Failed to connect to relay {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("Relay connection closed")]
    Closed,

    #[error("Failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration invalid: {reason}")]
    Invalid { reason: String },

    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
