//! Error types for Krishi Assist.

/// Top-level error type for the assistant.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Data service error: {0}")]
    Data(#[from] DataError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Persistence-layer errors (namespaced JSON records).
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid storage namespace: {0}")]
    InvalidNamespace(String),

    #[error("Serialization failed for namespace {namespace}: {source}")]
    Serialize {
        namespace: String,
        source: serde_json::Error,
    },

    #[error("Record in namespace {namespace} is corrupt: {source}")]
    Corrupt {
        namespace: String,
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Data-service errors. Always converted to a fallback reply at the
/// composer/navigator boundary — they never reach the embedding UI raw.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("Data surface {surface} is unavailable")]
    Unavailable { surface: String },

    #[error("Fixture {file} is malformed: {source}")]
    Malformed {
        file: &'static str,
        source: serde_json::Error,
    },
}

/// LLM backend errors. Trigger fallback to the mock engine, never surfaced.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Request to {base_url} failed: {source}")]
    Request {
        base_url: String,
        source: reqwest::Error,
    },

    #[error("LLM returned status {status}")]
    Status { status: u16 },

    #[error("Invalid response from LLM: {reason}")]
    InvalidResponse { reason: String },

    #[error("LLM engine enabled but no API key configured")]
    MissingApiKey,
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the assistant.
pub type Result<T> = std::result::Result<T, Error>;
