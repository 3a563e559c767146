//! Error types for the voluma core.

/// Top-level error type for the tab-volume system.
#[derive(Debug, thiserror::Error)]
pub enum VolumaError {
    /// Persistence backend failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Malformed import payload or command payload.
    #[error("validation error: {0}")]
    Validation(String),

    /// Media-element connection or gain-graph failure.
    #[error("audio error: {0}")]
    Audio(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, VolumaError>;
