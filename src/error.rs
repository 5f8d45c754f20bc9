/// Domain-specific error types for the trade protocol engine.
#[derive(Debug, thiserror::Error)]
pub enum TradeError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("hash mismatch: {0}")]
    Tamper(String),

    #[error("sequence violation: {0}")]
    Sequence(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("store operation failed: {0}")]
    Store(String),

    #[error("transport operation failed: {0}")]
    Transport(String),

    #[error("escrow operation failed: {0}")]
    Escrow(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience type alias.
pub type TradeResult<T> = Result<T, TradeError>;
