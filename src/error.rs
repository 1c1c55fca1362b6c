use thiserror::Error;

/// Errors that can occur when parsing a human-readable byte size
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SizeParseError {
    /// The input was empty or only whitespace
    #[error("Empty size")]
    Empty,

    /// The numeric part could not be parsed
    #[error("Invalid size number: {0:?}")]
    InvalidNumber(String),

    /// The unit suffix is not recognized
    #[error("Unknown size unit: {0:?} (expected B, KB, MB, GB, KiB, MiB or GiB)")]
    UnknownUnit(String),

    /// The size does not fit in the platform's address space
    #[error("Size too large: {0}")]
    Overflow(String),
}

/// Errors from the cache stress runner
#[derive(Debug, Error)]
pub enum StressError {
    /// The run parameters are inconsistent
    #[error("Invalid stress parameters: {0}")]
    InvalidParameters(String),

    /// A reader or swapper worker panicked or was cancelled
    #[error("Stress worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
