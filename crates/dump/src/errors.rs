//! Error types for the heap-dump crate

use thiserror::Error;

/// Result type alias for heap dump decoding operations
pub type Result<T> = std::result::Result<T, DumpError>;

/// Error types for heap dump decoding and filtering operations
#[derive(Error, Debug)]
pub enum DumpError {
    /// IO operations failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The parse window cannot hold a single complete document.
    /// Retrying the whole operation with a larger batch size is the
    /// expected recovery; partial-progress retries are not supported.
    #[error("batch size {batch_size} is too small to hold a complete heap dump document")]
    CapacityExceeded { batch_size: usize },

    /// A document violated the dump schema's structural invariants
    #[error("malformed heap record: {0}")]
    MalformedRecord(String),

    /// An address string failed format validation
    #[error("invalid heap address: {address:?}")]
    InvalidAddress { address: String },

    /// A report directory is missing or carries unusable metadata
    #[error("invalid report directory: {0}")]
    InvalidReport(String),
}
