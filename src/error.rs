use thiserror::Error;

/// Errors returned by the segmentation pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// No feature vectors were supplied where at least one is required.
    #[error("empty input")]
    EmptyInput,

    /// A configuration value is out of range.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: &'static str,
    },

    /// Feature vectors have inconsistent dimensionality.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimensionality.
        expected: usize,
        /// Found dimensionality.
        found: usize,
    },

    /// A numeric cell could not be parsed.
    #[error("invalid number in {field}: {value:?}")]
    InvalidNumber {
        /// Field the cell belongs to.
        field: &'static str,
        /// The raw text that failed to parse.
        value: String,
    },

    /// Reading input or writing output failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Input or configuration JSON was malformed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;
