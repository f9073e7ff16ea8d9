use core::fmt;

/// Result alias for `cofold`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by folding and reconciliation primitives.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// JSON decoding or encoding failed.
    Json(String),

    /// Reading or writing a stored report failed.
    Io(String),

    /// Shape mismatch (string description).
    ShapeMismatch {
        /// Expected shape description.
        expected: String,
        /// Actual shape description.
        actual: String,
    },

    /// A partition is missing the field its dimension type requires.
    MissingField {
        /// Dimension name.
        dimension: String,
        /// Name of the absent field.
        field: &'static str,
    },

    /// A collapsed cluster whose interval could not be determined.
    InvalidBounds {
        /// Cluster name.
        cluster: String,
    },

    /// No current part contains an initial part while building the transition table.
    TransitionOverrun {
        /// Dimension name.
        dimension: String,
        /// Index of the initial part that found no container.
        part: usize,
    },

    /// Total cell frequency changed during re-aggregation.
    MassMismatch {
        /// Total before.
        before: u64,
        /// Total after.
        after: u64,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Json(msg) => write!(f, "json error: {msg}"),
            Error::Io(msg) => write!(f, "io error: {msg}"),
            Error::ShapeMismatch { expected, actual } => {
                write!(f, "shape mismatch: expected {expected}, actual {actual}")
            }
            Error::MissingField { dimension, field } => {
                write!(f, "partition of '{dimension}' has no '{field}'")
            }
            Error::InvalidBounds { cluster } => {
                write!(f, "cannot determine interval bounds of cluster '{cluster}'")
            }
            Error::TransitionOverrun { dimension, part } => {
                write!(
                    f,
                    "no current part of '{dimension}' contains initial part {part}"
                )
            }
            Error::MassMismatch { before, after } => {
                write!(f, "cell frequency total changed from {before} to {after}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}
