//! Error types for table loading and variable handling.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using TableError.
pub type TableResult<T> = Result<T, TableError>;

/// Coarse classification of a [`TableError`], without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Parse,
    Io,
    TypeMismatch,
    ValueNotSet,
    OutOfRange,
    UnsupportedConversion,
    NotSupported,
    InvalidVarcode,
}

/// Primary error type for table and variable operations.
#[derive(Debug, Error)]
pub enum TableError {
    // === Lookup Errors ===
    #[error("{0}")]
    NotFound(String),

    #[error("Invalid variable code: {0:?}")]
    InvalidVarcode(String),

    // === Table File Errors ===
    #[error("{}:{line}: {reason}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === Value Errors ===
    #[error("{0}")]
    TypeMismatch(String),

    #[error("{0} is not set")]
    ValueNotSet(String),

    #[error("{0}")]
    OutOfRange(String),

    // === Conversion Errors ===
    #[error("Conversion from {from:?} to {to:?} is not implemented")]
    UnsupportedConversion { from: String, to: String },

    #[error("Not supported: {0}")]
    NotSupported(String),
}

impl TableError {
    /// Get the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TableError::NotFound(_) => ErrorKind::NotFound,
            TableError::InvalidVarcode(_) => ErrorKind::InvalidVarcode,
            TableError::Parse { .. } => ErrorKind::Parse,
            TableError::Io { .. } => ErrorKind::Io,
            TableError::TypeMismatch(_) => ErrorKind::TypeMismatch,
            TableError::ValueNotSet(_) => ErrorKind::ValueNotSet,
            TableError::OutOfRange(_) => ErrorKind::OutOfRange,
            TableError::UnsupportedConversion { .. } => ErrorKind::UnsupportedConversion,
            TableError::NotSupported(_) => ErrorKind::NotSupported,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        TableError::Parse {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TableError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_message_has_location() {
        let err = TableError::parse("/tmp/B000000.txt", 12, "bufr table line too short");
        assert_eq!(
            err.to_string(),
            "/tmp/B000000.txt:12: bufr table line too short"
        );
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            TableError::NotFound("B01001".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            TableError::UnsupportedConversion {
                from: "K".into(),
                to: "M".into()
            }
            .kind(),
            ErrorKind::UnsupportedConversion
        );
        let io = TableError::io(
            "/nonexistent",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert_eq!(io.kind(), ErrorKind::Io);
        assert!(io.to_string().contains("/nonexistent"));
    }
}
