//! I/O error types.

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Delimited-table error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid file format.
    #[error("{origin}:{line}: {message}")]
    InvalidFormat {
        /// File the line came from.
        origin: String,
        /// One-based line number.
        line: usize,
        /// What was wrong.
        message: String,
    },

    /// Core library error.
    #[error(transparent)]
    Core(#[from] adapt_core::Error),
}

impl Error {
    /// Builds an [`Error::InvalidFormat`].
    pub(crate) fn format(origin: &str, line: usize, message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            origin: origin.to_string(),
            line,
            message: message.into(),
        }
    }

    /// The wrapped core error, if any.
    #[must_use]
    pub fn as_core(&self) -> Option<&adapt_core::Error> {
        match self {
            Self::Core(err) => Some(err),
            _ => None,
        }
    }
}
