use std::error::Error as StdError;
use std::path::PathBuf;

use thiserror::Error;

/// Diarate's crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Diarate's crate-wide error type.
///
/// This is intentionally decoupled from `anyhow` so downstream libraries
/// aren't forced to adopt `anyhow` in their own public APIs.
#[derive(Debug, Error)]
pub enum Error {
    /// A segment with `end < start`, a negative start, or non-finite bounds.
    #[error("invalid segment: start={start}, end={end}")]
    InvalidSegment { start: f64, end: f64 },

    /// A malformed line in a lab/ctm file.
    #[error("{}: {reason} (line {line_no}: {line:?})", path.display())]
    Format {
        path: PathBuf,
        line_no: usize,
        line: String,
        reason: String,
    },

    #[error("unsupported diarization file type: {} (supported extensions: ctm, json, lab)", .0.display())]
    UnsupportedFormat(PathBuf),

    /// A required input file does not exist.
    #[error("{role} file does not exist: {}", path.display())]
    MissingFile { role: &'static str, path: PathBuf },

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Other(#[from] Box<dyn StdError + Send + Sync>),
}

impl Error {
    pub(crate) fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Message(format!("{err:#}"))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Other(Box::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Other(Box::new(err))
    }
}
