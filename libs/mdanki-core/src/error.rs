//! Error types for mdanki-core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading notes or writing export files.
#[derive(Debug, Error)]
pub enum Error {
    #[error("file not found: {0}")]
    NoteNotFound(PathBuf),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors reported by a [`RemoteDirectory`](crate::remote::RemoteDirectory).
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// The remote could not be contacted at all.
    #[error("remote unreachable: {0}")]
    Unreachable(String),

    /// The remote answered but refused the request.
    #[error("remote rejected {action}: {message}")]
    Rejected { action: String, message: String },

    /// The remote answered with something we could not decode.
    #[error("malformed response to {action}: {message}")]
    Protocol { action: String, message: String },
}
