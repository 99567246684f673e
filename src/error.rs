//! Error types and result alias for type cleanup.

/// The result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while classifying or removing obsolete nodes.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The repository could not be read (connection lost, access denied, ...).
    #[error("failed to resolve {path}: {message}")]
    Resolution {
        /// Path or type that was being resolved.
        path: String,
        message: String,
    },

    /// A commit failed. Batches committed before the failure stand.
    #[error("failed to persist changes after removing {removed} node(s): {message}")]
    Persistence {
        /// Number of deletions already committed when the failure happened.
        removed: usize,
        message: String,
    },

    /// The tree is deeper than the configured ceiling.
    #[error("traversal exceeded the maximum depth of {limit} at {path}")]
    DepthLimit { path: String, limit: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid content: {0}")]
    Content(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Creates a resolution error for the given path.
    pub fn resolution(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Resolution {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Number of nodes removed and committed before this error, if it came from a cleanup.
    pub fn removed(&self) -> Option<usize> {
        match self {
            Error::Persistence { removed, .. } => Some(*removed),
            _ => None,
        }
    }
}
