use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("invalid video folder {path}: {reason}")]
    InvalidDirectory { path: PathBuf, reason: String },

    #[error("unplayable media at index {index}: {path}")]
    UnplayableMedia { path: PathBuf, index: usize },

    #[error("failed to start media engine: {0}")]
    EngineInitFailure(String),

    #[error("last folder record {path}: {source}")]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ViewerError {
    pub fn invalid_directory(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidDirectory {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Fatal errors end the process; everything else is recovered locally.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::EngineInitFailure(_))
    }
}
