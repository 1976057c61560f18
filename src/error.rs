//! Error types for corpus loading and index persistence.
//!
//! Only [`LoaderError`] is meant to reach the user: it signals a broken
//! notes directory configuration. [`IndexError`] is handled by callers,
//! usually by rebuilding the index from its source text.

use std::path::PathBuf;

/// Failure to start a corpus scan.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("notes directory does not exist: {0}")]
    RootMissing(PathBuf),
    #[error("notes path is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("invalid include pattern: {0}")]
    Pattern(#[from] globset::Error),
}

/// Failure to save or load an index artifact.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("no index artifact at {0}")]
    NotFound(PathBuf),
    #[error("corrupt index artifact at {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),
}

impl IndexError {
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type IndexResult<T> = Result<T, IndexError>;
