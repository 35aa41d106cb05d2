//! Error taxonomy shared by the store, loader and query pipeline.

use std::time::Duration;

/// Failures raised by a [`FileStore`](crate::services::file_store::FileStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The path does not exist in the store.
    #[error("path not found: {0}")]
    NotFound(String),

    /// The store could not be reached or answered with an error.
    #[error("store unreachable: {0}")]
    Unreachable(String),

    /// A single read exceeded the configured timeout.
    #[error("read timed out after {0:?}")]
    Timeout(Duration),
}

impl StoreError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        !matches!(self, StoreError::NotFound(_))
    }
}

/// A single source that could not be loaded. Never aborts the whole load.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("source unavailable: {path}: {source}")]
    SourceUnavailable {
        path: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },
}

impl LoadError {
    pub fn path(&self) -> &str {
        match self {
            LoadError::SourceUnavailable { path, .. } | LoadError::Parse { path, .. } => path,
        }
    }
}

/// Conditions surfaced to the user as warnings rather than answers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("please enter a question")]
    EmptyQuery,

    #[error("chat service failed: {0}")]
    UpstreamApi(String),
}
