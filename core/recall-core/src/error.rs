//! Error types for recall-core operations.

use std::path::PathBuf;

/// All errors that can occur in recall-core operations.
///
/// Backend subprocess failures are deliberately not represented here; they
/// live in [`crate::store::StoreError`] because callers branch on its two
/// cases rather than propagating them.
#[derive(Debug, thiserror::Error)]
pub enum RecallError {
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parsing error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Path has no parent directory: {0}")]
    NoParentDir(PathBuf),
}

/// Convenience type alias for Results using RecallError.
pub type Result<T> = std::result::Result<T, RecallError>;
