//! Error types for the corpus indexer.

use std::path::PathBuf;
use thiserror::Error;

use crate::stream::RecordId;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors that can occur while building the index.
#[derive(Error, Debug)]
pub enum IndexError {
    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error during serialization/deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The tree definition file does not exist.
    #[error("Tree file not found at '{0}'")]
    TreeNotFound(PathBuf),

    /// The tree definition exists but cannot be interpreted.
    #[error("Malformed tree definition: {0}")]
    MalformedTree(String),

    /// The input directory does not exist or is not a directory.
    #[error("Input folder '{0}' does not exist or is not a directory")]
    InputDirNotFound(PathBuf),

    /// A source document is unparsable or lacks the expected structure.
    #[error("Malformed document '{file}': {reason}")]
    MalformedDocument { file: String, reason: String },

    /// A record id is already present in a store.
    #[error("Duplicate record id {0}")]
    DuplicateId(RecordId),

    /// A batch does not continue the strictly increasing id sequence.
    #[error("Record id {id} does not follow {previous}")]
    IdOrder { id: RecordId, previous: RecordId },

    /// A store refused a record while preparing a batch.
    #[error("Store rejected record {id}: {reason}")]
    StoreRejected { id: RecordId, reason: String },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The index artifact does not exist.
    #[error("Index file not found at '{0}'")]
    IndexNotFound(PathBuf),
}

impl IndexError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a malformed-document error for a source file key.
    pub fn malformed_document(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedDocument {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error must stop the run before any store is touched.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IndexError::TreeNotFound(_)
                | IndexError::MalformedTree(_)
                | IndexError::InputDirNotFound(_)
                | IndexError::Config(_)
        )
    }
}

impl From<serde_json::Error> for IndexError {
    fn from(err: serde_json::Error) -> Self {
        IndexError::Serialization(err.to_string())
    }
}
