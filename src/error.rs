use std::path::PathBuf;
use thiserror::Error;

use crate::vector_index::SlotId;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("no documents indexed yet")]
    NoDocumentsIndexed,

    #[error("no matching document found")]
    NoMatch,

    #[error("slot {slot} not found (store holds {len} documents)")]
    SlotNotFound { slot: SlotId, len: usize },

    #[error("snapshot could not be saved, in-memory state is ahead of disk: {source}")]
    PersistenceFailed {
        slot: Option<SlotId>,
        #[source]
        source: Box<RagError>,
    },

    #[error("corrupt snapshot at '{}': {detail}", .path.display())]
    CorruptSnapshot { path: PathBuf, detail: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("embedding provider failed: {0}")]
    Embedding(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding error: {0}")]
    Encode(#[from] bincode::Error),
}

impl RagError {
    /// True for outcomes that mean "nothing to answer with" rather than a fault.
    pub fn is_no_answer(&self) -> bool {
        matches!(self, RagError::NoDocumentsIndexed | RagError::NoMatch)
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        RagError::CorruptSnapshot {
            path: path.into(),
            detail: detail.into(),
        }
    }
}
