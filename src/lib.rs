//! Document retrieval core: an exact flat vector index kept slot-aligned with
//! a store of raw document texts, persisted as one atomic snapshot.
//!
//! Callers hand in `(text, embedding)` pairs on ingest and an embedding on
//! query; the nearest stored document comes back with its squared Euclidean
//! distance so the caller can apply its own relevance threshold.

pub mod commands;
pub mod config;
pub mod document_store;
pub mod embedder;
pub mod error;
pub mod pipeline;
pub mod snapshot;
pub mod vector_index;
pub mod vector_ops;

pub use config::{Number, Settings};
pub use document_store::DocumentStore;
pub use embedder::Embedder;
pub use error::{RagError, Result};
pub use pipeline::{Match, RetrievalPipeline};
pub use snapshot::SnapshotStore;
pub use vector_index::{FlatIndex, SlotId};
