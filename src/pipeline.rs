use parking_lot::RwLock;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{Number, Settings};
use crate::document_store::DocumentStore;
use crate::embedder::Embedder;
use crate::error::{RagError, Result};
use crate::snapshot::SnapshotStore;
use crate::vector_index::{FlatIndex, SlotId};

/// A retrieved document and its squared distance to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub slot: SlotId,
    pub distance: Number,
    pub text: String,
}

/// Index and store always change together, under the same guard.
struct Corpus {
    index: FlatIndex,
    store: DocumentStore,
}

/// Owns the vector index, the document store and their snapshot.
///
/// Ingests take the write guard for the whole insert-and-save sequence, so
/// queries never observe a vector without its document and two saves never
/// interleave on disk.
pub struct RetrievalPipeline {
    corpus: RwLock<Corpus>,
    snapshots: SnapshotStore,
}

impl RetrievalPipeline {
    pub fn open(settings: &Settings) -> Result<Self> {
        Self::open_at(&settings.path, settings.dimensions)
    }

    /// Loads the snapshot at `path`, starting empty if there is none.
    ///
    /// A snapshot that exists but fails verification is reported as
    /// `CorruptSnapshot`; it is never replaced by an empty corpus.
    pub fn open_at(path: impl Into<PathBuf>, dimensions: usize) -> Result<Self> {
        // Zero-length embeddings would all land in slot 0.
        if dimensions == 0 || u32::try_from(dimensions).is_err() {
            return Err(RagError::InvalidConfig(format!(
                "embedding dimension must be between 1 and {}, got {}",
                u32::MAX,
                dimensions
            )));
        }
        let snapshots = SnapshotStore::new(path, dimensions);
        let (index, store) = snapshots.load()?;
        info!(
            path = %snapshots.path().display(),
            dimensions,
            documents = store.len(),
            "retrieval pipeline ready"
        );
        Ok(Self {
            corpus: RwLock::new(Corpus { index, store }),
            snapshots,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.corpus.read().index.dimensions()
    }

    pub fn path(&self) -> &Path {
        self.snapshots.path()
    }

    pub fn len(&self) -> usize {
        self.corpus.read().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds one document and its embedding, then persists the snapshot.
    ///
    /// On `PersistenceFailed` the document is already searchable in this
    /// process; `persist` can be called to retry the save.
    pub fn ingest(&self, text: impl Into<String>, vector: &[Number]) -> Result<SlotId> {
        let text = text.into();
        let mut corpus = self.corpus.write();

        // Validate before touching either container.
        corpus.index.check_dimensions(vector)?;
        let slot = corpus.index.insert(vector)?;
        let stored = corpus.store.append(text);
        debug_assert_eq!(slot, stored);
        debug!(slot, "document indexed");

        if let Err(source) = self.snapshots.save(&corpus.index, &corpus.store) {
            warn!(slot, error = %source, "snapshot save failed after ingest");
            return Err(RagError::PersistenceFailed {
                slot: Some(slot),
                source: Box::new(source),
            });
        }
        Ok(slot)
    }

    /// Nearest document to `vector`.
    pub fn query(&self, vector: &[Number]) -> Result<Match> {
        let mut matches = self.search(vector, 1)?;
        if matches.is_empty() {
            return Err(RagError::NoMatch);
        }
        Ok(matches.swap_remove(0))
    }

    /// Up to `k` nearest documents, closest first.
    pub fn search(&self, vector: &[Number], k: usize) -> Result<Vec<Match>> {
        let start = Instant::now();
        let corpus = self.corpus.read();

        corpus.index.check_dimensions(vector)?;
        if corpus.store.is_empty() {
            return Err(RagError::NoDocumentsIndexed);
        }

        let hits = corpus.index.search_nearest(vector, k)?;
        let matches = hits
            .into_iter()
            .map(|(slot, distance)| {
                Ok(Match {
                    slot,
                    distance,
                    text: corpus.store.get(slot)?.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            k,
            found = matches.len(),
            elapsed = ?start.elapsed(),
            "search finished"
        );
        Ok(matches)
    }

    pub fn document(&self, slot: SlotId) -> Result<String> {
        Ok(self.corpus.read().store.get(slot)?.to_string())
    }

    pub fn documents(&self) -> Vec<(SlotId, String)> {
        self.corpus
            .read()
            .store
            .iter()
            .map(|(slot, text)| (slot, text.to_string()))
            .collect()
    }

    /// Saves the current state again, e.g. after a failed ingest save.
    pub fn persist(&self) -> Result<()> {
        let corpus = self.corpus.write();
        self.snapshots
            .save(&corpus.index, &corpus.store)
            .map_err(|source| RagError::PersistenceFailed {
                slot: None,
                source: Box::new(source),
            })
    }

    /// Embeds `text` with `embedder` and ingests it.
    pub fn ingest_text(&self, embedder: &dyn Embedder, text: &str) -> Result<SlotId> {
        let vector = self.embed(embedder, text)?;
        self.ingest(text, &vector)
    }

    /// Embeds `text` with `embedder` and returns the nearest document.
    pub fn query_text(&self, embedder: &dyn Embedder, text: &str) -> Result<Match> {
        let vector = self.embed(embedder, text)?;
        self.query(&vector)
    }

    /// Rejects an embedder of the wrong width before calling it.
    fn embed(&self, embedder: &dyn Embedder, text: &str) -> Result<Vec<Number>> {
        let expected = self.dimensions();
        if embedder.dimensions() != expected {
            return Err(RagError::DimensionMismatch {
                expected,
                actual: embedder.dimensions(),
            });
        }
        embedder
            .embed(text)
            .map_err(|e| RagError::Embedding(format!("{}: {:#}", embedder.name(), e)))
    }
}
