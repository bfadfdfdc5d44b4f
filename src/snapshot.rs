//! Durable snapshot of a `FlatIndex` and its `DocumentStore`.
//!
//! One file holds both containers. All integers are bincode fixed-int,
//! little-endian:
//!
//! ```text
//! header: magic b"VKRG" | version u16 | dimensions u32 |
//!         vector_count u64 | document_count u64 | body_sha256 [u8; 32]
//! body:   vectors (vector_count * dimensions f32) | documents (document_count strings)
//! ```
//!
//! Saves go to a sibling temporary file which is synced and then renamed over
//! the previous snapshot, so readers only ever see a complete file.

use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

use crate::config::Number;
use crate::document_store::DocumentStore;
use crate::error::{RagError, Result};
use crate::vector_index::FlatIndex;

const MAGIC: [u8; 4] = *b"VKRG";
const FORMAT_VERSION: u16 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotHeader {
    magic: [u8; 4],
    version: u16,
    dimensions: u32,
    vector_count: u64,
    document_count: u64,
    body_sha256: [u8; 32],
}

#[derive(Serialize)]
struct SnapshotBodyRef<'a> {
    vectors: &'a [Number],
    documents: &'a [String],
}

#[derive(Deserialize)]
struct SnapshotBody {
    vectors: Vec<Number>,
    documents: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
    dimensions: usize,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>, dimensions: usize) -> Self {
        Self {
            path: path.into(),
            dimensions,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes both containers as one snapshot, atomically replacing any previous one.
    pub fn save(&self, index: &FlatIndex, store: &DocumentStore) -> Result<()> {
        let start = Instant::now();
        if index.len() != store.len() {
            return Err(RagError::corrupt(
                &self.path,
                format!(
                    "refusing to save {} vectors with {} documents",
                    index.len(),
                    store.len()
                ),
            ));
        }

        let dimensions = u32::try_from(self.dimensions).map_err(|_| {
            RagError::InvalidConfig(format!(
                "{} dimensions do not fit the snapshot header",
                self.dimensions
            ))
        })?;

        let body = bincode::serialize(&SnapshotBodyRef {
            vectors: index.as_slice(),
            documents: store.as_slice(),
        })?;
        let header = SnapshotHeader {
            magic: MAGIC,
            version: FORMAT_VERSION,
            dimensions,
            vector_count: index.len() as u64,
            document_count: store.len() as u64,
            body_sha256: Sha256::digest(&body).into(),
        };
        let header_bytes = bincode::serialize(&header)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = temporary_output_path(&self.path);
        let written = write_and_replace(&tmp_path, &self.path, &header_bytes, &body);
        if written.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        written?;
        sync_parent_directory(&self.path)?;

        info!(
            path = %self.path.display(),
            documents = store.len(),
            bytes = header_bytes.len() + body.len(),
            elapsed = ?start.elapsed(),
            "snapshot saved"
        );
        Ok(())
    }

    /// Reads the snapshot, or returns empty containers when none exists yet.
    pub fn load(&self) -> Result<(FlatIndex, DocumentStore)> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no snapshot found, starting empty");
                return Ok((FlatIndex::new(self.dimensions), DocumentStore::new()));
            }
            Err(err) => return Err(err.into()),
        };

        if file.metadata()?.len() == 0 {
            return Err(self.corrupt("snapshot file is empty"));
        }
        let mmap = unsafe { Mmap::map(&file)? };
        let (index, store) = self.decode(&mmap)?;
        info!(
            path = %self.path.display(),
            documents = store.len(),
            "snapshot loaded"
        );
        Ok((index, store))
    }

    fn decode(&self, bytes: &[u8]) -> Result<(FlatIndex, DocumentStore)> {
        let header: SnapshotHeader = bincode::deserialize(bytes)
            .map_err(|e| self.corrupt(format!("unreadable header: {}", e)))?;

        if header.magic != MAGIC {
            return Err(self.corrupt("not a snapshot file (bad magic)"));
        }
        if header.version != FORMAT_VERSION {
            return Err(self.corrupt(format!(
                "unsupported format version {}",
                header.version
            )));
        }
        if header.dimensions as usize != self.dimensions {
            return Err(self.corrupt(format!(
                "snapshot has {} dimensions, configured for {}",
                header.dimensions, self.dimensions
            )));
        }
        if header.vector_count != header.document_count {
            return Err(self.corrupt(format!(
                "recorded vector count {} does not match document count {}",
                header.vector_count, header.document_count
            )));
        }

        let header_len = bincode::serialized_size(&header)? as usize;
        let body_bytes = bytes
            .get(header_len..)
            .ok_or_else(|| self.corrupt("truncated before body"))?;
        let digest: [u8; 32] = Sha256::digest(body_bytes).into();
        if digest != header.body_sha256 {
            return Err(self.corrupt("body checksum mismatch"));
        }

        let body: SnapshotBody = bincode::deserialize(body_bytes)
            .map_err(|e| self.corrupt(format!("unreadable body: {}", e)))?;

        let expected_floats = (header.vector_count as usize).checked_mul(self.dimensions);
        if expected_floats != Some(body.vectors.len()) {
            return Err(self.corrupt(format!(
                "vector buffer holds {} floats, expected {} vectors of {}",
                body.vectors.len(),
                header.vector_count,
                self.dimensions
            )));
        }
        if body.documents.len() as u64 != header.document_count {
            return Err(self.corrupt(format!(
                "document list holds {} entries, expected {}",
                body.documents.len(),
                header.document_count
            )));
        }

        let float_count = body.vectors.len();
        let index = FlatIndex::from_raw(self.dimensions, body.vectors).ok_or_else(|| {
            self.corrupt(format!(
                "{} floats do not divide into vectors of {}",
                float_count, self.dimensions
            ))
        })?;
        debug!(vectors = index.len(), "snapshot decoded");
        Ok((index, DocumentStore::from_documents(body.documents)))
    }

    fn corrupt(&self, detail: impl Into<String>) -> RagError {
        RagError::corrupt(&self.path, detail)
    }
}

fn write_and_replace(tmp_path: &Path, path: &Path, header: &[u8], body: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(tmp_path)?;
    file.write_all(header)?;
    file.write_all(body)?;
    file.sync_all()?;
    drop(file);
    fs::rename(tmp_path, path)?;
    Ok(())
}

fn temporary_output_path(path: &Path) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let pid = std::process::id();
    let mut os = path.as_os_str().to_os_string();
    os.push(format!(".tmp.{}.{}", pid, now));
    PathBuf::from(os)
}

fn sync_parent_directory(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        File::open(parent)?.sync_all()?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}
