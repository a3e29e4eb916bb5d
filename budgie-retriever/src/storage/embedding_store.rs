//! In-memory [`VectorStore`] persisted as a JSON array

use super::{EmbeddingRecord, StoreError, VectorStore};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// The document store built by the indexer and read by search.
///
/// It is an explicit value: the indexer fills one, persists it, and search
/// loads its own copy from disk.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingStore {
    records: Vec<EmbeddingRecord>,
    ids: HashSet<String>,
}

impl EmbeddingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a store from `path`. See [`EmbeddingStore::load`].
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let mut store = Self::new();
        store.load(path).await?;
        Ok(store)
    }

    /// Writes every record to `path` as a pretty-printed JSON array,
    /// replacing any existing file.
    ///
    /// The data goes to a sibling temporary file first and is renamed over
    /// `path`, so a failed write leaves the previous index intact. Missing
    /// parent directories are created.
    pub async fn persist(&self, path: &Path) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(&self.records).map_err(StoreError::Encode)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let tmp = temp_path(path);
        if let Err(source) = fs::write(&tmp, &json).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StoreError::Io { path: tmp, source });
        }
        if let Err(source) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            });
        }

        debug!("Persisted {} records to {}", self.records.len(), path.display());
        Ok(())
    }

    /// Replaces the in-memory records with the contents of `path`.
    ///
    /// On any error the store is left unchanged.
    pub async fn load(&mut self, path: &Path) -> Result<(), StoreError> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(path.to_path_buf()));
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let records: Vec<EmbeddingRecord> =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let mut ids = HashSet::with_capacity(records.len());
        for record in &records {
            if !ids.insert(record.id.clone()) {
                return Err(StoreError::DuplicateId(record.id.clone()));
            }
        }

        debug!("Loaded {} records from {}", records.len(), path.display());
        self.records = records;
        self.ids = ids;
        Ok(())
    }
}

impl VectorStore for EmbeddingStore {
    fn reset(&mut self) {
        self.records.clear();
        self.ids.clear();
    }

    fn append(&mut self, id: String, content: String, embedding: Vec<f32>) -> Result<(), StoreError> {
        if self.ids.contains(&id) {
            return Err(StoreError::DuplicateId(id));
        }
        self.ids.insert(id.clone());
        self.records.push(EmbeddingRecord {
            id,
            content,
            embedding,
        });
        Ok(())
    }

    fn records(&self) -> &[EmbeddingRecord] {
        &self.records
    }
}

/// `dir/.embeddings.json.tmp` for `dir/embeddings.json`
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "index".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}
