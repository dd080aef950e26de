//! Metadata store: the ordered sequence of document records in `meta.json`.
//!
//! The whole sequence is rewritten on every change. A rebuild replaces it
//! with the records it indexed, in index order, followed by any that arrived
//! while it ran. The served index reads its rows from its own copy.

use crate::persist::write_atomic;
use crate::types::DocumentRecord;
use docsim_core::{AppError, AppResult};
use std::fs;
use std::path::{Path, PathBuf};

/// File-backed ordered sequence of [`DocumentRecord`]s.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    path: PathBuf,
}

impl MetadataStore {
    /// Store backed by the JSON file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the full ordered sequence. A missing file is an empty store.
    pub fn load(&self) -> AppResult<Vec<DocumentRecord>> {
        if !self.path.exists() {
            tracing::debug!("No metadata at {:?}, starting empty", self.path);
            return Ok(Vec::new());
        }

        let bytes = fs::read(&self.path)?;
        Self::decode(&bytes).map_err(|e| {
            AppError::Serialization(format!("Failed to parse {:?}: {}", self.path, e))
        })
    }

    /// Remove any record with the same `source`, append `record`, persist.
    pub fn upsert(&self, record: DocumentRecord) -> AppResult<()> {
        let mut records = self.load()?;
        let before = records.len();
        records.retain(|r| r.source != record.source);

        if records.len() < before {
            tracing::debug!(source = %record.source, "Replacing existing metadata record");
        }

        records.push(record);
        self.write(&records)
    }

    /// Atomically overwrite the persisted sequence with exactly `records`.
    ///
    /// Only the index builder calls this, and only while holding the
    /// rebuild lock.
    pub fn replace_all(&self, records: &[DocumentRecord]) -> AppResult<()> {
        self.write(records)?;
        tracing::debug!("Replaced metadata with {} records", records.len());
        Ok(())
    }

    /// Look up one record by source name.
    pub fn get(&self, source: &str) -> AppResult<Option<DocumentRecord>> {
        Ok(self.load()?.into_iter().find(|r| r.source == source))
    }

    /// Number of stored records.
    pub fn len(&self) -> AppResult<usize> {
        Ok(self.load()?.len())
    }

    /// True when the store holds no records.
    pub fn is_empty(&self) -> AppResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Serialize records exactly as they are written to disk.
    pub fn encode(records: &[DocumentRecord]) -> AppResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(records)?)
    }

    /// Parse the on-disk representation.
    pub fn decode(bytes: &[u8]) -> AppResult<Vec<DocumentRecord>> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn write(&self, records: &[DocumentRecord]) -> AppResult<()> {
        let bytes = Self::encode(records)?;
        write_atomic(&self.path, &bytes)
    }
}
