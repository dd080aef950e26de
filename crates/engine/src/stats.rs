//! Data directory statistics.

use crate::config::StoreLayout;
use crate::flat_index::IndexSnapshot;
use crate::metadata::MetadataStore;
use crate::types::StoreStats;
use docsim_core::AppResult;
use std::fs;
use std::path::Path;

/// Record count, index shape, and file sizes for `layout`.
///
/// Reads the index file without cross-checking it against the metadata,
/// so a torn pair still reports both sides.
pub fn collect_stats(layout: &StoreLayout) -> AppResult<StoreStats> {
    let records = MetadataStore::new(layout.metadata_path()).len()?;

    let index_path = layout.index_path();
    let snapshot = if index_path.exists() {
        Some(IndexSnapshot::decode(&fs::read(&index_path)?)?)
    } else {
        None
    };

    Ok(StoreStats {
        records,
        indexed_vectors: snapshot.as_ref().map(|s| s.index.len()),
        dimensions: snapshot.as_ref().map(|s| s.index.dimensions()),
        model: snapshot.map(|s| s.model),
        metadata_bytes: file_size(&layout.metadata_path()),
        index_bytes: file_size(&index_path),
    })
}

fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
