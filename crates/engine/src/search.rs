//! Query-time similarity search over a loaded snapshot.
//!
//! The engine owns an in-memory copy of one verified index/metadata pair.
//! It never refreshes on its own: results reflect the pair as of the last
//! [`VectorSearchEngine::load`] or [`VectorSearchEngine::reload`], however
//! many rebuilds have happened since.

use crate::config::StoreLayout;
use crate::embeddings::EmbeddingGenerator;
use crate::flat_index::{FlatIndex, IndexSnapshot};
use crate::types::{DocumentRecord, SearchHit};
use chrono::{DateTime, Utc};
use docsim_core::{AppError, AppResult};
use serde::Serialize;
use std::sync::{Arc, RwLock};

/// `1 / (1 + distance)`.
pub fn similarity(distance: f32) -> f32 {
    1.0 / (1.0 + distance)
}

/// A verified index and the metadata rows it was built from.
#[derive(Debug)]
pub struct LoadedSnapshot {
    pub index: FlatIndex,
    pub records: Vec<DocumentRecord>,
    pub model: String,
    pub loaded_at: DateTime<Utc>,
}

/// What the engine is currently serving.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotInfo {
    pub vectors: usize,
    pub dimensions: usize,
    pub model: String,
    pub loaded_at: DateTime<Utc>,
}

/// Ranked k-NN search over the last loaded snapshot.
#[derive(Debug)]
pub struct VectorSearchEngine {
    layout: StoreLayout,
    generator: EmbeddingGenerator,
    snapshot: RwLock<Option<Arc<LoadedSnapshot>>>,
}

impl VectorSearchEngine {
    /// Engine with nothing loaded yet.
    pub fn new(layout: StoreLayout, generator: EmbeddingGenerator) -> Self {
        Self {
            layout,
            generator,
            snapshot: RwLock::new(None),
        }
    }

    /// Construct and load in one step.
    pub fn open(layout: StoreLayout, generator: EmbeddingGenerator) -> AppResult<Self> {
        let engine = Self::new(layout, generator);
        engine.load()?;
        Ok(engine)
    }

    /// Read and verify the persisted pair, replacing what is served.
    ///
    /// On error the previously loaded snapshot, if any, stays in place.
    pub fn load(&self) -> AppResult<SnapshotInfo> {
        let (snapshot, records) = IndexSnapshot::read_pair(&self.layout)?.ok_or_else(|| {
            AppError::Index(format!(
                "No index at {:?}; run a rebuild first",
                self.layout.index_path()
            ))
        })?;

        if snapshot.model != self.generator.model_name() {
            tracing::warn!(
                index_model = %snapshot.model,
                query_model = %self.generator.model_name(),
                "Index was built with a different embedding model; distances may be meaningless"
            );
        }

        let loaded = Arc::new(LoadedSnapshot {
            index: snapshot.index,
            records,
            model: snapshot.model,
            loaded_at: Utc::now(),
        });
        let info = Self::info_of(&loaded);

        *self
            .snapshot
            .write()
            .map_err(|_| AppError::Other("Snapshot lock poisoned".to_string()))? = Some(loaded);

        tracing::info!(vectors = info.vectors, model = %info.model, "Search snapshot loaded");
        Ok(info)
    }

    /// Same as [`load`](Self::load); named for call sites that refresh.
    pub fn reload(&self) -> AppResult<SnapshotInfo> {
        self.load().inspect_err(|e| {
            tracing::warn!(error = %e, "Reload failed; still serving the previous snapshot");
        })
    }

    /// Details of the snapshot being served, if any.
    pub fn snapshot_info(&self) -> Option<SnapshotInfo> {
        self.current().ok().map(|s| Self::info_of(&s))
    }

    /// Embed `query_text` and return up to `top_k` hits, best first.
    pub async fn search(&self, query_text: &str, top_k: usize) -> AppResult<Vec<SearchHit>> {
        if top_k == 0 {
            return Err(AppError::Search("top_k must be at least 1".to_string()));
        }

        let snapshot = self.current()?;
        let query = self.generator.embed(query_text).await?;
        rank(&snapshot, &query, top_k)
    }

    fn current(&self) -> AppResult<Arc<LoadedSnapshot>> {
        self.snapshot
            .read()
            .map_err(|_| AppError::Other("Snapshot lock poisoned".to_string()))?
            .clone()
            .ok_or_else(|| AppError::Search("No index snapshot loaded".to_string()))
    }

    fn info_of(snapshot: &LoadedSnapshot) -> SnapshotInfo {
        SnapshotInfo {
            vectors: snapshot.index.len(),
            dimensions: snapshot.index.dimensions(),
            model: snapshot.model.clone(),
            loaded_at: snapshot.loaded_at,
        }
    }
}

/// Search `snapshot` with an already embedded query.
pub fn rank(snapshot: &LoadedSnapshot, query: &[f32], top_k: usize) -> AppResult<Vec<SearchHit>> {
    let neighbors = snapshot
        .index
        .search(query, top_k)
        .map_err(|e| AppError::Search(e.to_string()))?;

    let mut hits: Vec<SearchHit> = neighbors
        .labels
        .iter()
        .zip(&neighbors.distances)
        .filter_map(|(&label, &distance)| {
            let row = usize::try_from(label).ok()?;
            let record = snapshot.records.get(row)?;
            Some(SearchHit {
                document_name: record.source.clone(),
                similarity: similarity(distance),
            })
        })
        .collect();

    hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_snapshot(records: usize) -> LoadedSnapshot {
        LoadedSnapshot {
            index: FlatIndex::from_rows(2, &[vec![0.0, 0.0], vec![3.0, 4.0]]).unwrap(),
            records: ["A", "B"]
                .iter()
                .take(records)
                .map(|s| DocumentRecord::new(*s, "", "text/plain", 0))
                .collect(),
            model: "toy".to_string(),
            loaded_at: Utc::now(),
        }
    }

    #[test]
    fn test_similarity_monotonic() {
        assert_eq!(similarity(0.0), 1.0);
        let distances = [0.0f32, 0.5, 1.0, 25.0, 1e6];
        for pair in distances.windows(2) {
            assert!(similarity(pair[0]) > similarity(pair[1]));
        }
        assert_eq!(similarity(f32::INFINITY), 0.0);
    }

    #[test]
    fn test_toy_ranking() {
        let hits = rank(&toy_snapshot(2), &[0.0, 0.0], 2).unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document_name, "A");
        assert_eq!(hits[0].similarity, 1.0);
        assert_eq!(hits[1].document_name, "B");
        assert!((hits[1].similarity - 1.0 / 26.0).abs() < 1e-6);
        assert_eq!(format!("{:.4}", hits[1].similarity), "0.0385");
    }

    #[test]
    fn test_padding_and_out_of_range_rows_skipped() {
        // top_k beyond the index size yields -1 labels
        let hits = rank(&toy_snapshot(2), &[0.0, 0.0], 5).unwrap();
        assert_eq!(hits.len(), 2);

        // Row 1 has no metadata row
        let hits = rank(&toy_snapshot(1), &[3.0, 4.0], 2).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document_name, "A");
    }
}
