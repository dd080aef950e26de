//! Full index rebuild from the metadata store.
//!
//! A run holds the rebuild lock from start to finish, filters out records
//! with no usable text, embeds the rest one by one, and replaces the served
//! index/row pair. Per-record embedding failures drop that record only. If
//! nothing survives, nothing is written.
//!
//! Uploads do not take the lock. When the store changes while a run is
//! embedding, the run starts another pass over the new contents, reusing
//! vectors for records it has already seen, up to [`MAX_PASSES`]. After the
//! last pass it writes what it has and keeps later arrivals in the store
//! for the next run.

use crate::config::StoreLayout;
use crate::embeddings::EmbeddingGenerator;
use crate::flat_index::{FlatIndex, IndexSnapshot};
use crate::lock::{LockAttempt, RebuildLock};
use crate::metadata::MetadataStore;
use crate::types::{DocumentRecord, DroppedRecord, ExclusionReason, RebuildOutcome, RebuildReport};
use chrono::Utc;
use docsim_core::config::IndexConfig;
use docsim_core::AppResult;
use std::collections::HashMap;
use std::time::Instant;

/// Filter/embed passes a single run makes before writing regardless.
pub const MAX_PASSES: usize = 3;

/// URL prefixes that mark a record as a bare link.
const URL_PREFIXES: [&str; 2] = ["http://", "https://"];

/// Decide whether `text` is worth embedding.
pub fn check_indexable(text: &str, min_chars: usize) -> Result<(), ExclusionReason> {
    if text.is_empty() {
        return Err(ExclusionReason::Empty);
    }

    let trimmed = text.trim();
    let chars = trimmed.chars().count();
    if chars < min_chars {
        return Err(ExclusionReason::TooShort {
            chars,
            min: min_chars,
        });
    }

    let lower = trimmed.to_lowercase();
    if URL_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return Err(ExclusionReason::LooksLikeUrl);
    }

    Ok(())
}

/// Rebuilds the flat index and filtered metadata of one data directory.
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    layout: StoreLayout,
    store: MetadataStore,
    generator: EmbeddingGenerator,
    lock: RebuildLock,
    min_text_chars: usize,
}

impl IndexBuilder {
    pub fn new(layout: StoreLayout, generator: EmbeddingGenerator, config: &IndexConfig) -> Self {
        Self {
            store: MetadataStore::new(layout.metadata_path()),
            lock: RebuildLock::from_config(layout.lock_path(), config),
            layout,
            generator,
            min_text_chars: config.min_text_chars,
        }
    }

    /// Use `lock` instead of the configured one.
    pub fn with_lock(mut self, lock: RebuildLock) -> Self {
        self.lock = lock;
        self
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// One complete rebuild attempt.
    ///
    /// Errors are reserved for I/O and persistence failures; every other
    /// ending, including a lock timeout, is a [`RebuildOutcome`].
    pub async fn run(&self) -> AppResult<RebuildOutcome> {
        let started_at = Utc::now();
        let clock = Instant::now();

        let _guard = match self.lock.acquire().await? {
            LockAttempt::Acquired(guard) => guard,
            LockAttempt::TimedOut { waited } => {
                tracing::warn!(
                    "Could not acquire rebuild lock within {:?}; abandoning this rebuild",
                    self.lock.timeout()
                );
                return Ok(RebuildOutcome::LockTimedOut {
                    waited_secs: waited.as_secs_f64(),
                });
            }
        };

        let mut seen = HashMap::new();
        let mut records = self.store.load()?;
        let mut passes = 0;
        let pass = loop {
            passes += 1;
            tracing::info!(records = records.len(), pass = passes, "Loaded metadata for rebuild");

            let pass = self.embed_pass(&records, &mut seen).await;
            let current = self.store.load()?;
            if current == records {
                break pass;
            }
            if passes == MAX_PASSES {
                tracing::warn!(
                    passes,
                    "Metadata still changing; writing this pass and leaving newer records for the next run"
                );
                break pass;
            }
            tracing::info!("Metadata changed during rebuild; starting another pass");
            records = current;
        };

        let total_records = records.len();
        if pass.kept.is_empty() {
            tracing::warn!(
                records = total_records,
                excluded = pass.excluded.len(),
                failed = pass.failed.len(),
                "No documents to index; keeping the existing index"
            );
            return Ok(RebuildOutcome::NothingToIndex {
                total_records,
                excluded: pass.excluded.len(),
                failed: pass.failed.len(),
            });
        }

        let dimensions = self.generator.dimensions();
        let index = FlatIndex::from_rows(dimensions, &pass.vectors)?;
        IndexSnapshot::write_pair(&self.layout, index, self.generator.model_name(), &pass.kept)?;
        let deferred = self.replace_store(&records, &pass.kept)?;

        let report = RebuildReport {
            total_records,
            indexed: pass.kept.len(),
            excluded: pass.excluded,
            failed: pass.failed,
            dimensions,
            passes,
            deferred,
            started_at,
            duration_secs: clock.elapsed().as_secs_f64(),
        };

        tracing::info!(
            vectors = report.indexed,
            excluded = report.excluded.len(),
            failed = report.failed.len(),
            deferred,
            "Index rebuilt"
        );

        Ok(RebuildOutcome::Rebuilt(report))
    }

    /// Filter and embed `records`. Outcomes already in `seen` are reused.
    async fn embed_pass(
        &self,
        records: &[DocumentRecord],
        seen: &mut HashMap<DocumentRecord, Result<Vec<f32>, String>>,
    ) -> Pass {
        let dimensions = self.generator.dimensions();
        let mut pass = Pass::default();

        for record in records {
            if let Err(reason) = check_indexable(&record.text, self.min_text_chars) {
                tracing::info!(source = %record.source, %reason, "Excluded from index");
                pass.excluded.push(DroppedRecord {
                    source: record.source.clone(),
                    detail: reason.to_string(),
                });
                continue;
            }

            if !seen.contains_key(record) {
                tracing::debug!(source = %record.source, "Embedding document");
                let result = match self.generator.embed(&record.text).await {
                    Ok(vector) if vector.len() == dimensions => Ok(vector),
                    Ok(vector) => Err(format!(
                        "embedding has {} dimensions, expected {}",
                        vector.len(),
                        dimensions
                    )),
                    Err(e) => Err(e.to_string()),
                };
                seen.insert(record.clone(), result);
            }

            match seen.get(record) {
                Some(Ok(vector)) => {
                    tracing::info!(source = %record.source, "Embedded document");
                    pass.kept.push(record.clone());
                    pass.vectors.push(vector.clone());
                }
                Some(Err(detail)) => {
                    tracing::warn!(source = %record.source, %detail, "Embedding failed");
                    pass.failed.push(DroppedRecord {
                        source: record.source.clone(),
                        detail: detail.clone(),
                    });
                }
                None => {}
            }
        }

        pass
    }

    /// Replace the store with `kept`, followed by every record that is in
    /// the store now but was not in `embedded`. Returns how many such late
    /// records were carried over.
    ///
    /// Uploads take no lock, so one landing between the read and the rename
    /// below is still overwritten; the window is that one read-then-rename.
    fn replace_store(&self, embedded: &[DocumentRecord], kept: &[DocumentRecord]) -> AppResult<usize> {
        let late: Vec<DocumentRecord> = self
            .store
            .load()?
            .into_iter()
            .filter(|r| !embedded.contains(r))
            .collect();

        let mut next: Vec<DocumentRecord> = kept
            .iter()
            .filter(|k| !late.iter().any(|l| l.source == k.source))
            .cloned()
            .collect();
        if !late.is_empty() {
            tracing::info!(records = late.len(), "Keeping records that arrived during the rebuild");
        }
        let deferred = late.len();
        next.extend(late);

        self.store.replace_all(&next)?;
        Ok(deferred)
    }
}

/// Result of one filter/embed pass.
#[derive(Debug, Default)]
struct Pass {
    kept: Vec<DocumentRecord>,
    vectors: Vec<Vec<f32>>,
    excluded: Vec<DroppedRecord>,
    failed: Vec<DroppedRecord>,
}
