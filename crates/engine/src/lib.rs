//! Document similarity engine.
//!
//! Uploaded documents are reduced to text, stored as an ordered metadata
//! sequence, embedded, and indexed in a flat L2 index that is always rebuilt
//! from scratch. Row *i* of `index.meta.json` describes vector *i* of
//! `index.bin`; the two files are written and loaded as a pair, and uploads
//! never touch them.
//!
//! Data flow:
//! upload → [`Ingestor`] → [`MetadataStore::upsert`] → [`RebuildQueue`] →
//! [`IndexBuilder`] → `index.bin` + `index.meta.json` → [`VectorSearchEngine`].

pub mod builder;
pub mod config;
pub mod embeddings;
pub mod extract;
pub mod flat_index;
pub mod ingest;
pub mod lock;
pub mod metadata;
pub mod persist;
pub mod queue;
pub mod search;
pub mod stats;
pub mod types;

#[cfg(test)]
mod tests;

pub use builder::{check_indexable, IndexBuilder};
pub use config::StoreLayout;
pub use embeddings::{create_provider, EmbeddingGenerator, EmbeddingProvider};
pub use extract::{DocumentFormat, TextExtractor};
pub use flat_index::{FlatIndex, IndexSnapshot};
pub use ingest::{IngestOptions, IngestReceipt, Ingestor, SearchMirror};
pub use lock::RebuildLock;
pub use metadata::MetadataStore;
pub use queue::{RebuildQueue, RebuildStatus, RebuildTicket};
pub use search::{similarity, SnapshotInfo, VectorSearchEngine};
pub use stats::collect_stats;
pub use types::{
    DocumentRecord, DroppedRecord, ExclusionReason, RebuildOutcome, RebuildReport, SearchHit,
    StoreStats,
};

pub use docsim_core::{AppError, AppResult};

use docsim_core::AppConfig;
use std::sync::Arc;

/// Every engine component wired from one configuration.
pub struct Pipeline {
    pub layout: StoreLayout,
    pub store: MetadataStore,
    pub generator: EmbeddingGenerator,
    pub builder: IndexBuilder,
    pub queue: Arc<RebuildQueue>,
    pub ingestor: Ingestor,
}

impl Pipeline {
    /// Build the components for `config`'s data directory.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        config.ensure_data_dir()?;
        let layout = StoreLayout::new(config.data_dir());
        let generator = EmbeddingGenerator::from_config(&config.embedding)?;
        Ok(Self::assemble(
            layout,
            generator,
            TextExtractor::new(&config.extraction),
            &config.index,
        ))
    }

    /// Wire components around an explicit generator and extractor.
    pub fn assemble(
        layout: StoreLayout,
        generator: EmbeddingGenerator,
        extractor: TextExtractor,
        index_config: &docsim_core::config::IndexConfig,
    ) -> Self {
        let store = MetadataStore::new(layout.metadata_path());
        let builder = IndexBuilder::new(layout.clone(), generator.clone(), index_config);
        let queue = Arc::new(RebuildQueue::new(builder.clone()));
        let ingestor = Ingestor::new(store.clone(), extractor, Arc::clone(&queue));

        Self {
            layout,
            store,
            generator,
            builder,
            queue,
            ingestor,
        }
    }

    /// A search engine over this data directory, not yet loaded.
    pub fn search_engine(&self) -> VectorSearchEngine {
        VectorSearchEngine::new(self.layout.clone(), self.generator.clone())
    }
}
