//! Upload path: extract, store, mirror, and schedule a rebuild.

use crate::extract::{DocumentFormat, TextExtractor};
use crate::metadata::MetadataStore;
use crate::queue::{RebuildQueue, RebuildTicket};
use crate::types::DocumentRecord;
use docsim_core::{AppError, AppResult};
use std::sync::Arc;

/// External full-text index that receives a copy of each upload.
///
/// Best effort: failures are logged and never block the upsert.
#[async_trait::async_trait]
pub trait SearchMirror: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Push one record to the external index.
    async fn mirror(&self, record: &DocumentRecord) -> AppResult<()>;
}

/// Per-upload switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOptions {
    /// Replace an existing record with the same name
    pub overwrite: bool,
    /// Submit a rebuild after the upsert
    pub trigger_rebuild: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            trigger_rebuild: true,
        }
    }
}

/// What one ingest did.
#[derive(Debug, Clone)]
pub struct IngestReceipt {
    pub source: String,
    pub format: DocumentFormat,
    pub content_type: String,
    pub size: u64,
    /// Characters of extracted text (0 when nothing usable was found)
    pub text_chars: usize,
    /// Ticket of the submitted rebuild, if one was submitted
    pub rebuild: Option<RebuildTicket>,
}

/// Turns uploaded bytes into a stored record.
pub struct Ingestor {
    store: MetadataStore,
    extractor: Arc<TextExtractor>,
    queue: Arc<RebuildQueue>,
    mirror: Option<Arc<dyn SearchMirror>>,
}

impl Ingestor {
    pub fn new(store: MetadataStore, extractor: TextExtractor, queue: Arc<RebuildQueue>) -> Self {
        Self {
            store,
            extractor: Arc::new(extractor),
            queue,
            mirror: None,
        }
    }

    /// Also send every record to `mirror`.
    pub fn with_mirror(mut self, mirror: Arc<dyn SearchMirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    pub fn queue(&self) -> &Arc<RebuildQueue> {
        &self.queue
    }

    /// Ingest one upload.
    ///
    /// Fails with [`AppError::Conflict`] when `filename` is already stored
    /// and `options.overwrite` is off; the store is left untouched.
    pub async fn ingest(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        declared_content_type: Option<&str>,
        options: &IngestOptions,
    ) -> AppResult<IngestReceipt> {
        if filename.trim().is_empty() {
            return Err(AppError::Other("Document name must not be empty".to_string()));
        }

        if !options.overwrite && self.store.get(filename)?.is_some() {
            return Err(AppError::Conflict(format!(
                "'{}' already exists; re-upload with overwrite to replace it",
                filename
            )));
        }

        let format = DocumentFormat::detect(filename, declared_content_type);
        let content_type = declared_content_type
            .map(str::to_string)
            .unwrap_or_else(|| format.default_content_type().to_string());
        let size = bytes.len() as u64;

        let extractor = Arc::clone(&self.extractor);
        let text = tokio::task::spawn_blocking(move || extractor.extract(&bytes, format))
            .await
            .map_err(|e| AppError::Extraction(format!("Extraction task failed: {}", e)))?;

        let text_chars = text.chars().count();
        tracing::info!(
            source = %filename,
            format = format.as_str(),
            chars = text_chars,
            "Extracted document text"
        );

        let record = DocumentRecord::new(filename, text, content_type.clone(), size);

        if let Some(mirror) = &self.mirror {
            if let Err(e) = mirror.mirror(&record).await {
                tracing::warn!(
                    mirror = mirror.name(),
                    source = %filename,
                    error = %e,
                    "Search mirror update failed"
                );
            }
        }

        self.store.upsert(record)?;

        let rebuild = options.trigger_rebuild.then(|| self.queue.submit());

        Ok(IngestReceipt {
            source: filename.to_string(),
            format,
            content_type,
            size,
            text_chars,
            rebuild,
        })
    }
}
