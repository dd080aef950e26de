//! Cross-module pipeline tests and their fixtures.

mod pipeline;

use crate::config::StoreLayout;
use crate::embeddings::{EmbeddingGenerator, EmbeddingProvider};
use crate::lock::RebuildLock;
use crate::builder::IndexBuilder;
use docsim_core::config::IndexConfig;
use docsim_core::{AppError, AppResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

type EmbedFn = dyn Fn(&str) -> AppResult<Vec<f32>> + Send + Sync;

/// Provider driven by a closure, with optional per-call delay and
/// concurrency tracking.
pub(crate) struct FnProvider {
    dimensions: usize,
    embed_fn: Box<EmbedFn>,
    delay: Duration,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl std::fmt::Debug for FnProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnProvider")
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl FnProvider {
    pub fn new(
        dimensions: usize,
        embed_fn: impl Fn(&str) -> AppResult<Vec<f32>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            dimensions,
            embed_fn: Box::new(embed_fn),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for FnProvider {
    fn provider_name(&self) -> &str {
        "test"
    }

    fn model_name(&self) -> &str {
        "test-model"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let result = (self.embed_fn)(text);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Deterministic 3-d vector computed from the text alone.
pub(crate) fn text_vector(text: &str) -> Vec<f32> {
    let bytes = text.as_bytes();
    vec![
        bytes.len() as f32,
        bytes.iter().map(|&b| b as u32).sum::<u32>() as f32 % 97.0,
        bytes.first().copied().unwrap_or(0) as f32,
    ]
}

/// [`text_vector`], failing for any text containing "EMBED-FAIL".
pub(crate) fn text_vector_provider() -> FnProvider {
    FnProvider::new(3, |text| {
        if text.contains("EMBED-FAIL") {
            Err(AppError::Embedding("model rejected input".to_string()))
        } else {
            Ok(text_vector(text))
        }
    })
}

pub(crate) fn generator(provider: Arc<FnProvider>) -> EmbeddingGenerator {
    EmbeddingGenerator::new(provider, 8000)
}

/// Builder with a short lock timeout.
pub(crate) fn builder(layout: &StoreLayout, provider: Arc<FnProvider>, timeout: Duration) -> IndexBuilder {
    IndexBuilder::new(layout.clone(), generator(provider), &IndexConfig::default()).with_lock(
        RebuildLock::new(layout.lock_path(), timeout, Duration::from_millis(10)),
    )
}

/// Text long enough to pass the indexability filter.
pub(crate) fn body(topic: &str) -> String {
    format!("This document discusses {} in considerable detail.", topic)
}
