//! Text to vector conversion.
//!
//! [`EmbeddingGenerator`] applies the head-only truncation policy and hands
//! the text to whichever [`EmbeddingProvider`] the configuration selects.
//! Nothing is cached: identical texts are embedded again on every call.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};

use docsim_core::config::EmbeddingConfig;
use docsim_core::AppResult;
use std::sync::Arc;

/// Truncating front-end over an embedding provider.
#[derive(Debug, Clone)]
pub struct EmbeddingGenerator {
    provider: Arc<dyn EmbeddingProvider>,
    max_input_chars: usize,
}

impl EmbeddingGenerator {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, max_input_chars: usize) -> Self {
        Self {
            provider,
            max_input_chars,
        }
    }

    /// Build the configured provider.
    pub fn from_config(config: &EmbeddingConfig) -> AppResult<Self> {
        let provider = create_provider(config)?;

        tracing::debug!(
            "Embedding provider ready: provider={}, model={}, dimensions={}",
            provider.provider_name(),
            provider.model_name(),
            provider.dimensions()
        );

        Ok(Self::new(provider, config.max_input_chars))
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    /// Embed `text`, truncated to the configured character limit.
    pub async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let input = truncate_chars(text, self.max_input_chars);
        if input.len() < text.len() {
            tracing::debug!(
                "Truncated input from {} to {} characters",
                text.chars().count(),
                self.max_input_chars
            );
        }
        self.provider.embed(input).await
    }
}

/// The first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
