//! Embedding provider trait and factory.

use docsim_core::config::EmbeddingConfig;
use docsim_core::{AppError, AppResult};
use reqwest::StatusCode;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Initial backoff between attempts, doubled after each failure.
const INITIAL_BACKOFF_MS: u64 = 200;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "mock", "openai", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Embed one text. The text is already truncated by the caller.
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>>;
}

/// Create an embedding provider based on configuration.
pub fn create_provider(config: &EmbeddingConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    if config.dimensions == 0 {
        return Err(AppError::Config(
            "Embedding dimensions must be greater than zero".to_string(),
        ));
    }

    match config.provider.as_str() {
        "mock" => Ok(Arc::new(super::providers::mock::MockProvider::new(
            config.dimensions,
        ))),

        "azure-openai" => Ok(Arc::new(super::providers::openai::OpenAiProvider::azure(
            config,
        )?)),

        "openai" => Ok(Arc::new(super::providers::openai::OpenAiProvider::openai(
            config,
        )?)),

        "ollama" => Ok(Arc::new(super::providers::ollama::OllamaProvider::new(
            config,
        )?)),

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: azure-openai, openai, ollama, mock",
            config.provider
        ))),
    }
}

/// HTTP client with the configured per-request timeout.
pub(crate) fn http_client(timeout_secs: u64) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AppError::Embedding(format!("Failed to create HTTP client: {}", e)))
}

/// Failure of one request attempt.
#[derive(Debug)]
pub(crate) enum AttemptError {
    /// Transport failure, rate limit or server error
    Transient(AppError),
    /// A repeat of the same request would fail the same way
    Permanent(AppError),
}

impl AttemptError {
    /// Classify a non-success HTTP status: 429 and 5xx are transient.
    pub(crate) fn from_status(status: StatusCode, error: AppError) -> Self {
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            Self::Transient(error)
        } else {
            Self::Permanent(error)
        }
    }

    fn into_inner(self) -> AppError {
        match self {
            Self::Transient(e) | Self::Permanent(e) => e,
        }
    }
}

impl From<AppError> for AttemptError {
    fn from(error: AppError) -> Self {
        Self::Permanent(error)
    }
}

/// Run `attempt` up to `max_attempts` times with exponential backoff.
///
/// Only [`AttemptError::Transient`] failures are retried.
pub(crate) async fn with_retries<F, Fut>(
    max_attempts: u32,
    mut attempt: F,
) -> AppResult<Vec<f32>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<f32>, AttemptError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut last_error = None;

    for n in 1..=max_attempts {
        match attempt().await {
            Ok(embedding) => return Ok(embedding),
            Err(AttemptError::Permanent(e)) => return Err(e),
            Err(AttemptError::Transient(e)) => {
                if n < max_attempts {
                    let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(n - 1);
                    tracing::warn!(
                        "Embedding failed (attempt {}/{}), retrying in {}ms: {}",
                        n,
                        max_attempts,
                        backoff_ms,
                        e
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
                last_error = Some(AttemptError::Transient(e));
            }
        }
    }

    Err(last_error
        .map(AttemptError::into_inner)
        .unwrap_or_else(|| AppError::Embedding("Unknown embedding error".to_string())))
}

/// Reject vectors whose length differs from the configured dimension.
pub(crate) fn check_dimensions(embedding: Vec<f32>, expected: usize) -> AppResult<Vec<f32>> {
    if embedding.len() != expected {
        return Err(AppError::Embedding(format!(
            "Unexpected embedding dimensions: got {}, expected {}",
            embedding.len(),
            expected
        )));
    }
    Ok(embedding)
}
