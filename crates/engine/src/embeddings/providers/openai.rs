//! OpenAI-compatible embedding providers (Azure OpenAI and OpenAI).
//!
//! Both services share the request/response shape; they differ in URL
//! layout and in how the key is sent.

use crate::embeddings::provider::{
    check_dimensions, http_client, with_retries, AttemptError, EmbeddingProvider,
};
use async_trait::async_trait;
use docsim_core::config::EmbeddingConfig;
use docsim_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavor {
    Azure,
    OpenAi,
}

/// Embeddings over the `/embeddings` REST endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: Client,
    flavor: Flavor,
    url: String,
    api_key: String,
    model: String,
    dimensions: usize,
    max_retries: u32,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: [&'a str; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl OpenAiProvider {
    /// Azure OpenAI: the model is the deployment name.
    pub fn azure(config: &EmbeddingConfig) -> AppResult<Self> {
        let endpoint = config.endpoint.as_deref().ok_or_else(|| {
            AppError::Config(
                "Azure OpenAI needs an endpoint (embedding.endpoint or AZURE_OPENAI_ENDPOINT)"
                    .to_string(),
            )
        })?;

        let url = format!(
            "{}/openai/deployments/{}/embeddings?api-version={}",
            endpoint.trim_end_matches('/'),
            config.model,
            config.api_version
        );

        Self::build(config, Flavor::Azure, url)
    }

    /// OpenAI proper, or any server speaking its `/v1/embeddings` API.
    pub fn openai(config: &EmbeddingConfig) -> AppResult<Self> {
        let base = config
            .endpoint
            .as_deref()
            .unwrap_or(DEFAULT_OPENAI_URL)
            .trim_end_matches('/');
        let url = format!("{}/v1/embeddings", base);

        Self::build(config, Flavor::OpenAi, url)
    }

    fn build(config: &EmbeddingConfig, flavor: Flavor, url: String) -> AppResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config(format!(
                    "Provider '{}' needs an API key (OPENAI_API_KEY, AZURE_OPENAI_KEY or embedding.apiKeyEnv)",
                    config.provider
                ))
            })?;

        Ok(Self {
            client: http_client(config.timeout_secs)?,
            flavor,
            url,
            api_key,
            model: config.model.clone(),
            dimensions: config.dimensions,
            max_retries: config.max_retries,
        })
    }

    /// Request URL, including the Azure query string.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn embed_once(&self, text: &str) -> Result<Vec<f32>, AttemptError> {
        let request = EmbeddingRequest {
            input: [text],
            model: match self.flavor {
                Flavor::Azure => None,
                Flavor::OpenAi => Some(self.model.as_str()),
            },
        };

        let builder = self.client.post(&self.url).json(&request);
        let builder = match self.flavor {
            Flavor::Azure => builder.header("api-key", &self.api_key),
            Flavor::OpenAi => builder.bearer_auth(&self.api_key),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| {
                AttemptError::Transient(AppError::Embedding(format!(
                    "Embedding request failed: {}",
                    e
                )))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);
            return Err(AttemptError::from_status(
                status,
                AppError::Embedding(format!("Embedding API error ({}): {}", status, message)),
            ));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to parse embedding response: {}", e)))?;

        let embedding = body
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| AppError::Embedding("Embedding response had no data".to_string()))?;

        Ok(check_dimensions(embedding, self.dimensions)?)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        match self.flavor {
            Flavor::Azure => "azure-openai",
            Flavor::OpenAi => "openai",
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, text), fields(text_len = text.len(), provider = self.provider_name(), model = %self.model))]
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let embedding = with_retries(self.max_retries, || self.embed_once(text)).await?;
        debug!("Generated {} dimensional embedding", embedding.len());
        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::test_server;

    /// Talk to the local test server without any proxy from the environment.
    fn direct(mut provider: OpenAiProvider) -> OpenAiProvider {
        provider.client = Client::builder().no_proxy().build().unwrap();
        provider
    }

    fn config(provider: &str, endpoint: Option<String>) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: provider.to_string(),
            model: "embed-deploy".to_string(),
            endpoint,
            api_key: Some("secret".to_string()),
            dimensions: 3,
            max_retries: 1,
            timeout_secs: 5,
            ..Default::default()
        }
    }

    #[test]
    fn test_azure_url_layout() {
        let provider =
            OpenAiProvider::azure(&config("azure-openai", Some("https://acme.openai.azure.com/".into())))
                .unwrap();
        assert_eq!(
            provider.url(),
            "https://acme.openai.azure.com/openai/deployments/embed-deploy/embeddings?api-version=2023-05-15"
        );
        assert_eq!(provider.provider_name(), "azure-openai");
    }

    #[test]
    fn test_missing_key_or_endpoint() {
        let mut no_key = config("openai", None);
        no_key.api_key = None;
        assert!(matches!(OpenAiProvider::openai(&no_key), Err(AppError::Config(_))));

        assert!(matches!(
            OpenAiProvider::azure(&config("azure-openai", None)),
            Err(AppError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_azure_request_shape() {
        let (url, server) = test_server::serve(vec![(
            200,
            r#"{"data":[{"embedding":[0.5,0.25,0.125],"index":0}]}"#.to_string(),
        )])
        .await;

        let provider = direct(OpenAiProvider::azure(&config("azure-openai", Some(url))).unwrap());
        let embedding = provider.embed("hello").await.unwrap();
        assert_eq!(embedding, vec![0.5, 0.25, 0.125]);

        let captured = server.await.unwrap();
        let head = captured[0].head.to_ascii_lowercase();
        assert!(head.starts_with("post /openai/deployments/embed-deploy/embeddings?api-version=2023-05-15"));
        assert!(head.contains("api-key: secret"));

        let body: serde_json::Value = serde_json::from_str(&captured[0].body).unwrap();
        assert_eq!(body, serde_json::json!({"input": ["hello"]}));
    }

    #[tokio::test]
    async fn test_openai_bearer_and_model() {
        let (url, server) = test_server::serve(vec![(
            200,
            r#"{"data":[{"embedding":[1.0,0.0,0.0]}]}"#.to_string(),
        )])
        .await;

        let provider = direct(OpenAiProvider::openai(&config("openai", Some(url))).unwrap());
        provider.embed("hi").await.unwrap();

        let captured = server.await.unwrap();
        let head = captured[0].head.to_ascii_lowercase();
        assert!(head.starts_with("post /v1/embeddings"));
        assert!(head.contains("authorization: bearer secret"));

        let body: serde_json::Value = serde_json::from_str(&captured[0].body).unwrap();
        assert_eq!(body["model"], "embed-deploy");
    }

    #[tokio::test]
    async fn test_api_error_and_wrong_dimensions() {
        let (url, _server) = test_server::serve(vec![
            (429, r#"{"error":{"message":"rate limited"}}"#.to_string()),
            (200, r#"{"data":[{"embedding":[1.0]}]}"#.to_string()),
        ])
        .await;

        let provider = direct(OpenAiProvider::openai(&config("openai", Some(url))).unwrap());

        let err = provider.embed("a").await.unwrap_err();
        assert!(err.to_string().contains("rate limited"));

        let err = provider.embed("b").await.unwrap_err();
        assert!(err.to_string().contains("Unexpected embedding dimensions"));
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_retried() {
        let (url, _server) = test_server::serve(vec![
            (401, r#"{"error":{"message":"invalid api key"}}"#.to_string()),
            (200, r#"{"data":[{"embedding":[1.0,0.0,0.0]}]}"#.to_string()),
        ])
        .await;

        let mut retrying = config("openai", Some(url));
        retrying.max_retries = 3;
        let provider = direct(OpenAiProvider::openai(&retrying).unwrap());

        let err = provider.embed("a").await.unwrap_err();
        assert!(err.to_string().contains("invalid api key"));
    }
}
