//! Configuration management for docsim.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config file (`.docsim/config.yaml`)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric: the metadata file, the index
//! snapshot and the rebuild lock all live in `<workspace>/.docsim/`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Embedding providers understood by the engine.
pub const KNOWN_PROVIDERS: [&str; 4] = ["azure-openai", "openai", "ollama", "mock"];

/// Environment variables consulted for the embedding API key, in order.
const API_KEY_VARS: [&str; 2] = ["OPENAI_API_KEY", "AZURE_OPENAI_KEY"];

/// Environment variables consulted for the embedding endpoint, in order.
const ENDPOINT_VARS: [&str; 2] = ["OPENAI_API_BASE", "AZURE_OPENAI_ENDPOINT"];

/// Environment variables consulted for the embedding model, in order.
const MODEL_VARS: [&str; 3] = ["DOCSIM_EMBED_MODEL", "EMBED_DEPLOYMENT", "EMBED_MODEL"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .docsim/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Log line format ("pretty" or "json")
    pub log_format: String,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Embedding model settings
    pub embedding: EmbeddingConfig,

    /// Index rebuild settings
    pub index: IndexConfig,

    /// Text extraction settings
    pub extraction: ExtractionConfig,
}

/// Embedding model configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingConfig {
    /// Provider name: "azure-openai", "openai", "ollama", "mock"
    pub provider: String,

    /// Model identifier (deployment name for Azure)
    pub model: String,

    /// Base URL of the embedding service
    pub endpoint: Option<String>,

    /// Name of an environment variable holding the API key
    pub api_key_env: Option<String>,

    /// Resolved API key, never read from or written to the config file
    #[serde(skip)]
    pub api_key: Option<String>,

    /// API version query parameter (Azure only)
    pub api_version: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Texts longer than this many characters are truncated (head kept)
    pub max_input_chars: usize,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Attempts per embedding call before giving up
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "azure-openai".to_string(),
            model: "text-embedding-ada-002".to_string(),
            endpoint: None,
            api_key_env: None,
            api_key: None,
            api_version: "2023-05-15".to_string(),
            dimensions: 1536,
            max_input_chars: 8000,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

/// Index rebuild configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct IndexConfig {
    /// How long a rebuild waits for the lock before abandoning the run
    pub lock_timeout_secs: u64,

    /// Interval between lock acquisition attempts
    pub lock_poll_millis: u64,

    /// Minimum trimmed text length for a document to be indexed
    pub min_text_chars: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            lock_timeout_secs: 60,
            lock_poll_millis: 100,
            min_text_chars: 20,
        }
    }
}

/// Text extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractionConfig {
    /// Run OCR as the last PDF stage
    pub ocr_enabled: bool,

    /// Page rasterization resolution for OCR
    pub ocr_dpi: u32,

    /// Page rasterizer executable
    pub pdftoppm_bin: String,

    /// OCR engine executable
    pub tesseract_bin: String,

    /// Tesseract language code (e.g. "kor+eng"); engine default when unset
    pub ocr_language: Option<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            ocr_enabled: true,
            ocr_dpi: 300,
            pdftoppm_bin: "pdftoppm".to_string(),
            tesseract_bin: "tesseract".to_string(),
            ocr_language: None,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    workspace: Option<WorkspaceSection>,
    logging: Option<LoggingSection>,
    embedding: Option<EmbeddingConfig>,
    index: Option<IndexConfig>,
    extraction: Option<ExtractionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
    format: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            log_format: "pretty".to_string(),
            verbose: false,
            no_color: false,
            embedding: EmbeddingConfig::default(),
            index: IndexConfig::default(),
            extraction: ExtractionConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML file and the environment.
    ///
    /// Environment variables:
    /// - `DOCSIM_WORKSPACE`: Override workspace path
    /// - `DOCSIM_CONFIG`: Path to config file
    /// - `DOCSIM_EMBED_PROVIDER`: Embedding provider
    /// - `DOCSIM_EMBED_MODEL` / `EMBED_DEPLOYMENT` / `EMBED_MODEL`: Embedding model
    /// - `OPENAI_API_KEY` / `AZURE_OPENAI_KEY`: API key
    /// - `OPENAI_API_BASE` / `AZURE_OPENAI_ENDPOINT`: Endpoint
    /// - `OPENAI_API_VERSION`: Azure API version
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use docsim_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Load configuration, with explicit workspace and config file paths
    /// taking precedence over `DOCSIM_WORKSPACE` / `DOCSIM_CONFIG`.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        Self::load_with_env(workspace, config_file, |key| std::env::var(key).ok())
    }

    fn load_with_env<F>(
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        env: F,
    ) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| env("DOCSIM_WORKSPACE").map(PathBuf::from)) {
            config.workspace = workspace;
        }

        config.config_file = config_file.or_else(|| env("DOCSIM_CONFIG").map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.data_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        config.apply_env(&env);

        Ok(config)
    }

    fn apply_env<F>(&mut self, env: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = env("DOCSIM_EMBED_PROVIDER") {
            self.embedding.provider = provider;
        }

        if let Some(model) = MODEL_VARS.iter().find_map(|key| env(*key)) {
            self.embedding.model = model;
        }

        if let Some(endpoint) = ENDPOINT_VARS.iter().find_map(|key| env(*key)) {
            self.embedding.endpoint = Some(endpoint);
        }

        if let Some(version) = env("OPENAI_API_VERSION") {
            self.embedding.api_version = version;
        }

        self.embedding.api_key = self
            .embedding
            .api_key_env
            .as_deref()
            .and_then(|key| env(key))
            .or_else(|| API_KEY_VARS.iter().find_map(|key| env(*key)));

        if let Some(level) = env("RUST_LOG") {
            self.log_level = Some(level);
        }

        if env("NO_COLOR").is_some() {
            self.no_color = true;
        }
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(format) = logging.format {
                result.log_format = format;
            }
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }

        if let Some(index) = config_file.index {
            result.index = index;
        }

        if let Some(extraction) = config_file.extraction {
            result.extraction = extraction;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    pub fn with_overrides(
        mut self,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        log_format: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(provider) = provider {
            self.embedding.provider = provider;
        }

        if let Some(model) = model {
            self.embedding.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if let Some(log_format) = log_format {
            self.log_format = log_format;
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .docsim directory.
    pub fn data_dir(&self) -> PathBuf {
        self.workspace.join(".docsim")
    }

    /// Ensure the .docsim directory exists.
    pub fn ensure_data_dir(&self) -> AppResult<()> {
        let data_dir = self.data_dir();
        if !data_dir.exists() {
            std::fs::create_dir_all(&data_dir).map_err(|e| {
                AppError::Config(format!("Failed to create .docsim directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> AppResult<()> {
        let embedding = &self.embedding;

        if !KNOWN_PROVIDERS.contains(&embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                embedding.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be greater than zero".to_string(),
            ));
        }

        if embedding.max_input_chars == 0 {
            return Err(AppError::Config(
                "maxInputChars must be greater than zero".to_string(),
            ));
        }

        if self.index.lock_timeout_secs == 0 {
            return Err(AppError::Config(
                "lockTimeoutSecs must be greater than zero".to_string(),
            ));
        }

        match embedding.provider.as_str() {
            "azure-openai" => {
                if embedding.endpoint.is_none() {
                    return Err(AppError::Config(
                        "azure-openai requires an endpoint (AZURE_OPENAI_ENDPOINT)".to_string(),
                    ));
                }
                if embedding.api_key.is_none() {
                    return Err(AppError::Config(
                        "azure-openai requires an API key (AZURE_OPENAI_KEY)".to_string(),
                    ));
                }
            }
            "openai" => {
                if embedding.api_key.is_none() {
                    return Err(AppError::Config(
                        "openai requires an API key (OPENAI_API_KEY)".to_string(),
                    ));
                }
            }
            // Local providers don't require API keys
            _ => {}
        }

        crate::logging::LogFormat::parse(&self.log_format)?;

        Ok(())
    }
}
