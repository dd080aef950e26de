//! Error types for docsim.
//!
//! This module defines a unified error enum that covers every error
//! category of the ingestion pipeline and the search engine.

use thiserror::Error;

/// Unified error type for docsim.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
/// Extraction stage failures never reach this type; they are absorbed by the
/// extractor and logged.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Text extraction errors (only raised by individual stages)
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Embedding model call errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Index build, persistence, or snapshot consistency errors
    #[error("Index error: {0}")]
    Index(String),

    /// Rebuild lock errors other than a plain timeout
    #[error("Lock error: {0}")]
    Lock(String),

    /// Query-time errors
    #[error("Search error: {0}")]
    Search(String),

    /// A document with the same name already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
