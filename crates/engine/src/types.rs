//! Engine type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One uploaded document, as persisted in `meta.json`.
///
/// `source` is the identity key. Records are only ever replaced wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Original filename, unique within the store
    pub source: String,

    /// Extracted plain text (may be empty)
    #[serde(default)]
    pub text: String,

    /// Declared content type of the upload
    #[serde(default)]
    pub content_type: String,

    /// Size of the raw upload in bytes
    #[serde(default)]
    pub size: u64,
}

impl DocumentRecord {
    /// Create a new record.
    pub fn new(
        source: impl Into<String>,
        text: impl Into<String>,
        content_type: impl Into<String>,
        size: u64,
    ) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
            content_type: content_type.into(),
            size,
        }
    }
}

/// A single ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Source name of the matching document
    pub document_name: String,

    /// `1 / (1 + distance)`, in (0, 1]
    pub similarity: f32,
}

/// Why a record was left out of the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ExclusionReason {
    /// No text at all
    Empty,
    /// Trimmed text shorter than the minimum
    TooShort { chars: usize, min: usize },
    /// Text is just a link
    LooksLikeUrl,
}

impl std::fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "no text"),
            Self::TooShort { chars, min } => {
                write!(f, "text too short ({} chars, minimum {})", chars, min)
            }
            Self::LooksLikeUrl => write!(f, "text starts with http:// or https://"),
        }
    }
}

/// A record that was dropped during a rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedRecord {
    pub source: String,
    pub detail: String,
}

/// Statistics from a completed rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebuildReport {
    /// Records read from the store
    pub total_records: usize,

    /// Vectors written to the new index (== records in the new metadata)
    pub indexed: usize,

    /// Records removed by the indexability filter
    pub excluded: Vec<DroppedRecord>,

    /// Records whose embedding call failed
    pub failed: Vec<DroppedRecord>,

    /// Vector dimension of the new index
    pub dimensions: usize,

    /// Filter/embed passes run; more than one when uploads landed mid-run
    pub passes: usize,

    /// Records that arrived after the last pass, kept in the store unindexed
    pub deferred: usize,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// Duration in seconds, lock wait included
    pub duration_secs: f64,
}

/// How an `IndexBuilder` run ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RebuildOutcome {
    /// A new index/metadata pair was written
    Rebuilt(RebuildReport),

    /// Nothing survived filtering and embedding; prior files untouched
    NothingToIndex {
        total_records: usize,
        excluded: usize,
        failed: usize,
    },

    /// The rebuild lock was not acquired in time; nothing touched
    LockTimedOut { waited_secs: f64 },
}

impl RebuildOutcome {
    /// True when this run replaced the persisted pair.
    pub fn is_rebuilt(&self) -> bool {
        matches!(self, Self::Rebuilt(_))
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        match self {
            Self::Rebuilt(report) => format!(
                "Rebuilt index: {} of {} documents indexed ({} excluded, {} failed) in {:.2}s",
                report.indexed,
                report.total_records,
                report.excluded.len(),
                report.failed.len(),
                report.duration_secs
            ),
            Self::NothingToIndex {
                total_records,
                excluded,
                failed,
            } => format!(
                "No indexable documents ({} records, {} excluded, {} failed); index left unchanged",
                total_records, excluded, failed
            ),
            Self::LockTimedOut { waited_secs } => format!(
                "Another rebuild holds the lock (waited {:.1}s); run abandoned",
                waited_secs
            ),
        }
    }
}

/// Statistics for a data directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    /// Records in meta.json
    pub records: usize,

    /// Vectors in index.bin (None when no index exists)
    pub indexed_vectors: Option<usize>,

    /// Vector dimension of the index
    pub dimensions: Option<usize>,

    /// Model the index was built with
    pub model: Option<String>,

    /// Size of meta.json in bytes
    pub metadata_bytes: u64,

    /// Size of index.bin in bytes
    pub index_bytes: u64,
}
