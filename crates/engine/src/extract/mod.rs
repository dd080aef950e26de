//! Best-effort text extraction from uploaded bytes.
//!
//! Every format has a fixed policy. PDFs go through an ordered chain of
//! stages; the first stage whose output is non-blank after trimming wins.
//! Nothing here returns an error to the caller: a document with no usable
//! text simply yields an empty string.

pub mod docx;
pub mod ocr;
pub mod pdf;

use docsim_core::config::ExtractionConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Format tag driving the extraction policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    /// `.txt`
    PlainText,
    /// `.docx` (paragraph-oriented)
    Docx,
    /// `.pdf`
    Pdf,
    /// Anything else; not extracted
    Other,
}

impl DocumentFormat {
    /// Detect the format from a filename extension (case-insensitive).
    pub fn from_filename(filename: &str) -> Self {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("txt") => Self::PlainText,
            Some("docx") => Self::Docx,
            Some("pdf") => Self::Pdf,
            _ => Self::Other,
        }
    }

    /// Map a declared MIME type, if it names a supported format.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "text/plain" => Some(Self::PlainText),
            "application/pdf" => Some(Self::Pdf),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(Self::Docx)
            }
            _ => None,
        }
    }

    /// Extension first; a recognised declared type fills in for unknown extensions.
    pub fn detect(filename: &str, declared_content_type: Option<&str>) -> Self {
        match Self::from_filename(filename) {
            Self::Other => declared_content_type
                .and_then(Self::from_content_type)
                .unwrap_or(Self::Other),
            format => format,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "text",
            Self::Docx => "docx",
            Self::Pdf => "pdf",
            Self::Other => "other",
        }
    }

    /// MIME type used when the uploader declared none.
    pub fn default_content_type(&self) -> &'static str {
        match self {
            Self::PlainText => "text/plain",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Pdf => "application/pdf",
            Self::Other => "application/octet-stream",
        }
    }
}

/// Result of one extraction stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// Non-blank text
    Text(String),
    /// The stage ran but found only whitespace
    Blank,
    /// The stage could not process the input
    Failed(String),
}

impl StageOutcome {
    /// Classify raw stage output.
    pub fn from_text(text: String) -> Self {
        if text.trim().is_empty() {
            Self::Blank
        } else {
            Self::Text(text)
        }
    }

    /// Classify a fallible stage result.
    pub fn from_result(result: Result<String, String>) -> Self {
        match result {
            Ok(text) => Self::from_text(text),
            Err(e) => Self::Failed(e),
        }
    }
}

/// One strategy in the PDF fallback chain.
pub trait ExtractionStage: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Try to extract text from the whole document.
    fn extract(&self, bytes: &[u8]) -> StageOutcome;
}

/// Format-aware extractor holding the ordered PDF chain.
pub struct TextExtractor {
    pdf_stages: Vec<Box<dyn ExtractionStage>>,
}

impl std::fmt::Debug for TextExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.pdf_stages.iter().map(|s| s.name()).collect();
        f.debug_struct("TextExtractor")
            .field("pdf_stages", &names)
            .finish()
    }
}

impl TextExtractor {
    /// Extractor with the standard PDF chain:
    /// pdf-extract, lopdf text extraction, raw content-stream walk, OCR.
    pub fn new(config: &ExtractionConfig) -> Self {
        let mut stages: Vec<Box<dyn ExtractionStage>> = vec![
            Box::new(pdf::PdfExtractStage),
            Box::new(pdf::LopdfTextStage),
            Box::new(pdf::ContentStreamStage),
        ];

        if config.ocr_enabled {
            stages.push(Box::new(ocr::OcrStage::new(config)));
        }

        Self::with_pdf_stages(stages)
    }

    /// Extractor with a custom PDF chain.
    pub fn with_pdf_stages(pdf_stages: Vec<Box<dyn ExtractionStage>>) -> Self {
        Self { pdf_stages }
    }

    /// Names of the PDF stages, in order.
    pub fn pdf_stage_names(&self) -> Vec<&str> {
        self.pdf_stages.iter().map(|s| s.name()).collect()
    }

    /// Extract text for `format`. Returns an empty string when nothing usable is found.
    pub fn extract(&self, bytes: &[u8], format: DocumentFormat) -> String {
        match format {
            DocumentFormat::PlainText => decode_text_lossy(bytes),
            DocumentFormat::Docx => match docx::extract_docx_text(bytes) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("DOCX extraction failed: {}", e);
                    String::new()
                }
            },
            DocumentFormat::Pdf => self.extract_pdf(bytes),
            DocumentFormat::Other => {
                tracing::debug!("No extractor for this format, storing empty text");
                String::new()
            }
        }
    }

    /// Run the PDF chain, stopping at the first non-blank stage.
    pub fn extract_pdf(&self, bytes: &[u8]) -> String {
        for stage in &self.pdf_stages {
            match stage.extract(bytes) {
                StageOutcome::Text(text) => {
                    tracing::info!(
                        stage = stage.name(),
                        chars = text.chars().count(),
                        "PDF text extracted"
                    );
                    return text;
                }
                StageOutcome::Blank => {
                    tracing::debug!(stage = stage.name(), "PDF stage produced no text");
                }
                StageOutcome::Failed(e) => {
                    tracing::warn!(stage = stage.name(), error = %e, "PDF stage failed");
                }
            }
        }

        tracing::warn!("All PDF extraction stages came up empty");
        String::new()
    }
}

/// Decode bytes as UTF-8, dropping invalid sequences.
pub fn decode_text_lossy(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}
