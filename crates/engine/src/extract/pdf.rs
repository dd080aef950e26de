//! Direct-text PDF stages.
//!
//! Three independent parsers, tried in this order by the extractor:
//! 1. `pdf-extract` (best font-encoding handling)
//! 2. `lopdf`'s own text extraction
//! 3. A raw walk over page content-stream text operators, which tolerates
//!    malformed fonts at the cost of accuracy

use super::{ExtractionStage, StageOutcome};
use lopdf::{Document, Object};

/// Stage 1: `pdf-extract`, page by page.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractStage;

impl ExtractionStage for PdfExtractStage {
    fn name(&self) -> &str {
        "pdf-extract"
    }

    fn extract(&self, bytes: &[u8]) -> StageOutcome {
        // pdf-extract panics on some malformed inputs
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(bytes)
        }));

        match result {
            Ok(Ok(pages)) => StageOutcome::from_text(pages.join("\n")),
            Ok(Err(e)) => StageOutcome::Failed(e.to_string()),
            Err(payload) => StageOutcome::Failed(format!("panicked: {}", panic_message(&payload))),
        }
    }
}

/// Stage 2: `lopdf` text extraction across all pages.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfTextStage;

impl ExtractionStage for LopdfTextStage {
    fn name(&self) -> &str {
        "lopdf"
    }

    fn extract(&self, bytes: &[u8]) -> StageOutcome {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let doc = Document::load_mem(bytes).map_err(|e| format!("Failed to load PDF: {}", e))?;
            let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
            if pages.is_empty() {
                return Ok(String::new());
            }
            doc.extract_text(&pages)
                .map_err(|e| format!("Text extraction failed: {}", e))
        }));

        match result {
            Ok(result) => StageOutcome::from_result(result),
            Err(payload) => StageOutcome::Failed(format!("panicked: {}", panic_message(&payload))),
        }
    }
}

/// Stage 3: walk `Tj`/`TJ` operators of every page content stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentStreamStage;

impl ExtractionStage for ContentStreamStage {
    fn name(&self) -> &str {
        "content-stream"
    }

    fn extract(&self, bytes: &[u8]) -> StageOutcome {
        StageOutcome::from_result(extract_text_operators(bytes))
    }
}

/// Collect the string operands of text-showing operators, page by page.
pub fn extract_text_operators(bytes: &[u8]) -> Result<String, String> {
    let doc = Document::load_mem(bytes).map_err(|e| format!("Failed to load PDF: {}", e))?;

    let mut all_text = String::new();

    for (_page_num, page_id) in doc.get_pages() {
        let content = match doc.get_page_content(page_id) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!("Skipping unreadable page content: {}", e);
                continue;
            }
        };

        let operations = lopdf::content::Content::decode(&content)
            .map(|c| c.operations)
            .unwrap_or_default();

        for op in operations {
            match op.operator.as_str() {
                "Tj" | "'" | "\"" => {
                    if let Some(Object::String(bytes, _)) = op.operands.last() {
                        all_text.push_str(&decode_pdf_string(bytes));
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = op.operands.first() {
                        for item in items {
                            if let Object::String(bytes, _) = item {
                                all_text.push_str(&decode_pdf_string(bytes));
                            }
                        }
                    }
                }
                // Text positioning: treat as a word break
                "Td" | "TD" | "T*" => {
                    if !all_text.ends_with('\n') && !all_text.ends_with(' ') {
                        all_text.push(' ');
                    }
                }
                "ET" => {
                    if !all_text.ends_with('\n') {
                        all_text.push('\n');
                    }
                }
                _ => {}
            }
        }

        if !all_text.ends_with('\n') {
            all_text.push('\n');
        }
    }

    Ok(all_text)
}

/// Decode a PDF string operand: UTF-16BE with BOM, UTF-8, else Latin-1.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
