//! OCR stage: rasterize pages with `pdftoppm`, recognise them with `tesseract`.
//!
//! Both tools are external executables. When either is missing the stage
//! reports failure and the chain ends with empty text.

use super::{ExtractionStage, StageOutcome};
use docsim_core::config::ExtractionConfig;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Last-resort stage for scanned PDFs.
#[derive(Debug, Clone)]
pub struct OcrStage {
    pdftoppm_bin: String,
    tesseract_bin: String,
    dpi: u32,
    language: Option<String>,
}

impl OcrStage {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            pdftoppm_bin: config.pdftoppm_bin.clone(),
            tesseract_bin: config.tesseract_bin.clone(),
            dpi: config.ocr_dpi,
            language: config.ocr_language.clone(),
        }
    }

    fn run(&self, bytes: &[u8]) -> Result<String, String> {
        let workdir = TempDir::new().map_err(|e| format!("Failed to create OCR workdir: {}", e))?;
        let pdf_path = workdir.path().join("input.pdf");
        std::fs::write(&pdf_path, bytes).map_err(|e| format!("Failed to stage PDF: {}", e))?;

        let prefix = workdir.path().join("page");
        let output = Command::new(&self.pdftoppm_bin)
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-png")
            .arg(&pdf_path)
            .arg(&prefix)
            .output()
            .map_err(|e| format!("Failed to run {}: {}", self.pdftoppm_bin, e))?;

        if !output.status.success() {
            return Err(format!(
                "{} exited with {}: {}",
                self.pdftoppm_bin,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let pages = rendered_pages(workdir.path())?;
        tracing::debug!("Rasterized {} page(s) for OCR", pages.len());

        let mut text = String::new();
        for page in &pages {
            let page_text = self.recognise(page)?;
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(page_text.trim_end());
        }

        Ok(text)
    }

    fn recognise(&self, image: &Path) -> Result<String, String> {
        let mut cmd = Command::new(&self.tesseract_bin);
        cmd.arg(image).arg("stdout");
        if let Some(lang) = &self.language {
            cmd.arg("-l").arg(lang);
        }

        let output = cmd
            .output()
            .map_err(|e| format!("Failed to run {}: {}", self.tesseract_bin, e))?;

        if !output.status.success() {
            return Err(format!(
                "{} exited with {} on {:?}",
                self.tesseract_bin,
                output.status,
                image.file_name().unwrap_or_default()
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl ExtractionStage for OcrStage {
    fn name(&self) -> &str {
        "ocr"
    }

    fn extract(&self, bytes: &[u8]) -> StageOutcome {
        StageOutcome::from_result(self.run(bytes))
    }
}

/// PNGs written by pdftoppm, in page order.
fn rendered_pages(dir: &Path) -> Result<Vec<PathBuf>, String> {
    let mut pages: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| format!("Failed to list OCR workdir: {}", e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "png"))
        .collect();

    // pdftoppm zero-pads page numbers to a common width, so lexical order is page order
    pages.sort();
    Ok(pages)
}
