//! Ingest command handler.
//!
//! Walks the given paths, ingests every file into the metadata store, and
//! runs a single rebuild once all of them are stored.

use clap::Args;
use docsim_core::{config::AppConfig, AppError, AppResult};
use docsim_engine::{IngestOptions, Pipeline, RebuildStatus};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Ingest files or directories
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Files or directories to ingest
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Content type to declare for every file
    #[arg(long)]
    pub content_type: Option<String>,

    /// Replace documents that are already stored under the same name
    #[arg(long)]
    pub overwrite: bool,

    /// Store the documents without rebuilding the index
    #[arg(long)]
    pub no_rebuild: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// A file to ingest and the name it is stored under.
#[derive(Debug, PartialEq)]
struct Upload {
    path: PathBuf,
    source: String,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command for {} path(s)", self.paths.len());

        let pipeline = Pipeline::from_config(config)?;
        let uploads = collect_uploads(&self.paths)?;
        let options = IngestOptions {
            overwrite: self.overwrite,
            trigger_rebuild: false,
        };

        let mut ingested = Vec::new();
        let mut failed = Vec::new();
        for upload in uploads {
            let bytes = tokio::fs::read(&upload.path).await?;
            match pipeline
                .ingestor
                .ingest(&upload.source, bytes, self.content_type.as_deref(), &options)
                .await
            {
                Ok(receipt) => ingested.push(receipt),
                Err(e) => {
                    tracing::warn!(source = %upload.source, error = %e, "Ingest failed");
                    failed.push((upload.source, e.to_string()));
                }
            }
        }

        let rebuild = if self.no_rebuild || ingested.is_empty() {
            None
        } else {
            Some(pipeline.queue.submit().wait().await)
        };

        if self.json {
            let output = serde_json::json!({
                "ingested": ingested.iter().map(|r| serde_json::json!({
                    "source": r.source,
                    "format": r.format,
                    "contentType": r.content_type,
                    "size": r.size,
                    "textChars": r.text_chars,
                })).collect::<Vec<_>>(),
                "failed": failed.iter().map(|(source, error)| serde_json::json!({
                    "source": source,
                    "error": error,
                })).collect::<Vec<_>>(),
                "rebuild": rebuild,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            for receipt in &ingested {
                println!(
                    "Ingested {} ({}, {} bytes, {} chars)",
                    receipt.source,
                    receipt.format.as_str(),
                    receipt.size,
                    receipt.text_chars
                );
            }
            for (source, error) in &failed {
                println!("Failed {}: {}", source, error);
            }
            match &rebuild {
                Some(RebuildStatus::Finished { outcome }) => println!("{}", outcome.summary()),
                Some(RebuildStatus::Failed { error }) => println!("Rebuild failed: {}", error),
                Some(_) | None => {}
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(AppError::Other(format!(
                "{} of {} file(s) failed to ingest",
                failed.len(),
                failed.len() + ingested.len()
            )))
        }
    }
}

/// Expand `paths` into files, naming each by its basename, or by its path
/// relative to the directory argument it was found under.
fn collect_uploads(paths: &[PathBuf]) -> AppResult<Vec<Upload>> {
    let mut uploads = Vec::new();

    for path in paths {
        if path.is_dir() {
            let mut found = Vec::new();
            for entry in WalkDir::new(path).follow_links(true) {
                let entry = entry.map_err(|e| {
                    AppError::Other(format!("Failed to walk {}: {}", path.display(), e))
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let relative = entry.path().strip_prefix(path).unwrap_or(entry.path());
                found.push(Upload {
                    source: source_name(relative),
                    path: entry.path().to_path_buf(),
                });
            }
            found.sort_by(|a, b| a.source.cmp(&b.source));
            uploads.extend(found);
        } else if path.is_file() {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| AppError::Other(format!("Not a file: {}", path.display())))?;
            uploads.push(Upload {
                path: path.clone(),
                source: name,
            });
        } else {
            return Err(AppError::Other(format!("Path not found: {}", path.display())));
        }
    }

    Ok(uploads)
}

fn source_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
