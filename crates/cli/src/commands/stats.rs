//! Stats command handler.
//!
//! Handles data directory statistics display.

use clap::Args;
use docsim_core::{config::AppConfig, AppResult};
use docsim_engine::{collect_stats, Pipeline};

/// Show data directory statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let pipeline = Pipeline::from_config(config)?;
        let stats = collect_stats(&pipeline.layout)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("Data directory: {}", config.data_dir().display());
            println!("  Documents: {}", stats.records);
            match (stats.indexed_vectors, stats.dimensions) {
                (Some(vectors), Some(dimensions)) => {
                    println!("  Indexed vectors: {} x {} dims", vectors, dimensions)
                }
                _ => println!("  Indexed vectors: (no index)"),
            }
            if let Some(model) = &stats.model {
                println!("  Model: {}", model);
            }
            println!("  Metadata size: {} bytes", stats.metadata_bytes);
            println!("  Index size: {} bytes", stats.index_bytes);
        }

        Ok(())
    }
}
