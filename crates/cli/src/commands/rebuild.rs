//! Rebuild command handler.

use clap::Args;
use docsim_core::{config::AppConfig, AppResult};
use docsim_engine::Pipeline;

/// Rebuild the index from the stored documents
#[derive(Args, Debug)]
pub struct RebuildCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl RebuildCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing rebuild command");

        let pipeline = Pipeline::from_config(config)?;
        let outcome = pipeline.builder.run().await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        } else {
            println!("{}", outcome.summary());
        }

        Ok(())
    }
}
