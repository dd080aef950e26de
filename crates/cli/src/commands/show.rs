//! Show command handler.

use clap::Args;
use docsim_core::{config::AppConfig, AppError, AppResult};
use docsim_engine::Pipeline;

/// Show one stored document
#[derive(Args, Debug)]
pub struct ShowCommand {
    /// Document name as stored
    pub source: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ShowCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let pipeline = Pipeline::from_config(config)?;
        let record = pipeline
            .store
            .get(&self.source)?
            .ok_or_else(|| AppError::Other(format!("No document named '{}'", self.source)))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&record)?);
        } else {
            println!("Source: {}", record.source);
            println!("Content type: {}", record.content_type);
            println!("Size: {} bytes", record.size);
            println!("Text ({} chars):", record.text.chars().count());
            println!("{}", record.text);
        }

        Ok(())
    }
}
