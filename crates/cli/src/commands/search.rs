//! Search command handler.

use clap::Args;
use docsim_core::{config::AppConfig, AppResult};
use docsim_engine::{Pipeline, VectorSearchEngine};

/// Find the documents most similar to a query
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Query text
    pub query: String,

    /// Number of results to return
    #[arg(short = 'k', long, default_value = "5")]
    pub top_k: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing search command (top_k = {})", self.top_k);

        let pipeline = Pipeline::from_config(config)?;
        let engine = VectorSearchEngine::open(pipeline.layout.clone(), pipeline.generator.clone())?;
        let hits = engine.search(&self.query, self.top_k).await?;

        tracing::debug!("Search returned {} hit(s)", hits.len());

        if self.json {
            println!("{}", serde_json::to_string_pretty(&hits)?);
        } else if hits.is_empty() {
            println!("No results found.");
        } else {
            for (rank, hit) in hits.iter().enumerate() {
                println!("{}. {} ({:.4})", rank + 1, hit.document_name, hit.similarity);
            }
        }

        Ok(())
    }
}
