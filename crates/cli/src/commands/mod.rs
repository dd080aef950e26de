//! Command handlers for the docsim CLI.

pub mod ingest;
pub mod rebuild;
pub mod search;
pub mod show;
pub mod stats;

pub use ingest::IngestCommand;
pub use rebuild::RebuildCommand;
pub use search::SearchCommand;
pub use show::ShowCommand;
pub use stats::StatsCommand;
