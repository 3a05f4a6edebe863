//! Civic CLI binary.
//!
//! This binary provides command-line access to Civic's functionality:
//! - Answer questions from a local document set
//! - Inspect usage, cache and fallback state
//! - Show the effective configuration

use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use civic::GovernanceConfig;
    use cli::{Cli, Commands, run_ask, show_config, show_status};

    // Pick up OPENAI_API_KEY and CIVIC_* overrides from .env
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    civic::init_tracing(cli.verbose, cli.json_logs).map_err(|e| e.to_string())?;

    let config = match &cli.config {
        Some(path) => GovernanceConfig::from_file(path)?,
        None => GovernanceConfig::load()?,
    };

    match cli.command {
        Commands::Ask {
            question,
            documents,
            top_k,
            filters,
        } => {
            run_ask(config, &question, &documents, top_k, filters).await?;
        }

        Commands::Status => {
            show_status(config)?;
        }

        Commands::Config => {
            show_config(&config)?;
        }
    }

    Ok(())
}
