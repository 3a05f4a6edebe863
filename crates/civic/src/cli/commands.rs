//! CLI command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Civic - governed answers about municipal services
#[derive(Parser, Debug)]
#[command(name = "civic")]
#[command(about = "Governed retrieval-augmented answers about municipal services", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Configuration file replacing the layered search
    #[arg(long, global = true, env = "CIVIC_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a question from a JSON file of documents
    Ask {
        /// The question to answer
        question: String,

        /// JSON array of documents (`text`, `metadata`)
        #[arg(long)]
        documents: PathBuf,

        /// Number of documents to retrieve
        #[arg(long, default_value = "5")]
        top_k: usize,

        /// Metadata filter as `key=value`, repeatable
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,
    },

    /// Print usage, cache and fallback state as JSON
    Status,

    /// Print the effective configuration as TOML
    Config,
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask() {
        let cli = Cli::try_parse_from([
            "civic",
            "ask",
            "How do I apply?",
            "--documents",
            "docs.json",
            "--filter",
            "service=snap",
            "--json-logs",
        ])
        .unwrap();
        assert!(cli.json_logs);
        match cli.command {
            Commands::Ask {
                question,
                top_k,
                filters,
                ..
            } => {
                assert_eq!(question, "How do I apply?");
                assert_eq!(top_k, 5);
                assert_eq!(filters, vec![("service".to_string(), "snap".to_string())]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_bad_filter_rejected() {
        assert!(parse_filter("service").is_err());
        assert!(parse_filter("=snap").is_err());
    }
}
