//! Command-line interface definition for Toolloop
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for one-shot queries, the HTTP entry surface,
//! and tool inspection.

use clap::{Parser, Subcommand};

/// Toolloop - tool-augmented conversational agent
///
/// Answers a natural-language query by letting the model call the
/// registered tools for a bounded number of rounds.
#[derive(Parser, Debug, Clone)]
#[command(name = "toolloop")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Toolloop
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Answer a single query and exit
    Ask {
        /// The natural-language query
        query: String,

        /// Provider credential (overrides config and OPENAI_API_KEY)
        #[arg(long)]
        api_key: Option<String>,

        /// Override the model from config
        #[arg(short, long)]
        model: Option<String>,

        /// Override the round budget from config
        #[arg(long)]
        max_rounds: Option<usize>,

        /// Print a JSON report instead of the bare answer
        #[arg(long)]
        json: bool,
    },

    /// Serve GET/POST `/?chatQuery=...` over HTTP
    Serve {
        /// Address to bind (overrides config)
        #[arg(short, long)]
        addr: Option<String>,
    },

    /// Print the schemas of the registered tools
    Tools,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask() {
        let cli = Cli::parse_from(["toolloop", "ask", "What's the weather?", "--json"]);
        match cli.command {
            Commands::Ask {
                query,
                json,
                api_key,
                ..
            } => {
                assert_eq!(query, "What's the weather?");
                assert!(json);
                assert!(api_key.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(cli.config.as_deref(), Some("config/config.yaml"));
    }

    #[test]
    fn test_parse_serve_with_addr() {
        let cli = Cli::parse_from(["toolloop", "-v", "serve", "--addr", "0.0.0.0:8000"]);
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Serve { addr: Some(ref a) } if a == "0.0.0.0:8000"
        ));
    }

    #[test]
    fn test_ask_requires_query() {
        assert!(Cli::try_parse_from(["toolloop", "ask"]).is_err());
    }
}
