//! Toolloop - tool-augmented conversational agent
//!
#![doc = "Main entry point for the Toolloop application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use toolloop::agent::metrics::init_metrics_exporter;
use toolloop::cli::{Cli, Commands};
use toolloop::commands;
use toolloop::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Ask { query, json, .. } => {
            tracing::info!("Answering one-shot query");
            commands::ask::run_ask(config, query, json).await?;
            Ok(())
        }
        Commands::Serve { .. } => {
            init_metrics_exporter();
            tracing::info!("Starting HTTP server on {}", config.server.addr);
            commands::serve::run_serve(config).await?;
            Ok(())
        }
        Commands::Tools => {
            commands::tools::list_tools(config)?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so `ask --json` and `tools` keep stdout machine-readable.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "toolloop=debug"
    } else {
        "toolloop=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
