/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes three top-level command modules:

- `ask`: Answer one query and print the result
- `serve`: Run the HTTP entry surface
- `tools`: Print the registered tool schemas
*/

use crate::config::Config;
use crate::entry::{Entry, QueryRequest};
use crate::error::Result;

// One-shot query handler
pub mod ask {
    //! One-shot query handler.
    //!
    //! Builds an [`Entry`] with the built-in tools, answers the query, and
    //! prints either the colored answer or a JSON report.

    use super::*;
    use chrono::{DateTime, Utc};
    use colored::Colorize;
    use serde::Serialize;

    /// Machine-readable result of `toolloop ask --json`
    #[derive(Debug, Clone, Serialize)]
    pub struct AskReport {
        /// Final answer or the exhaustion message
        pub answer: String,
        /// Whether the round budget ran out
        pub exhausted: bool,
        /// Model calls performed
        pub rounds: usize,
        /// When the invocation finished
        pub completed_at: DateTime<Utc>,
    }

    /// Answer a single query
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `query` - The user's query
    /// * `json` - Print an [`AskReport`] instead of the bare answer
    ///
    /// # Errors
    ///
    /// Returns error if the invocation fails
    pub async fn run_ask(config: Config, query: String, json: bool) -> Result<()> {
        let entry = Entry::new(config)?;
        let outcome = entry.handle(QueryRequest::new(query)).await?;

        let report = AskReport {
            exhausted: outcome.result.is_exhausted(),
            rounds: outcome.rounds,
            answer: outcome.result.into_text(),
            completed_at: Utc::now(),
        };

        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else if report.exhausted {
            println!("{}", report.answer.yellow());
        } else {
            println!("{}", report.answer.green());
        }

        Ok(())
    }
}

// HTTP server handler
pub mod serve {
    //! Starts the HTTP entry surface.

    use super::*;

    /// Serve until the process is terminated
    ///
    /// # Errors
    ///
    /// Returns error if the server cannot start
    pub async fn run_serve(config: Config) -> Result<()> {
        if config.provider.openai.api_key.is_none() {
            tracing::warn!(
                "No provider credential configured; requests must send Authorization: Bearer"
            );
        }
        crate::server::serve(config).await
    }
}

// Tool listing handler
pub mod tools {
    //! Prints the schemas the model is offered. Makes no network calls.

    use super::*;

    /// Print every registered tool schema as pretty JSON
    ///
    /// # Errors
    ///
    /// Returns error if the registry cannot be built
    pub fn list_tools(config: Config) -> Result<()> {
        let entry = Entry::new(config)?;
        let schemas = serde_json::Value::Array(entry.tools().schemas());
        println!("{}", serde_json::to_string_pretty(&schemas)?);
        Ok(())
    }
}
