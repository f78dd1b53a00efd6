//! Toolloop - tool-augmented conversational agent library
//!
//! This library answers a natural-language query by driving a chat-completion
//! model through a bounded number of rounds. In each round the model either
//! gives its final answer or asks for one registered tool to be called; the
//! tool's result is fed back and the loop continues.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `agent`: Per-invocation conversation, the bounded loop, and loop metrics
//! - `providers`: Model provider abstraction, verdict classification, OpenAI client
//! - `tools`: Typed tool registry and the built-in location and weather tools
//! - `entry`: Query-plus-credential to loop invocation
//! - `server`: HTTP surface (`GET`/`POST /?chatQuery=...`)
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use toolloop::{handle_query, Config, QueryRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     config.validate()?;
//!
//!     let request = QueryRequest::new("What's the weather where I am?").with_credential("sk-...");
//!     let result = handle_query(&config, request).await?;
//!     println!("{}", result.text());
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod commands;
pub mod config;
pub mod entry;
pub mod error;
pub mod providers;
pub mod server;
pub mod tools;

// Re-export commonly used types
pub use agent::{Agent, AgentOutcome, Conversation, LoopResult, EXHAUSTED_MESSAGE};
pub use config::Config;
pub use entry::{handle_query, Entry, QueryRequest};
pub use error::{Result, ToolloopError};
pub use tools::{ToolRegistry, ToolSpec};
