//! Entry adapter
//!
//! Turns an inbound query plus credential into one agent-loop invocation.
//! The tool registry is built once; each request gets its own provider
//! binding and a fresh conversation.

use std::sync::Arc;
use std::time::Duration;

use crate::agent::{Agent, AgentOutcome, LoopResult};
use crate::config::Config;
use crate::error::{Result, ToolloopError};
use crate::providers::create_provider;
use crate::tools::{build_default_registry, ToolRegistry};

/// One inbound query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// Natural-language query from the user
    pub query: String,
    /// Provider credential for this request, if the caller supplied one
    pub credential: Option<String>,
}

impl QueryRequest {
    /// Create a request that uses the configured credential
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            credential: None,
        }
    }

    /// Attach a per-request credential
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }
}

/// Long-lived entry point shared by the CLI and the HTTP server
#[derive(Clone)]
pub struct Entry {
    config: Arc<Config>,
    tools: Arc<ToolRegistry>,
}

impl Entry {
    /// Create an entry with the built-in tools
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or the default registry
    /// cannot be built
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let timeout = Duration::from_secs(config.agent.tool_timeout_seconds);
        let tools = build_default_registry(&config.tools, timeout)?;
        Ok(Self::with_registry(config, Arc::new(tools)))
    }

    /// Create an entry with a caller-supplied registry
    pub fn with_registry(config: Config, tools: Arc<ToolRegistry>) -> Self {
        Self {
            config: Arc::new(config),
            tools,
        }
    }

    /// The shared tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run one invocation for the request
    ///
    /// # Errors
    ///
    /// - `ToolloopError::InvalidRequest` for an empty query
    /// - `ToolloopError::MissingCredentials` when neither the request nor the
    ///   configuration carries a credential
    /// - Any error from [`Agent::run`]
    pub async fn handle(&self, request: QueryRequest) -> Result<AgentOutcome> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(ToolloopError::InvalidRequest("query cannot be empty".to_string()).into());
        }

        let credential = request
            .credential
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());

        tracing::debug!(
            query_len = query.len(),
            request_credential = credential.is_some(),
            "Handling query"
        );

        let provider = create_provider(&self.config, credential)?;
        let agent = Agent::new_boxed(provider, self.tools.clone(), self.config.agent.clone())?;
        agent.ask(query).await
    }
}

/// Answer one query with the built-in tools
///
/// # Errors
///
/// See [`Entry::handle`]
pub async fn handle_query(config: &Config, request: QueryRequest) -> Result<LoopResult> {
    let entry = Entry::new(config.clone())?;
    Ok(entry.handle(request).await?.result)
}
