//! Provider module for Toolloop
//!
//! This module contains the model provider abstraction, the per-round
//! verdict classification, and the OpenAI-compatible implementation.

pub mod base;
pub mod openai;

pub use base::{
    CompletionResponse, FinishReason, FunctionCall, Message, ModelTurn, Provider, Role,
    TokenUsage, ToolCall, ToolInvocationRequest, Verdict,
};
pub use openai::OpenAiProvider;

use crate::config::Config;
use crate::error::{Result, ToolloopError};
use std::time::Duration;

/// Create a provider instance bound to a credential
///
/// # Arguments
///
/// * `config` - Full configuration; `provider.type` selects the implementation
/// * `credential` - Credential for this invocation, falling back to
///   `provider.openai.api_key` when `None`
///
/// # Errors
///
/// Returns error if the provider type is unknown or no credential is available
pub fn create_provider(config: &Config, credential: Option<&str>) -> Result<Box<dyn Provider>> {
    match config.provider.provider_type.as_str() {
        "openai" => {
            let api_key = credential
                .map(str::to_string)
                .or_else(|| config.provider.openai.api_key.clone())
                .ok_or_else(|| ToolloopError::MissingCredentials("openai".to_string()))?;

            Ok(Box::new(OpenAiProvider::new(
                config.provider.openai.clone(),
                api_key,
                Duration::from_secs(config.agent.model_timeout_seconds),
            )?))
        }
        other => Err(ToolloopError::Provider(format!("Unknown provider type: {}", other)).into()),
    }
}
