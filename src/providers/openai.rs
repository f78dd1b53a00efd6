//! OpenAI-compatible provider implementation for Toolloop
//!
//! Talks to any `/chat/completions` endpoint speaking the OpenAI tool-calling
//! wire format. One `complete` call is exactly one HTTP exchange; there is no
//! retry and no streaming.

use crate::config::OpenAiConfig;
use crate::error::{Result, ToolloopError};
use crate::providers::{
    CompletionResponse, FinishReason, FunctionCall, Message, Provider, Role, TokenUsage, ToolCall,
};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OpenAI chat completions provider
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use toolloop::config::OpenAiConfig;
/// use toolloop::providers::{Message, OpenAiProvider, Provider};
///
/// # async fn example() -> toolloop::error::Result<()> {
/// let provider = OpenAiProvider::new(
///     OpenAiConfig::default(),
///     "sk-...".to_string(),
///     Duration::from_secs(60),
/// )?;
/// let completion = provider.complete(&[Message::user("Hi")], &[]).await?;
/// # Ok(())
/// # }
/// ```
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
    api_key: String,
}

/// Request structure for the chat completions API
#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [serde_json::Value],
}

fn no_tools(tools: &&[serde_json::Value]) -> bool {
    tools.is_empty()
}

/// Message structure for the chat completions API
#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: Role,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

/// Tool call in OpenAI format
#[derive(Debug, Serialize, Deserialize)]
struct OpenAiToolCall {
    id: String,
    #[serde(default = "default_tool_type")]
    r#type: String,
    function: OpenAiFunctionCall,
}

/// Function call details in OpenAI format
#[derive(Debug, Serialize, Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

fn default_tool_type() -> String {
    "function".to_string()
}

/// Response structure from the chat completions API
#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

/// Choice in a chat completions response
#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

/// Token usage information
#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

impl OpenAiProvider {
    /// Create a new provider bound to a credential
    ///
    /// # Arguments
    ///
    /// * `config` - Model and endpoint settings
    /// * `api_key` - Bearer credential sent with every request
    /// * `timeout` - Per-request HTTP timeout
    ///
    /// # Errors
    ///
    /// Returns `ToolloopError::MissingCredentials` for an empty key and
    /// `ToolloopError::Provider` if the HTTP client cannot be built
    pub fn new(config: OpenAiConfig, api_key: String, timeout: Duration) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(ToolloopError::MissingCredentials("openai".to_string()).into());
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("toolloop/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ToolloopError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized OpenAI provider: api_base={}, model={}",
            config.api_base,
            config.model
        );

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'))
    }

    /// Convert Toolloop messages to the wire format
    fn convert_messages(messages: &[Message]) -> Vec<OpenAiMessage> {
        messages
            .iter()
            .map(|m| OpenAiMessage {
                role: m.role,
                content: m.content.clone(),
                tool_calls: m.tool_calls.as_ref().map(|calls| {
                    calls
                        .iter()
                        .map(|tc| OpenAiToolCall {
                            id: tc.id.clone(),
                            r#type: default_tool_type(),
                            function: OpenAiFunctionCall {
                                name: tc.function.name.clone(),
                                arguments: tc.function.arguments.clone(),
                            },
                        })
                        .collect()
                }),
                tool_call_id: m.tool_call_id.clone(),
            })
            .collect()
    }

    /// Convert a wire message back to Toolloop format
    fn convert_response_message(message: OpenAiMessage) -> Message {
        match message.tool_calls {
            Some(calls) if !calls.is_empty() => Message::assistant_with_tools(
                message.content,
                calls
                    .into_iter()
                    .map(|tc| ToolCall {
                        id: tc.id,
                        function: FunctionCall {
                            name: tc.function.name,
                            arguments: tc.function.arguments,
                        },
                    })
                    .collect(),
            ),
            _ => Message::assistant(message.content.unwrap_or_default()),
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[serde_json::Value],
    ) -> Result<CompletionResponse> {
        let request = OpenAiRequest {
            model: &self.config.model,
            messages: Self::convert_messages(messages),
            tools,
        };

        tracing::debug!(
            "Sending OpenAI request: {} messages, {} tools",
            request.messages.len(),
            tools.len()
        );

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("OpenAI request failed: {}", e);
                ToolloopError::Provider(format!("OpenAI request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("OpenAI returned error {}: {}", status, error_text);
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    ToolloopError::Authentication(format!("{}: {}", status, error_text))
                }
                _ => ToolloopError::Provider(format!(
                    "OpenAI returned error {}: {}",
                    status, error_text
                )),
            }
            .into());
        }

        let openai_response: OpenAiResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse OpenAI response: {}", e);
            ToolloopError::Provider(format!("Failed to parse OpenAI response: {}", e))
        })?;

        let choice = openai_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ToolloopError::Provider("No choices in OpenAI response".to_string()))?;

        let finish_reason = FinishReason::parse(choice.finish_reason.as_deref().unwrap_or("none"));
        tracing::debug!("OpenAI response received: finish_reason={}", finish_reason);

        let mut completion =
            CompletionResponse::new(Self::convert_response_message(choice.message), finish_reason);
        if let Some(usage) = openai_response.usage {
            completion = completion.with_usage(TokenUsage::new(
                usage.prompt_tokens,
                usage.completion_tokens,
            ));
        }

        Ok(completion)
    }

    fn current_model(&self) -> Option<String> {
        Some(self.config.model.clone())
    }
}
