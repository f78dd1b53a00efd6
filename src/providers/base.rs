//! Base provider trait and common types for Toolloop
//!
//! This module defines the Provider trait that model providers implement,
//! the message types exchanged with them, and the classification of a raw
//! completion into a single per-round [`Verdict`].

use crate::error::{Result, ToolloopError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Fixed instructions placed at the head of the conversation
    System,
    /// The end user's query
    User,
    /// Model output, either a final answer or a tool-call request
    Assistant,
    /// Serialized return value of a tool call
    Tool,
}

/// Message structure for conversation
///
/// Represents a message in the conversation with the model provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,
    /// Content of the message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tool calls requested by the assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Tool call ID (for tool result messages)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use toolloop::providers::{Message, Role};
    ///
    /// let msg = Message::user("What's the weather where I am?");
    /// assert_eq!(msg.role, Role::User);
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Creates a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Creates a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Creates a new tool result message
    ///
    /// # Examples
    ///
    /// ```
    /// use toolloop::providers::{Message, Role};
    ///
    /// let msg = Message::tool_result("call_123", r#"{"lat":37.7}"#);
    /// assert_eq!(msg.role, Role::Tool);
    /// assert_eq!(msg.tool_call_id, Some("call_123".to_string()));
    /// ```
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Creates an assistant message with tool calls
    pub fn assistant_with_tools(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        }
    }
}

/// Function call information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Name of the function/tool to call
    pub name: String,
    /// Arguments for the function (as JSON string)
    pub arguments: String,
}

/// Tool call structure
///
/// Represents a request from the model to execute a tool with specific arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,
    /// Function call details
    pub function: FunctionCall,
}

impl ToolCall {
    /// Convenience constructor used by providers and tests
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// Token usage information from a completion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of tokens in the prompt
    pub prompt_tokens: usize,
    /// Number of tokens in the completion
    pub completion_tokens: usize,
    /// Total tokens used (prompt + completion)
    pub total_tokens: usize,
}

impl TokenUsage {
    /// Create a new TokenUsage instance
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Why the model stopped generating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    /// The model wants one or more tools invoked
    ToolCalls,
    /// The model produced its final answer
    Stop,
    /// Anything else (`length`, `content_filter`, `function_call`, ...)
    Other(String),
}

impl FinishReason {
    /// Parse the wire representation of a finish reason
    ///
    /// # Examples
    ///
    /// ```
    /// use toolloop::providers::FinishReason;
    ///
    /// assert_eq!(FinishReason::parse("tool_calls"), FinishReason::ToolCalls);
    /// assert_eq!(FinishReason::parse("stop"), FinishReason::Stop);
    /// assert_eq!(FinishReason::parse("length"), FinishReason::Other("length".into()));
    /// ```
    pub fn parse(raw: &str) -> Self {
        match raw {
            "tool_calls" => Self::ToolCalls,
            "stop" => Self::Stop,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ToolCalls => write!(f, "tool_calls"),
            Self::Stop => write!(f, "stop"),
            Self::Other(raw) => write!(f, "{}", raw),
        }
    }
}

/// A tool invocation extracted from the model's reply
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocationRequest {
    /// Provider-assigned call id, echoed back on the tool result
    pub call_id: String,
    /// Name of the requested tool
    pub tool_name: String,
    /// Named arguments as supplied by the model
    pub arguments: Map<String, Value>,
}

/// The model's decision for one round
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Final answer; the loop stops
    Stop(String),
    /// Run a tool and feed the result back
    Invoke(ToolInvocationRequest),
}

/// A classified model reply: the message to record plus the verdict
#[derive(Debug, Clone)]
pub struct ModelTurn {
    /// Assistant message to append to the conversation
    pub message: Message,
    /// What the loop should do next
    pub verdict: Verdict,
    /// Tool calls present in the reply beyond the first, which are not acted on
    pub dropped_tool_calls: usize,
}

/// Completion response with message, finish reason and optional token usage
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// The response message from the model
    pub message: Message,
    /// Why generation ended
    pub finish_reason: FinishReason,
    /// Optional token usage information
    pub usage: Option<TokenUsage>,
}

impl CompletionResponse {
    /// Create a new CompletionResponse
    pub fn new(message: Message, finish_reason: FinishReason) -> Self {
        Self {
            message,
            finish_reason,
            usage: None,
        }
    }

    /// Shorthand for a `stop` completion with the given text
    pub fn stop(text: impl Into<String>) -> Self {
        Self::new(Message::assistant(text), FinishReason::Stop)
    }

    /// Shorthand for a `tool_calls` completion
    pub fn tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self::new(
            Message::assistant_with_tools(None, tool_calls),
            FinishReason::ToolCalls,
        )
    }

    /// Attach token usage
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Classify this completion into exactly one verdict
    ///
    /// Only the first requested tool call is acted on. The recorded assistant
    /// message keeps only that call so every recorded call gets a result.
    ///
    /// # Errors
    ///
    /// - `ToolloopError::UnsupportedFinishReason` for any reason other than
    ///   `tool_calls` or `stop`
    /// - `ToolloopError::Provider` when a `tool_calls` reply carries no calls
    ///   or its arguments are not a JSON object
    pub fn into_turn(self) -> Result<ModelTurn> {
        match self.finish_reason {
            FinishReason::ToolCalls => {
                let mut message = self.message;
                let mut calls = message.tool_calls.take().unwrap_or_default();
                if calls.is_empty() {
                    return Err(ToolloopError::Provider(
                        "finish_reason was tool_calls but no tool calls were returned".to_string(),
                    )
                    .into());
                }

                let dropped_tool_calls = calls.len() - 1;
                if dropped_tool_calls > 0 {
                    let ignored: Vec<&str> = calls[1..]
                        .iter()
                        .map(|c| c.function.name.as_str())
                        .collect();
                    tracing::warn!(
                        ?ignored,
                        "Model requested {} tool calls; only the first is executed",
                        calls.len()
                    );
                    calls.truncate(1);
                }

                let call = calls[0].clone();
                let arguments = parse_arguments(&call.function.name, &call.function.arguments)?;
                message.role = Role::Assistant;
                message.tool_calls = Some(calls);

                Ok(ModelTurn {
                    message,
                    verdict: Verdict::Invoke(ToolInvocationRequest {
                        call_id: call.id,
                        tool_name: call.function.name,
                        arguments,
                    }),
                    dropped_tool_calls,
                })
            }
            FinishReason::Stop => {
                let text = self.message.content.unwrap_or_default();
                Ok(ModelTurn {
                    message: Message::assistant(text.clone()),
                    verdict: Verdict::Stop(text),
                    dropped_tool_calls: 0,
                })
            }
            FinishReason::Other(reason) => {
                Err(ToolloopError::UnsupportedFinishReason(reason).into())
            }
        }
    }
}

/// Parse a tool call's JSON-encoded argument string into a named map
fn parse_arguments(tool_name: &str, raw: &str) -> Result<Map<String, Value>> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }

    let value: Value = serde_json::from_str(raw).map_err(|e| {
        ToolloopError::Provider(format!(
            "Failed to parse arguments for '{}': {}",
            tool_name, e
        ))
    })?;

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(ToolloopError::Provider(format!(
            "Arguments for '{}' must be a JSON object, got {}",
            tool_name, other
        ))
        .into()),
    }
}

/// Provider trait for model providers
///
/// One call is one request/response exchange; implementations do not retry.
///
/// # Examples
///
/// ```no_run
/// use toolloop::providers::{CompletionResponse, Message, Provider};
/// use toolloop::error::Result;
/// use async_trait::async_trait;
///
/// struct EchoProvider;
///
/// #[async_trait]
/// impl Provider for EchoProvider {
///     async fn complete(
///         &self,
///         messages: &[Message],
///         _tools: &[serde_json::Value],
///     ) -> Result<CompletionResponse> {
///         let last = messages.last().and_then(|m| m.content.clone()).unwrap_or_default();
///         Ok(CompletionResponse::stop(last))
///     }
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    /// Completes a conversation with the given messages and available tools
    ///
    /// # Arguments
    ///
    /// * `messages` - Full conversation history
    /// * `tools` - Tool schemas in OpenAI function format
    ///
    /// # Errors
    ///
    /// Returns error if the API call fails or the response is invalid
    async fn complete(&self, messages: &[Message], tools: &[Value]) -> Result<CompletionResponse>;

    /// Name of the model this provider talks to, when known
    fn current_model(&self) -> Option<String> {
        None
    }
}
