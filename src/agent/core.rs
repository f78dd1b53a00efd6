//! Agent core implementation with the bounded tool-calling loop
//!
//! This module implements the agent loop that:
//! - Sends the conversation and tool schemas to the model provider
//! - Executes the one tool call the model requests per round
//! - Feeds tool results back until the model answers or the round budget runs out
//! - Enforces per-call and per-invocation timeouts

use crate::config::AgentConfig;
use crate::error::{classify, Result, ToolloopError};
use crate::providers::{ModelTurn, Provider, Role, ToolInvocationRequest, Verdict};
use crate::tools::ToolRegistry;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use super::metrics::LoopMetrics;
use super::Conversation;

/// Answer returned when the round budget is spent without a final answer
pub const EXHAUSTED_MESSAGE: &str = "The maximum number of iterations has been met without a suitable answer. Please try again with a more specific input.";

/// Loop state between rounds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopState {
    /// About to make the model call for this zero-based round
    Running(usize),
    /// The model produced its final answer
    Stopped(String),
    /// The round budget ran out
    Exhausted,
}

/// How an invocation ended
///
/// Both variants carry user-facing text; exhaustion is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum LoopResult {
    /// Final answer from the model
    Answer(String),
    /// Round budget exhausted
    Exhausted(String),
}

impl LoopResult {
    /// The user-facing text
    pub fn text(&self) -> &str {
        match self {
            Self::Answer(text) | Self::Exhausted(text) => text,
        }
    }

    /// Consume into the user-facing text
    pub fn into_text(self) -> String {
        match self {
            Self::Answer(text) | Self::Exhausted(text) => text,
        }
    }

    /// Whether the round budget ran out
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted(_))
    }
}

/// Result of [`Agent::ask`]
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    /// How the invocation ended
    pub result: LoopResult,
    /// Model calls performed
    pub rounds: usize,
    /// Full history of this invocation
    pub conversation: Conversation,
}

/// The agent that runs the tool-calling loop
///
/// An `Agent` holds no per-invocation state: the provider and registry are
/// shared immutably and every invocation works on its own [`Conversation`],
/// so one agent can serve concurrent requests.
///
/// # Examples
///
/// ```no_run
/// use toolloop::agent::Agent;
/// use toolloop::config::AgentConfig;
/// use toolloop::providers::{CompletionResponse, Message, Provider};
/// use toolloop::tools::ToolRegistry;
/// use async_trait::async_trait;
///
/// struct Canned;
///
/// #[async_trait]
/// impl Provider for Canned {
///     async fn complete(
///         &self,
///         _messages: &[Message],
///         _tools: &[serde_json::Value],
///     ) -> toolloop::error::Result<CompletionResponse> {
///         Ok(CompletionResponse::stop("Hello!"))
///     }
/// }
///
/// # async fn example() -> toolloop::error::Result<()> {
/// let agent = Agent::new(Canned, ToolRegistry::new(), AgentConfig::default())?;
/// let outcome = agent.ask("Hi").await?;
/// assert_eq!(outcome.result.text(), "Hello!");
/// # Ok(())
/// # }
/// ```
pub struct Agent {
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    tool_schemas: Vec<Value>,
    config: AgentConfig,
}

impl Agent {
    /// Creates a new agent instance
    ///
    /// # Errors
    ///
    /// Returns `ToolloopError::Config` if `max_rounds` is zero
    pub fn new(
        provider: impl Provider + 'static,
        tools: ToolRegistry,
        config: AgentConfig,
    ) -> Result<Self> {
        Self::new_shared(Arc::new(provider), Arc::new(tools), config)
    }

    /// Creates a new agent from a boxed provider
    ///
    /// Useful when the provider type is chosen at runtime by
    /// [`crate::providers::create_provider`].
    ///
    /// # Errors
    ///
    /// Returns `ToolloopError::Config` if `max_rounds` is zero
    pub fn new_boxed(
        provider: Box<dyn Provider>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Result<Self> {
        Self::new_shared(Arc::from(provider), tools, config)
    }

    /// Creates a new agent from already-shared parts
    ///
    /// # Errors
    ///
    /// Returns `ToolloopError::Config` if `max_rounds` is zero
    pub fn new_shared(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Result<Self> {
        if config.max_rounds == 0 {
            return Err(
                ToolloopError::Config("max_rounds must be greater than 0".to_string()).into(),
            );
        }

        let tool_schemas = tools.schemas();
        Ok(Self {
            provider,
            tools,
            tool_schemas,
            config,
        })
    }

    /// Answers a query in a fresh `[system, user]` conversation
    ///
    /// # Errors
    ///
    /// See [`Agent::run`]
    pub async fn ask(&self, query: impl Into<String>) -> Result<AgentOutcome> {
        let mut conversation = Conversation::with_system_prompt(self.config.system_prompt.clone());
        conversation.add_user_message(query);

        let result = self.run(&mut conversation).await?;
        let rounds = assistant_messages(&conversation);

        Ok(AgentOutcome {
            result,
            rounds,
            conversation,
        })
    }

    /// Runs the loop over a caller-supplied conversation
    ///
    /// The conversation should end with the user message. Messages are only
    /// ever appended to it.
    ///
    /// # Errors
    ///
    /// - `ToolloopError::Timeout` if a model call, tool call, or the whole
    ///   invocation exceeds its deadline
    /// - `ToolloopError::UnknownTool` if the model names an unregistered tool
    /// - `ToolloopError::ToolExecution` if a tool fails and
    ///   `report_tool_errors` is off
    /// - `ToolloopError::UnsupportedFinishReason` for unexpected model replies
    /// - Provider errors are passed through unchanged
    pub async fn run(&self, conversation: &mut Conversation) -> Result<LoopResult> {
        let invocation_id = Uuid::new_v4().to_string();
        let metrics = LoopMetrics::new(invocation_id.clone());
        let span = tracing::info_span!("invocation", invocation_id = %invocation_id);
        let assistant_before = assistant_messages(conversation);

        info!(
            invocation_id = %invocation_id,
            max_rounds = self.config.max_rounds,
            tools = self.tools.len(),
            "Starting agent loop"
        );

        let deadline = Duration::from_secs(self.config.timeout_seconds);
        let result = match timeout(deadline, self.drive(conversation, &metrics))
            .instrument(span)
            .await
        {
            Ok(result) => result,
            Err(_) => Err(ToolloopError::Timeout(format!(
                "invocation exceeded {} seconds",
                self.config.timeout_seconds
            ))
            .into()),
        };

        let rounds = assistant_messages(conversation) - assistant_before;
        match &result {
            Ok(outcome) => {
                let label = if outcome.is_exhausted() {
                    "exhausted"
                } else {
                    "answer"
                };
                metrics.record_outcome(rounds, label);
                info!(
                    invocation_id = %invocation_id,
                    rounds,
                    outcome = label,
                    elapsed_ms = metrics.elapsed().as_millis() as u64,
                    "Agent loop finished"
                );
            }
            Err(e) => {
                metrics.record_outcome(rounds, error_kind(e));
                warn!(invocation_id = %invocation_id, rounds, "Agent loop failed: {:#}", e);
            }
        }

        result
    }

    async fn drive(
        &self,
        conversation: &mut Conversation,
        metrics: &LoopMetrics,
    ) -> Result<LoopResult> {
        let mut state = LoopState::Running(0);

        loop {
            let round = match state {
                LoopState::Running(round) => round,
                LoopState::Stopped(text) => return Ok(LoopResult::Answer(text)),
                LoopState::Exhausted => {
                    warn!(
                        "Round budget of {} exhausted without a final answer",
                        self.config.max_rounds
                    );
                    return Ok(LoopResult::Exhausted(EXHAUSTED_MESSAGE.to_string()));
                }
            };

            debug!(
                "Round {}/{}, messages: {}, tokens: {}",
                round + 1,
                self.config.max_rounds,
                conversation.len(),
                conversation.token_count()
            );

            let turn = self.call_model(conversation).await?;
            if turn.dropped_tool_calls > 0 {
                metrics.record_dropped_tool_calls(turn.dropped_tool_calls);
            }
            conversation.add_assistant_turn(turn.message);

            state = match turn.verdict {
                Verdict::Stop(text) => {
                    debug!("Model returned final answer in round {}", round + 1);
                    LoopState::Stopped(text)
                }
                Verdict::Invoke(request) => {
                    self.dispatch(conversation, &request, metrics).await?;
                    if round + 1 >= self.config.max_rounds {
                        LoopState::Exhausted
                    } else {
                        LoopState::Running(round + 1)
                    }
                }
            };
        }
    }

    async fn call_model(&self, conversation: &mut Conversation) -> Result<ModelTurn> {
        let deadline = Duration::from_secs(self.config.model_timeout_seconds);
        let response = timeout(
            deadline,
            self.provider
                .complete(conversation.messages(), &self.tool_schemas),
        )
        .await
        .map_err(|_| {
            ToolloopError::Timeout(format!(
                "model call exceeded {} seconds",
                self.config.model_timeout_seconds
            ))
        })??;

        if let Some(usage) = response.usage {
            conversation.update_from_provider_usage(&usage);
        }

        response.into_turn()
    }

    /// Executes one tool request and records exactly one tool result
    async fn dispatch(
        &self,
        conversation: &mut Conversation,
        request: &ToolInvocationRequest,
        metrics: &LoopMetrics,
    ) -> Result<()> {
        debug!(
            tool = %request.tool_name,
            call_id = %request.call_id,
            "Executing tool"
        );

        let deadline = Duration::from_secs(self.config.tool_timeout_seconds);
        let outcome = match timeout(deadline, self.tools.invoke(request)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                metrics.record_tool_call(&request.tool_name, "timeout");
                return Err(ToolloopError::Timeout(format!(
                    "tool '{}' exceeded {} seconds",
                    request.tool_name, self.config.tool_timeout_seconds
                ))
                .into());
            }
        };

        match outcome {
            Ok(value) => {
                metrics.record_tool_call(&request.tool_name, "success");
                let content = serde_json::to_string(&value)?;
                conversation.add_tool_result(request.call_id.clone(), content);
                Ok(())
            }
            Err(e) => {
                let reportable = match classify(&e) {
                    Some(ToolloopError::UnknownTool(_)) => {
                        metrics.record_tool_call(&request.tool_name, "unknown");
                        return Err(e);
                    }
                    Some(ToolloopError::ToolExecution { .. }) => true,
                    _ => false,
                };
                metrics.record_tool_call(&request.tool_name, "error");
                if self.config.report_tool_errors && reportable {
                    warn!("Reporting tool failure to the model: {}", e);
                    let content = json!({ "error": e.to_string() }).to_string();
                    conversation.add_tool_result(request.call_id.clone(), content);
                    Ok(())
                } else {
                    Err(e)
                }
            }
        }
    }
}

fn assistant_messages(conversation: &Conversation) -> usize {
    conversation
        .messages()
        .iter()
        .filter(|m| m.role == Role::Assistant)
        .count()
}

/// Metric label for a failed invocation
fn error_kind(error: &anyhow::Error) -> &'static str {
    match classify(error) {
        Some(ToolloopError::Timeout(_)) => "timeout",
        Some(ToolloopError::UnknownTool(_)) => "unknown_tool",
        Some(ToolloopError::ToolExecution { .. }) => "tool_error",
        Some(ToolloopError::UnsupportedFinishReason(_)) => "unsupported_finish_reason",
        Some(ToolloopError::Authentication(_)) => "authentication",
        Some(ToolloopError::Provider(_)) | Some(ToolloopError::Http(_)) => "provider_error",
        _ => "error",
    }
}
