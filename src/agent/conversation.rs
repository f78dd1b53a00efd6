//! Conversation history with token tracking
//!
//! A conversation belongs to exactly one loop invocation. It is append-only:
//! messages are never removed or rewritten, so every round sees the full
//! history of the rounds before it.

use crate::providers::{Message, Role, TokenUsage};

/// Ordered message history for one invocation
///
/// # Token Counting
///
/// Uses a simple heuristic: characters / 4 (approximates GPT tokenization).
/// Provider-reported token counts are accumulated separately when available.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    token_count: usize,
    provider_token_usage: Option<TokenUsage>,
}

impl Conversation {
    /// Creates an empty conversation
    ///
    /// # Examples
    ///
    /// ```
    /// use toolloop::agent::Conversation;
    ///
    /// let conversation = Conversation::new();
    /// assert!(conversation.is_empty());
    /// assert_eq!(conversation.token_count(), 0);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a conversation seeded with a system message
    ///
    /// # Examples
    ///
    /// ```
    /// use toolloop::agent::Conversation;
    /// use toolloop::providers::Role;
    ///
    /// let conversation = Conversation::with_system_prompt("Only use the functions you have been provided with.");
    /// assert_eq!(conversation.messages()[0].role, Role::System);
    /// ```
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        let mut conversation = Self::new();
        conversation.add_system_message(prompt);
        conversation
    }

    /// Adds a user message to the conversation
    ///
    /// # Examples
    ///
    /// ```
    /// use toolloop::agent::Conversation;
    ///
    /// let mut conversation = Conversation::new();
    /// conversation.add_user_message("Hello, assistant!");
    /// assert_eq!(conversation.len(), 1);
    /// ```
    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.push(Message::user(content));
    }

    /// Adds a system message to the conversation
    pub fn add_system_message(&mut self, content: impl Into<String>) {
        self.push(Message::system(content));
    }

    /// Adds a plain-text assistant message
    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.push(Message::assistant(content));
    }

    /// Adds an assistant message exactly as classified from the model reply
    ///
    /// Used for tool-call requests, where the message carries `tool_calls`.
    pub fn add_assistant_turn(&mut self, message: Message) {
        debug_assert_eq!(message.role, Role::Assistant);
        self.push(message);
    }

    /// Adds a tool result message to the conversation
    ///
    /// # Arguments
    ///
    /// * `tool_call_id` - The ID of the tool call this result corresponds to
    /// * `content` - The serialized tool return value
    pub fn add_tool_result(&mut self, tool_call_id: impl Into<String>, content: impl Into<String>) {
        self.push(Message::tool_result(tool_call_id, content));
    }

    fn push(&mut self, message: Message) {
        self.token_count += message_tokens(&message);
        self.messages.push(message);
    }

    /// Returns all messages in order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the heuristic token count
    pub fn token_count(&self) -> usize {
        self.token_count
    }

    /// Returns the number of messages in the conversation
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if the conversation has no messages
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Accumulates provider-reported usage across completions
    ///
    /// # Examples
    ///
    /// ```
    /// use toolloop::agent::Conversation;
    /// use toolloop::providers::TokenUsage;
    ///
    /// let mut conversation = Conversation::new();
    /// conversation.update_from_provider_usage(&TokenUsage::new(50, 25));
    /// conversation.update_from_provider_usage(&TokenUsage::new(80, 10));
    /// assert_eq!(conversation.provider_token_usage().unwrap().total_tokens, 165);
    /// ```
    pub fn update_from_provider_usage(&mut self, usage: &TokenUsage) {
        self.provider_token_usage = Some(match self.provider_token_usage {
            Some(existing) => TokenUsage::new(
                existing.prompt_tokens + usage.prompt_tokens,
                existing.completion_tokens + usage.completion_tokens,
            ),
            None => *usage,
        });
    }

    /// Accumulated provider token usage, if any was reported
    pub fn provider_token_usage(&self) -> Option<TokenUsage> {
        self.provider_token_usage
    }
}

fn message_tokens(message: &Message) -> usize {
    let mut tokens = message.content.as_deref().map(estimate_tokens).unwrap_or(0);
    if let Some(calls) = &message.tool_calls {
        for call in calls {
            tokens += estimate_tokens(&call.function.name);
            tokens += estimate_tokens(&call.function.arguments);
        }
    }
    tokens
}

/// Estimates token count for a string using a simple heuristic
fn estimate_tokens(text: &str) -> usize {
    (text.chars().count() + 3) / 4
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ToolCall;

    #[test]
    fn test_new_conversation() {
        let conversation = Conversation::new();
        assert_eq!(conversation.token_count(), 0);
        assert!(conversation.is_empty());
        assert!(conversation.provider_token_usage().is_none());
    }

    #[test]
    fn test_with_system_prompt() {
        let conversation = Conversation::with_system_prompt("Be helpful");
        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation.messages()[0].role, Role::System);
        assert_eq!(conversation.messages()[0].content.as_deref(), Some("Be helpful"));
    }

    #[test]
    fn test_message_order_is_preserved() {
        let mut conversation = Conversation::with_system_prompt("sys");
        conversation.add_user_message("What's the weather?");
        conversation.add_assistant_turn(Message::assistant_with_tools(
            None,
            vec![ToolCall::new("call_1", "getLocation", "{}")],
        ));
        conversation.add_tool_result("call_1", r#"{"city":"Paris"}"#);
        conversation.add_assistant_message("It is mild in Paris.");

        let roles: Vec<Role> = conversation.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::Assistant]
        );
        assert_eq!(
            conversation.messages()[3].tool_call_id.as_deref(),
            Some("call_1")
        );
    }

    #[test]
    fn test_token_counting_grows() {
        let mut conversation = Conversation::new();
        conversation.add_user_message("This is a test message");
        let after_user = conversation.token_count();
        assert!(after_user > 0);

        conversation.add_assistant_turn(Message::assistant_with_tools(
            None,
            vec![ToolCall::new("c", "getCurrentWeather", r#"{"latitude":"1"}"#)],
        ));
        assert!(conversation.token_count() > after_user);
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }
}
