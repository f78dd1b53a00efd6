//! Error types for Toolloop
//!
//! This module defines all error types used throughout the crate,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Toolloop operations
///
/// Covers configuration loading, model-provider exchanges, tool registration
/// and dispatch, and the HTTP entry surface. Budget exhaustion is not an
/// error and has no variant here.
#[derive(Error, Debug)]
pub enum ToolloopError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider-related errors (transport failures, bad status, malformed replies)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Authentication rejected by the provider (401/403)
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Missing credentials for provider
    #[error("Missing credentials for provider: {0}")]
    MissingCredentials(String),

    /// The model requested a tool that is not registered
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// A tool with the same name is already registered
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    /// A tool specification failed registration-time validation
    #[error("Invalid tool specification: {0}")]
    InvalidToolSpec(String),

    /// The model finished with a reason other than `tool_calls` or `stop`
    #[error("Unsupported finish reason: {0}")]
    UnsupportedFinishReason(String),

    /// A registered tool failed while executing
    #[error("Tool '{tool}' execution failed: {message}")]
    ToolExecution {
        /// Name of the tool that failed
        tool: String,
        /// Failure description
        message: String,
    },

    /// A model call, tool call, or the whole invocation ran out of time
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The inbound request could not be turned into a loop invocation
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Toolloop operations
///
/// Uses `anyhow::Error` so context can be attached freely; callers that need
/// to branch on the failure kind use `downcast_ref::<ToolloopError>()`.
pub type Result<T> = anyhow::Result<T>;

/// Returns the `ToolloopError` carried by an `anyhow::Error`, if any
pub fn classify(error: &anyhow::Error) -> Option<&ToolloopError> {
    error.downcast_ref::<ToolloopError>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = ToolloopError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_provider_error_display() {
        let error = ToolloopError::Provider("API timeout".to_string());
        assert_eq!(error.to_string(), "Provider error: API timeout");
    }

    #[test]
    fn test_unknown_tool_display() {
        let error = ToolloopError::UnknownTool("getStockPrice".to_string());
        assert_eq!(error.to_string(), "Unknown tool: getStockPrice");
    }

    #[test]
    fn test_tool_execution_display() {
        let error = ToolloopError::ToolExecution {
            tool: "getLocation".to_string(),
            message: "connection refused".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Tool 'getLocation' execution failed: connection refused"
        );
    }

    #[test]
    fn test_unsupported_finish_reason_display() {
        let error = ToolloopError::UnsupportedFinishReason("length".to_string());
        assert_eq!(error.to_string(), "Unsupported finish reason: length");
    }

    #[test]
    fn test_missing_credentials_error_display() {
        let error = ToolloopError::MissingCredentials("openai".to_string());
        assert_eq!(error.to_string(), "Missing credentials for provider: openai");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let error: ToolloopError = json_error.into();
        assert!(matches!(error, ToolloopError::Serialization(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: : yaml").unwrap_err();
        let error: ToolloopError = yaml_error.into();
        assert!(matches!(error, ToolloopError::Yaml(_)));
    }

    #[test]
    fn test_classify_through_anyhow() {
        let error: anyhow::Error = ToolloopError::DuplicateTool("getLocation".to_string()).into();
        assert!(matches!(
            classify(&error),
            Some(ToolloopError::DuplicateTool(name)) if name == "getLocation"
        ));
    }

    #[test]
    fn test_classify_foreign_error() {
        let error = anyhow::anyhow!("something else");
        assert!(classify(&error).is_none());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ToolloopError>();
    }
}
