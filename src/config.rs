//! Configuration management for Toolloop
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::cli::{Cli, Commands};
use crate::error::{Result, ToolloopError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Fixed instruction placed at the head of every conversation
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Only use the functions you have been provided with.";

/// Provider types understood by [`crate::providers::create_provider`]
pub const VALID_PROVIDERS: &[&str] = &["openai"];

/// Main configuration structure for Toolloop
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Agent loop configuration
    #[serde(default)]
    pub agent: AgentConfig,
    /// Endpoints used by the built-in tools
    #[serde(default)]
    pub tools: ToolsConfig,
    /// HTTP entry surface configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// Provider configuration
///
/// Specifies which model provider to use and its settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Type of provider to use
    #[serde(rename = "type", default = "default_provider_type")]
    pub provider_type: String,

    /// OpenAI-compatible chat completions configuration
    #[serde(default)]
    pub openai: OpenAiConfig,
}

fn default_provider_type() -> String {
    "openai".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: default_provider_type(),
            openai: OpenAiConfig::default(),
        }
    }
}

/// OpenAI-compatible provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Model identifier sent with every request
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// API base URL; `/chat/completions` is appended
    ///
    /// Any OpenAI-compatible endpoint works, and tests point this at a
    /// mock server.
    #[serde(default = "default_openai_api_base")]
    pub api_base: String,

    /// Credential used when the caller does not supply one
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

fn default_openai_model() -> String {
    "gpt-4".to_string()
}

fn default_openai_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            model: default_openai_model(),
            api_base: default_openai_api_base(),
            api_key: None,
        }
    }
}

/// Agent loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum number of model-call rounds before the loop gives up
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    /// Deadline for an entire invocation (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Deadline for a single model call (seconds)
    #[serde(default = "default_model_timeout")]
    pub model_timeout_seconds: u64,

    /// Deadline for a single tool execution (seconds)
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_seconds: u64,

    /// Record tool failures as tool-result messages instead of aborting
    #[serde(default)]
    pub report_tool_errors: bool,

    /// System message placed first in every conversation
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

fn default_max_rounds() -> usize {
    5
}

fn default_timeout() -> u64 {
    120
}

fn default_model_timeout() -> u64 {
    60
}

fn default_tool_timeout() -> u64 {
    30
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            timeout_seconds: default_timeout(),
            model_timeout_seconds: default_model_timeout(),
            tool_timeout_seconds: default_tool_timeout(),
            report_tool_errors: false,
            system_prompt: default_system_prompt(),
        }
    }
}

/// Endpoints for the built-in tools
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// IP geolocation service
    #[serde(default)]
    pub location: LocationConfig,

    /// Weather forecast service
    #[serde(default)]
    pub weather: WeatherConfig,
}

/// IP geolocation tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Base URL; `/json/` is appended
    #[serde(default = "default_location_api_base")]
    pub api_base: String,
}

fn default_location_api_base() -> String {
    "https://ipapi.co".to_string()
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            api_base: default_location_api_base(),
        }
    }
}

/// Weather forecast tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Base URL; `/v1/forecast` is appended
    #[serde(default = "default_weather_api_base")]
    pub api_base: String,
}

fn default_weather_api_base() -> String {
    "https://api.open-meteo.com".to_string()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_base: default_weather_api_base(),
        }
    }
}

/// HTTP entry surface configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

fn default_server_addr() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
        }
    }
}

impl Config {
    /// Load configuration from file, environment, and CLI arguments
    ///
    /// Precedence, lowest to highest: built-in defaults, YAML file,
    /// environment variables, CLI flags.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the YAML configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ToolloopError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ToolloopError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(provider_type) = std::env::var("TOOLLOOP_PROVIDER") {
            self.provider.provider_type = provider_type;
        }

        if let Ok(model) = std::env::var("TOOLLOOP_MODEL") {
            self.provider.openai.model = model;
        }

        if let Ok(api_base) = std::env::var("TOOLLOOP_API_BASE") {
            self.provider.openai.api_base = api_base;
        }

        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            if !api_key.is_empty() {
                self.provider.openai.api_key = Some(api_key);
            }
        }

        if let Ok(max_rounds) = std::env::var("TOOLLOOP_MAX_ROUNDS") {
            if let Ok(value) = max_rounds.parse() {
                self.agent.max_rounds = value;
            } else {
                tracing::warn!("Invalid TOOLLOOP_MAX_ROUNDS: {}", max_rounds);
            }
        }

        if let Ok(timeout) = std::env::var("TOOLLOOP_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.agent.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid TOOLLOOP_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(addr) = std::env::var("TOOLLOOP_SERVER_ADDR") {
            tracing::debug!(addr = %addr, "Env override: TOOLLOOP_SERVER_ADDR");
            self.server.addr = addr;
        }
    }

    fn apply_cli_overrides(&mut self, cli: &Cli) {
        match &cli.command {
            Commands::Ask {
                api_key,
                model,
                max_rounds,
                ..
            } => {
                if let Some(key) = api_key {
                    self.provider.openai.api_key = Some(key.clone());
                }
                if let Some(model) = model {
                    self.provider.openai.model = model.clone();
                }
                if let Some(rounds) = max_rounds {
                    self.agent.max_rounds = *rounds;
                }
            }
            Commands::Serve { addr } => {
                if let Some(addr) = addr {
                    self.server.addr = addr.clone();
                }
            }
            Commands::Tools => {}
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `ToolloopError::Config` describing the first invalid setting
    pub fn validate(&self) -> Result<()> {
        if !VALID_PROVIDERS.contains(&self.provider.provider_type.as_str()) {
            return Err(ToolloopError::Config(format!(
                "Invalid provider type: {}. Must be one of: {}",
                self.provider.provider_type,
                VALID_PROVIDERS.join(", ")
            ))
            .into());
        }

        if self.provider.openai.model.trim().is_empty() {
            return Err(ToolloopError::Config("provider.openai.model cannot be empty".to_string()).into());
        }

        if self.agent.max_rounds == 0 {
            return Err(
                ToolloopError::Config("max_rounds must be greater than 0".to_string()).into(),
            );
        }

        if self.agent.max_rounds > 100 {
            return Err(ToolloopError::Config(
                "max_rounds must be less than or equal to 100".to_string(),
            )
            .into());
        }

        if self.agent.timeout_seconds == 0
            || self.agent.model_timeout_seconds == 0
            || self.agent.tool_timeout_seconds == 0
        {
            return Err(
                ToolloopError::Config("timeouts must be greater than 0".to_string()).into(),
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serial_test::serial;
    use std::io::Write;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("toolloop").chain(args.iter().copied()))
    }

    fn clear_env() {
        for key in [
            "TOOLLOOP_PROVIDER",
            "TOOLLOOP_MODEL",
            "TOOLLOOP_API_BASE",
            "OPENAI_API_KEY",
            "TOOLLOOP_MAX_ROUNDS",
            "TOOLLOOP_TIMEOUT_SECONDS",
            "TOOLLOOP_SERVER_ADDR",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider.provider_type, "openai");
        assert_eq!(config.provider.openai.model, "gpt-4");
        assert_eq!(config.agent.max_rounds, 5);
        assert!(!config.agent.report_tool_errors);
        assert_eq!(config.agent.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(config.tools.location.api_base, "https://ipapi.co");
        assert_eq!(config.tools.weather.api_base, "https://api.open-meteo.com");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_provider() {
        let mut config = Config::default();
        config.provider.provider_type = "copilot".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Invalid provider type"));
    }

    #[test]
    fn test_validate_rejects_zero_rounds() {
        let mut config = Config::default();
        config.agent.max_rounds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_too_many_rounds() {
        let mut config = Config::default();
        config.agent.max_rounds = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.agent.tool_timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_model() {
        let mut config = Config::default();
        config.provider.openai.model = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
provider:
  openai:
    model: gpt-4o-mini
agent:
  max_rounds: 3
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.provider.provider_type, "openai");
        assert_eq!(config.provider.openai.model, "gpt-4o-mini");
        assert_eq!(config.provider.openai.api_base, "https://api.openai.com/v1");
        assert_eq!(config.agent.max_rounds, 3);
        assert_eq!(config.agent.timeout_seconds, 120);
        assert_eq!(config.server.addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_api_key_is_not_serialized() {
        let mut config = Config::default();
        config.provider.openai.api_key = Some("sk-secret".to_string());
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(!yaml.contains("sk-secret"));
    }

    #[test]
    #[serial]
    fn test_load_missing_file_uses_defaults() {
        clear_env();
        let config = Config::load("/nonexistent/toolloop.yaml", &cli(&["tools"])).unwrap();
        assert_eq!(config.agent.max_rounds, 5);
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        clear_env();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "agent:\n  max_rounds: 7\n  report_tool_errors: true\nserver:\n  addr: 0.0.0.0:9000"
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = Config::load(&path, &cli(&["tools"])).unwrap();
        assert_eq!(config.agent.max_rounds, 7);
        assert!(config.agent.report_tool_errors);
        assert_eq!(config.server.addr, "0.0.0.0:9000");
    }

    #[test]
    #[serial]
    fn test_load_rejects_malformed_file() {
        clear_env();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "agent: [not, a, map").unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let err = Config::load(&path, &cli(&["tools"])).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        std::env::set_var("TOOLLOOP_MODEL", "gpt-4o");
        std::env::set_var("TOOLLOOP_MAX_ROUNDS", "9");
        std::env::set_var("OPENAI_API_KEY", "sk-env");
        std::env::set_var("TOOLLOOP_TIMEOUT_SECONDS", "not-a-number");
        std::env::set_var("TOOLLOOP_PROVIDER", "openai");
        std::env::set_var("TOOLLOOP_API_BASE", "http://127.0.0.1:4010/v1");
        std::env::set_var("TOOLLOOP_SERVER_ADDR", "0.0.0.0:8181");

        let config = Config::load("/nonexistent/toolloop.yaml", &cli(&["tools"])).unwrap();
        clear_env();

        assert_eq!(config.provider.provider_type, "openai");
        assert_eq!(config.provider.openai.api_base, "http://127.0.0.1:4010/v1");
        assert_eq!(config.server.addr, "0.0.0.0:8181");
        assert_eq!(config.provider.openai.model, "gpt-4o");
        assert_eq!(config.agent.max_rounds, 9);
        assert_eq!(config.provider.openai.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.agent.timeout_seconds, 120);
    }

    #[test]
    #[serial]
    fn test_env_provider_override_is_validated() {
        clear_env();
        std::env::set_var("TOOLLOOP_PROVIDER", "nonexistent");

        let config = Config::load("/nonexistent/toolloop.yaml", &cli(&["tools"])).unwrap();
        clear_env();

        assert_eq!(config.provider.provider_type, "nonexistent");
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_cli_overrides_win_over_env() {
        clear_env();
        std::env::set_var("TOOLLOOP_MAX_ROUNDS", "9");
        std::env::set_var("OPENAI_API_KEY", "sk-env");

        let cli = cli(&[
            "ask",
            "hello",
            "--api-key",
            "sk-cli",
            "--model",
            "gpt-4.1",
            "--max-rounds",
            "2",
        ]);
        let config = Config::load("/nonexistent/toolloop.yaml", &cli).unwrap();
        clear_env();

        assert_eq!(config.agent.max_rounds, 2);
        assert_eq!(config.provider.openai.api_key.as_deref(), Some("sk-cli"));
        assert_eq!(config.provider.openai.model, "gpt-4.1");
    }

    #[test]
    #[serial]
    fn test_serve_addr_override() {
        clear_env();
        let config =
            Config::load("/nonexistent/toolloop.yaml", &cli(&["serve", "--addr", "0.0.0.0:3000"]))
                .unwrap();
        assert_eq!(config.server.addr, "0.0.0.0:3000");
    }
}
