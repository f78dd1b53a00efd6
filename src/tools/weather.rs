//! Weather forecast tool
//!
//! `getCurrentWeather(latitude, longitude)` queries the forecast service for
//! hourly apparent temperature at the given coordinates.

use crate::config::WeatherConfig;
use crate::error::{Result, ToolloopError};
use crate::tools::{ParameterKind, ToolExecutor, ToolParameter, ToolSpec};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Name the model uses to request this tool
pub const WEATHER_TOOL_NAME: &str = "getCurrentWeather";

/// Fetches the forecast for a coordinate pair
pub struct WeatherTool {
    client: reqwest::Client,
    api_base: String,
}

impl WeatherTool {
    /// Create a new weather tool
    pub fn new(config: &WeatherConfig, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Build the forecast URL for a coordinate pair
    ///
    /// # Errors
    ///
    /// Returns `ToolloopError::Config` if the configured base URL is invalid
    pub fn forecast_url(&self, latitude: &str, longitude: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/v1/forecast", self.api_base)).map_err(|e| {
            ToolloopError::Config(format!("Invalid weather api_base '{}': {}", self.api_base, e))
        })?;
        url.query_pairs_mut()
            .append_pair("latitude", latitude)
            .append_pair("longitude", longitude)
            .append_pair("hourly", "apparent_temperature");
        Ok(url)
    }
}

/// Coordinates may arrive as JSON strings or numbers
fn coordinate(name: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Err(ToolloopError::ToolExecution {
            tool: WEATHER_TOOL_NAME.to_string(),
            message: format!("missing argument '{}'", name),
        }
        .into()),
        other => Err(ToolloopError::ToolExecution {
            tool: WEATHER_TOOL_NAME.to_string(),
            message: format!("argument '{}' is not a coordinate: {}", name, other),
        }
        .into()),
    }
}

#[async_trait]
impl ToolExecutor for WeatherTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            WEATHER_TOOL_NAME,
            "Get the current weather in a given location",
        )
        .with_parameter(ToolParameter::required("latitude", ParameterKind::String))
        .with_parameter(ToolParameter::required("longitude", ParameterKind::String))
    }

    async fn execute(&self, args: Vec<Value>) -> Result<Value> {
        let latitude = coordinate("latitude", args.first().unwrap_or(&Value::Null))?;
        let longitude = coordinate("longitude", args.get(1).unwrap_or(&Value::Null))?;

        let url = self.forecast_url(&latitude, &longitude)?;
        tracing::debug!("Fetching forecast from {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ToolloopError::ToolExecution {
                tool: WEATHER_TOOL_NAME.to_string(),
                message: format!("forecast service returned {}", status),
            }
            .into());
        }

        Ok(response.json::<Value>().await?)
    }
}
