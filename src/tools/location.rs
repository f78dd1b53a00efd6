//! IP geolocation tool
//!
//! `getLocation` takes no arguments and returns the JSON document the
//! geolocation service reports for the caller's public IP address.

use crate::config::LocationConfig;
use crate::error::{Result, ToolloopError};
use crate::tools::{ToolExecutor, ToolSpec};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Name the model uses to request this tool
pub const LOCATION_TOOL_NAME: &str = "getLocation";

/// Looks up the user's location from their IP address
pub struct LocationTool {
    client: reqwest::Client,
    endpoint: String,
}

impl LocationTool {
    /// Create a new location tool
    ///
    /// # Arguments
    ///
    /// * `config` - Service base URL
    /// * `timeout` - Timeout for the HTTP request
    pub fn new(config: &LocationConfig, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            endpoint: format!("{}/json/", config.api_base.trim_end_matches('/')),
        }
    }

    async fn fetch(&self) -> Result<Value> {
        tracing::debug!("Fetching location from {}", self.endpoint);

        let response = self.client.get(&self.endpoint).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ToolloopError::ToolExecution {
                tool: LOCATION_TOOL_NAME.to_string(),
                message: format!("location service returned {}", status),
            }
            .into());
        }

        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl ToolExecutor for LocationTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            LOCATION_TOOL_NAME,
            "Get the user's location based on their IP address",
        )
    }

    async fn execute(&self, _args: Vec<Value>) -> Result<Value> {
        self.fetch().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tool_for(server: &MockServer) -> LocationTool {
        LocationTool::new(
            &LocationConfig {
                api_base: server.uri(),
            },
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_spec_has_no_parameters() {
        let tool = LocationTool::new(&LocationConfig::default(), Duration::from_secs(1));
        let spec = tool.spec();
        assert_eq!(spec.name, "getLocation");
        assert!(spec.parameters.is_empty());
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let tool = LocationTool::new(
            &LocationConfig {
                api_base: "https://ipapi.co/".to_string(),
            },
            Duration::from_secs(1),
        );
        assert_eq!(tool.endpoint, "https://ipapi.co/json/");
    }

    #[tokio::test]
    async fn test_execute_returns_service_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "city": "San Francisco",
                "latitude": 37.7749,
                "longitude": -122.4194
            })))
            .expect(1)
            .mount(&server)
            .await;

        let value = tool_for(&server).execute(vec![]).await.unwrap();
        assert_eq!(value["city"], "San Francisco");
        assert_eq!(value["latitude"], 37.7749);
    }

    #[tokio::test]
    async fn test_execute_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = tool_for(&server).execute(vec![]).await.unwrap_err();
        assert!(matches!(
            classify(&err),
            Some(ToolloopError::ToolExecution { tool, .. }) if tool == "getLocation"
        ));
    }
}
