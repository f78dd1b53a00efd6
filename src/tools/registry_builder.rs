//! Default tool registry builder
//!
//! Registers the built-in tools, in the order the model sees them, against
//! the endpoints named in the tools configuration.

use std::sync::Arc;
use std::time::Duration;

use crate::config::ToolsConfig;
use crate::error::Result;
use crate::tools::{LocationTool, ToolRegistry, WeatherTool};

/// Build the registry holding `getCurrentWeather` and `getLocation`
///
/// # Arguments
///
/// * `tools_config` - Service endpoints for the built-in tools
/// * `timeout` - Per-request HTTP timeout for each tool
///
/// # Errors
///
/// Returns error if a tool fails registration
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use toolloop::config::ToolsConfig;
/// use toolloop::tools::build_default_registry;
///
/// let registry = build_default_registry(&ToolsConfig::default(), Duration::from_secs(10)).unwrap();
/// assert_eq!(registry.names(), vec!["getCurrentWeather", "getLocation"]);
/// ```
pub fn build_default_registry(tools_config: &ToolsConfig, timeout: Duration) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(WeatherTool::new(&tools_config.weather, timeout)))?;
    registry.register(Arc::new(LocationTool::new(&tools_config.location, timeout)))?;

    tracing::debug!("Built default tool registry with {} tools", registry.len());
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_contents() {
        let registry = build_default_registry(&ToolsConfig::default(), Duration::from_secs(1)).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.resolve("getCurrentWeather").is_ok());
        assert!(registry.resolve("getLocation").is_ok());
    }

    #[test]
    fn test_default_registry_schemas() {
        let registry = build_default_registry(&ToolsConfig::default(), Duration::from_secs(1)).unwrap();
        let schemas = registry.schemas();

        let weather = &schemas[0]["function"];
        assert_eq!(weather["name"], "getCurrentWeather");
        assert_eq!(
            weather["parameters"]["required"],
            serde_json::json!(["latitude", "longitude"])
        );

        let location = &schemas[1]["function"];
        assert_eq!(location["name"], "getLocation");
        assert!(location["parameters"].get("required").is_none());
    }
}
