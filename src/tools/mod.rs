//! Tools module for Toolloop
//!
//! This module contains tool specifications, the typed tool registry, and the
//! built-in tool implementations (IP geolocation and weather forecast).
//!
//! A tool declares its parameters as an ordered list. The model supplies
//! arguments as a JSON object; the registry binds them to positional values
//! in declared order before calling the tool, so argument order never depends
//! on the key order of the model's JSON.

pub mod location;
pub mod registry_builder;
pub mod weather;

pub use location::LocationTool;
pub use registry_builder::build_default_registry;
pub use weather::WeatherTool;

use crate::error::{classify, Result, ToolloopError};
use crate::providers::ToolInvocationRequest;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

/// JSON Schema type of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    /// JSON string
    String,
    /// JSON number
    Number,
    /// JSON integer
    Integer,
    /// JSON boolean
    Boolean,
    /// JSON object
    Object,
    /// JSON array
    Array,
}

/// One declared parameter of a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    /// Parameter name as the model sees it
    pub name: String,
    /// JSON Schema type
    pub kind: ParameterKind,
    /// Optional description forwarded to the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the parameter is listed under `required`
    pub required: bool,
}

impl ToolParameter {
    /// Declare a required parameter
    pub fn required(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: None,
            required: true,
        }
    }

    /// Declare an optional parameter
    pub fn optional(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind)
        }
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Tool specification
///
/// Name, human-readable description, and the ordered parameter list.
/// Immutable once registered.
///
/// # Examples
///
/// ```
/// use toolloop::tools::{ParameterKind, ToolParameter, ToolSpec};
///
/// let spec = ToolSpec::new("getCurrentWeather", "Get the current weather in a given location")
///     .with_parameter(ToolParameter::required("latitude", ParameterKind::String))
///     .with_parameter(ToolParameter::required("longitude", ParameterKind::String));
///
/// let schema = spec.schema();
/// assert_eq!(schema["function"]["name"], "getCurrentWeather");
/// assert_eq!(schema["function"]["parameters"]["required"][0], "latitude");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique tool name
    pub name: String,
    /// Description shown to the model
    pub description: String,
    /// Parameters in positional order
    pub parameters: Vec<ToolParameter>,
}

impl ToolSpec {
    /// Create a tool specification without parameters
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    /// Append a parameter at the next position
    pub fn with_parameter(mut self, parameter: ToolParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// JSON Schema object describing the parameters
    pub fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        for parameter in &self.parameters {
            let mut property = json!({ "type": parameter.kind });
            if let Some(description) = &parameter.description {
                property["description"] = json!(description);
            }
            properties.insert(parameter.name.clone(), property);
        }

        let mut schema = json!({
            "type": "object",
            "properties": properties,
        });

        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();
        if !required.is_empty() {
            schema["required"] = json!(required);
        }

        schema
    }

    /// Tool definition in the OpenAI function calling format
    pub fn schema(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters_schema(),
            }
        })
    }

    /// Check the specification is registrable
    ///
    /// # Errors
    ///
    /// Returns `ToolloopError::InvalidToolSpec` for an empty tool name, an
    /// empty parameter name, or a repeated parameter name
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ToolloopError::InvalidToolSpec("tool name cannot be empty".to_string()).into());
        }

        let mut seen = HashSet::new();
        for parameter in &self.parameters {
            if parameter.name.trim().is_empty() {
                return Err(ToolloopError::InvalidToolSpec(format!(
                    "tool '{}' has a parameter with an empty name",
                    self.name
                ))
                .into());
            }
            if !seen.insert(parameter.name.as_str()) {
                return Err(ToolloopError::InvalidToolSpec(format!(
                    "tool '{}' declares parameter '{}' more than once",
                    self.name, parameter.name
                ))
                .into());
            }
        }

        Ok(())
    }

    /// Bind named arguments to positional values in declared order
    ///
    /// Absent parameters bind to `null`; keys that are not declared are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use serde_json::{json, Value};
    /// use toolloop::tools::{ParameterKind, ToolParameter, ToolSpec};
    ///
    /// let spec = ToolSpec::new("t", "d")
    ///     .with_parameter(ToolParameter::required("longitude", ParameterKind::Number))
    ///     .with_parameter(ToolParameter::required("latitude", ParameterKind::Number));
    ///
    /// let args = json!({"latitude": 1.0, "longitude": 2.0});
    /// let bound = spec.bind_arguments(args.as_object().unwrap());
    /// assert_eq!(bound, vec![json!(2.0), json!(1.0)]);
    /// ```
    pub fn bind_arguments(&self, arguments: &Map<String, Value>) -> Vec<Value> {
        for key in arguments.keys() {
            if !self.parameters.iter().any(|p| &p.name == key) {
                tracing::debug!("Ignoring undeclared argument '{}' for tool '{}'", key, self.name);
            }
        }

        self.parameters
            .iter()
            .map(|p| arguments.get(&p.name).cloned().unwrap_or(Value::Null))
            .collect()
    }
}

/// Tool executor trait for implementing tool execution logic
///
/// `execute` receives the arguments already bound to the positions declared
/// by `spec`, and returns a JSON-serializable value.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Returns the tool specification
    fn spec(&self) -> ToolSpec;

    /// Executes the tool with positional arguments
    ///
    /// # Errors
    ///
    /// Returns error if execution fails
    async fn execute(&self, args: Vec<Value>) -> Result<Value>;
}

type ToolFn = dyn Fn(Vec<Value>) -> BoxFuture<'static, Result<Value>> + Send + Sync;

/// Closure-backed tool
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use toolloop::tools::{FunctionTool, ToolSpec};
///
/// let tool = FunctionTool::new(ToolSpec::new("ping", "Reply with pong"), |_args| async {
///     Ok(json!("pong"))
/// });
/// ```
pub struct FunctionTool {
    spec: ToolSpec,
    func: Arc<ToolFn>,
}

impl FunctionTool {
    /// Wrap an async closure as a tool
    pub fn new<F, Fut>(spec: ToolSpec, func: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self {
            spec,
            func: Arc::new(move |args| Box::pin(func(args))),
        }
    }
}

#[async_trait]
impl ToolExecutor for FunctionTool {
    fn spec(&self) -> ToolSpec {
        self.spec.clone()
    }

    async fn execute(&self, args: Vec<Value>) -> Result<Value> {
        (self.func)(args).await
    }
}

/// A tool accepted by the registry
#[derive(Clone)]
pub struct RegisteredTool {
    spec: ToolSpec,
    executor: Arc<dyn ToolExecutor>,
}

impl RegisteredTool {
    /// The specification captured at registration time
    pub fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    /// Bind named arguments and execute
    ///
    /// # Errors
    ///
    /// Returns `ToolloopError::ToolExecution` if the tool fails
    pub async fn call(&self, arguments: &Map<String, Value>) -> Result<Value> {
        let args = self.spec.bind_arguments(arguments);
        self.executor.execute(args).await.map_err(|e| {
            if matches!(classify(&e), Some(ToolloopError::ToolExecution { .. })) {
                e
            } else {
                ToolloopError::ToolExecution {
                    tool: self.spec.name.clone(),
                    message: format!("{:#}", e),
                }
                .into()
            }
        })
    }
}

/// Tool registry for managing available tools
///
/// Populated at startup, read-only afterwards. Schemas are reported in
/// registration order.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create a new empty tool registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool
    ///
    /// # Errors
    ///
    /// - `ToolloopError::DuplicateTool` if the name is already registered
    /// - `ToolloopError::InvalidToolSpec` if the specification is malformed
    pub fn register(&mut self, executor: Arc<dyn ToolExecutor>) -> Result<()> {
        let spec = executor.spec();
        spec.validate()?;

        if self.index.contains_key(&spec.name) {
            return Err(ToolloopError::DuplicateTool(spec.name).into());
        }

        tracing::debug!(
            "Registered tool '{}' with {} parameter(s)",
            spec.name,
            spec.parameters.len()
        );
        self.index.insert(spec.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool { spec, executor });
        Ok(())
    }

    /// Look up a tool by name
    ///
    /// # Errors
    ///
    /// Returns `ToolloopError::UnknownTool` if no tool has that name
    pub fn resolve(&self, name: &str) -> Result<&RegisteredTool> {
        self.index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| ToolloopError::UnknownTool(name.to_string()).into())
    }

    /// Resolve, bind and execute a tool invocation
    ///
    /// # Errors
    ///
    /// `ToolloopError::UnknownTool` or `ToolloopError::ToolExecution`
    pub async fn invoke(&self, request: &ToolInvocationRequest) -> Result<Value> {
        self.resolve(&request.tool_name)?
            .call(&request.arguments)
            .await
    }

    /// All tool definitions in registration order
    pub fn schemas(&self) -> Vec<Value> {
        self.tools.iter().map(|t| t.spec.schema()).collect()
    }

    /// Registered tool names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.spec.name.as_str()).collect()
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_tool(name: &str, params: &[&str]) -> Arc<dyn ToolExecutor> {
        let mut spec = ToolSpec::new(name, "Echo positional arguments");
        for p in params {
            spec = spec.with_parameter(ToolParameter::required(*p, ParameterKind::String));
        }
        Arc::new(FunctionTool::new(spec, |args| async move { Ok(Value::Array(args)) }))
    }

    fn request(tool: &str, arguments: Value) -> ToolInvocationRequest {
        ToolInvocationRequest {
            call_id: "call_1".to_string(),
            tool_name: tool.to_string(),
            arguments: arguments.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_tool_registry_new() {
        let registry = ToolRegistry::new();
        assert_eq!(registry.len(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_tool("echo", &["a"])).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.resolve("echo").unwrap().spec().name, "echo");
    }

    #[test]
    fn test_register_duplicate_fails() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_tool("echo", &[])).unwrap();
        let err = registry.register(echo_tool("echo", &["x"])).unwrap_err();
        assert!(matches!(
            classify(&err),
            Some(ToolloopError::DuplicateTool(name)) if name == "echo"
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_rejects_repeated_parameter() {
        let mut registry = ToolRegistry::new();
        let err = registry.register(echo_tool("echo", &["a", "a"])).unwrap_err();
        assert!(matches!(
            classify(&err),
            Some(ToolloopError::InvalidToolSpec(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_rejects_empty_name() {
        let mut registry = ToolRegistry::new();
        assert!(registry.register(echo_tool("  ", &[])).is_err());
    }

    #[test]
    fn test_resolve_unknown() {
        let registry = ToolRegistry::new();
        let err = registry.resolve("nonexistent").err().unwrap();
        assert!(matches!(
            classify(&err),
            Some(ToolloopError::UnknownTool(name)) if name == "nonexistent"
        ));
    }

    #[test]
    fn test_schemas_follow_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_tool("zeta", &[])).unwrap();
        registry.register(echo_tool("alpha", &[])).unwrap();
        registry.register(echo_tool("mid", &[])).unwrap();

        let names: Vec<String> = registry
            .schemas()
            .iter()
            .map(|s| s["function"]["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert_eq!(registry.names(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_parameters_schema_shape() {
        let spec = ToolSpec::new("t", "d")
            .with_parameter(
                ToolParameter::required("city", ParameterKind::String).with_description("City"),
            )
            .with_parameter(ToolParameter::optional("days", ParameterKind::Integer));

        let schema = spec.parameters_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["city"]["type"], "string");
        assert_eq!(schema["properties"]["city"]["description"], "City");
        assert_eq!(schema["properties"]["days"]["type"], "integer");
        assert_eq!(schema["required"], json!(["city"]));
    }

    #[test]
    fn test_parameterless_schema_omits_required() {
        let schema = ToolSpec::new("getLocation", "d").parameters_schema();
        assert_eq!(schema, json!({"type": "object", "properties": {}}));
    }

    #[tokio::test]
    async fn test_invoke_binds_by_declared_order_not_key_order() {
        let mut registry = ToolRegistry::new();
        // Declared order is the reverse of the alphabetical key order.
        registry.register(echo_tool("echo", &["second", "first"])).unwrap();

        let result = registry
            .invoke(&request("echo", json!({"first": "1", "second": "2"})))
            .await
            .unwrap();
        assert_eq!(result, json!(["2", "1"]));
    }

    #[tokio::test]
    async fn test_invoke_missing_argument_binds_null_and_extra_ignored() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_tool("echo", &["a", "b"])).unwrap();

        let result = registry
            .invoke(&request("echo", json!({"b": "x", "unexpected": true})))
            .await
            .unwrap();
        assert_eq!(result, json!([null, "x"]));
    }

    #[tokio::test]
    async fn test_invoke_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry.invoke(&request("missing", json!({}))).await.unwrap_err();
        assert!(matches!(classify(&err), Some(ToolloopError::UnknownTool(_))));
    }

    #[tokio::test]
    async fn test_invoke_wraps_execution_failure() {
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(FunctionTool::new(
                ToolSpec::new("broken", "Always fails"),
                |_args| async { Err(anyhow::anyhow!("upstream unavailable")) },
            )))
            .unwrap();

        let err = registry.invoke(&request("broken", json!({}))).await.unwrap_err();
        match classify(&err) {
            Some(ToolloopError::ToolExecution { tool, message }) => {
                assert_eq!(tool, "broken");
                assert!(message.contains("upstream unavailable"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
