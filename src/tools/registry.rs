use crate::types::{AppError, Result, ToolDefinition};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A named, schema-described action the model may request.
///
/// Implementations must not reach into conversation state: everything a tool
/// needs arrives through `args`.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON Schema (object form) describing the accepted arguments.
    fn parameters_schema(&self) -> Value;
    /// Run the tool. Arguments have already been validated against the schema.
    async fn execute(&self, args: Value) -> Result<String>;

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Name-indexed set of tools.
///
/// Built once at startup and then shared read-only behind an `Arc`.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Create a new registry with the default tools (web search, calculator)
    pub fn with_default_tools() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(crate::tools::search::SearchTool::new()));
        registry.register(Arc::new(crate::tools::calculator::Calculator));
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Tool schemas sorted by name, so repeated requests are byte-identical.
    pub fn get_tool_definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> =
            self.tools.values().map(|tool| tool.to_definition()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Validate `args` against the tool's schema, then run it.
    pub async fn execute(&self, name: &str, args: Value) -> Result<String> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| AppError::NotFound(format!("Tool not found: {}", name)))?;
        validate_arguments(&tool.parameters_schema(), &args)?;
        tool.execute(args).await
    }

    /// Get a sorted list of all registered tool names
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Check an argument mapping against the object-schema subset tools declare:
/// `type: object`, `required`, and per-property primitive `type`s.
/// Unknown properties are allowed.
pub fn validate_arguments(schema: &Value, args: &Value) -> Result<()> {
    let Some(obj) = args.as_object() else {
        return Err(AppError::InvalidInput(format!(
            "arguments must be an object, got {}",
            json_type_name(args)
        )));
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for key in required.iter().filter_map(Value::as_str) {
            if !obj.contains_key(key) {
                return Err(AppError::InvalidInput(format!(
                    "missing required argument '{}'",
                    key
                )));
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (key, value) in obj {
            let expected = properties
                .get(key)
                .and_then(|p| p.get("type"))
                .and_then(Value::as_str);
            if let Some(expected) = expected {
                if !matches_type(expected, value) {
                    return Err(AppError::InvalidInput(format!(
                        "argument '{}' must be of type {}, got {}",
                        key,
                        expected,
                        json_type_name(value)
                    )));
                }
            }
        }
    }

    Ok(())
}

fn matches_type(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_creation() {
        let registry = ToolRegistry::new();
        assert_eq!(registry.tool_names().len(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registry_with_default_tools() {
        let registry = ToolRegistry::with_default_tools();
        assert_eq!(registry.len(), 2);
        assert!(registry.has_tool("search_web"));
        assert!(registry.has_tool("calculator"));
        assert_eq!(registry.tool_names(), vec!["calculator", "search_web"]);
    }

    #[test]
    fn test_get_tool_definitions() {
        let registry = ToolRegistry::with_default_tools();
        let definitions = registry.get_tool_definitions();

        assert_eq!(definitions.len(), 2);
        assert_eq!(definitions[0].name, "calculator");
        for def in &definitions {
            assert!(!def.description.is_empty());
            assert_eq!(def.parameters["type"], "object");
        }
    }

    #[tokio::test]
    async fn test_calculator_execution() {
        let registry = ToolRegistry::with_default_tools();
        let result = registry
            .execute("calculator", json!({"expression": "5 + 3"}))
            .await
            .unwrap();
        assert_eq!(result, "Result: 5 + 3 = 8");
    }

    #[tokio::test]
    async fn test_nonexistent_tool() {
        let registry = ToolRegistry::with_default_tools();
        let err = registry
            .execute("nonexistent_tool", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_invalid_arguments_rejected_before_execution() {
        let registry = ToolRegistry::with_default_tools();
        let err = registry
            .execute("calculator", json!({"expression": 42}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("must be of type string"));

        let err = registry.execute("search_web", json!({})).await.unwrap_err();
        assert!(err.to_string().contains("missing required argument 'query'"));
    }

    #[test]
    fn test_validate_arguments() {
        let schema = json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "limit": {"type": "integer"}
            },
            "required": ["query"]
        });

        assert!(validate_arguments(&schema, &json!({"query": "x"})).is_ok());
        assert!(validate_arguments(&schema, &json!({"query": "x", "limit": 3})).is_ok());
        assert!(validate_arguments(&schema, &json!({"query": "x", "extra": true})).is_ok());
        assert!(validate_arguments(&schema, &json!({"query": "x", "limit": 2.5})).is_err());
        assert!(validate_arguments(&schema, &json!("x")).is_err());
    }
}
