//! Tool registry: the fixed manifest of actions the model may invoke

use crate::error::ToolError;
use crate::llm::FunctionDefinition;
use crate::tools::ToolKind;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// JSON type of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Boolean,
}

impl ParamType {
    /// JSON schema type name
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Boolean => value.is_boolean(),
        }
    }
}

/// One named, typed parameter of a tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterSpec {
    pub name: String,
    pub param_type: ParamType,
    pub required: bool,
    pub description: String,
}

impl ParameterSpec {
    /// A required string parameter
    pub fn required_string<S: Into<String>>(name: S, description: S) -> Self {
        Self {
            name: name.into(),
            param_type: ParamType::String,
            required: true,
            description: description.into(),
        }
    }
}

/// Declaration of a tool: name, schema and model-facing description
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolDefinition {
    pub kind: ToolKind,
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
}

impl ToolDefinition {
    /// JSON schema for the tool's parameters
    pub fn parameters_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    json!({
                        "type": p.param_type.as_str(),
                        "description": p.description,
                    }),
                )
            })
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Short `name(a, b?)` signature used in the system prompt
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| {
                if p.required {
                    p.name.clone()
                } else {
                    format!("{}?", p.name)
                }
            })
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }

    /// Check argument presence and types against the schema
    pub fn validate<'a>(&self, arguments: &'a Value) -> Result<&'a Map<String, Value>, ToolError> {
        let invalid = |message: String| ToolError::InvalidArguments {
            tool: self.name.clone(),
            message,
        };

        let args = arguments
            .as_object()
            .ok_or_else(|| invalid("arguments must be a JSON object".to_string()))?;

        for spec in &self.parameters {
            match args.get(&spec.name) {
                None | Some(Value::Null) if spec.required => {
                    return Err(invalid(format!("missing required parameter '{}'", spec.name)));
                }
                Some(value) if !value.is_null() && !spec.param_type.accepts(value) => {
                    return Err(invalid(format!(
                        "parameter '{}' must be of type {}",
                        spec.name,
                        spec.param_type.as_str()
                    )));
                }
                _ => {}
            }
        }

        if let Some(unexpected) = args
            .keys()
            .find(|key| !self.parameters.iter().any(|p| &p.name == *key))
        {
            return Err(invalid(format!("unexpected parameter '{}'", unexpected)));
        }

        Ok(args)
    }

    /// Manifest entry sent to the model
    pub fn to_function(&self) -> FunctionDefinition {
        FunctionDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Registry of tool definitions
///
/// Populated at startup and then shared read-only (behind an `Arc`) by every
/// run; there is no way to register through a shared reference.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    definitions: Vec<ToolDefinition>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            definitions: Vec::new(),
        }
    }

    /// Register a tool definition
    pub fn register(&mut self, definition: ToolDefinition) -> Result<(), ToolError> {
        if self.definitions.iter().any(|d| d.name == definition.name) {
            return Err(ToolError::DuplicateTool {
                name: definition.name,
            });
        }
        self.definitions.push(definition);
        Ok(())
    }

    /// Look up a tool by name
    pub fn lookup(&self, name: &str) -> Result<&ToolDefinition, ToolError> {
        self.definitions
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| ToolError::UnknownTool {
                name: name.to_string(),
            })
    }

    /// All definitions, in registration order
    pub fn describe_all(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// List all registered tool names
    pub fn list_tools(&self) -> Vec<&str> {
        self.definitions.iter().map(|d| d.name.as_str()).collect()
    }

    /// Tool manifest for LLM function calling
    pub fn manifest(&self) -> Vec<FunctionDefinition> {
        self.definitions.iter().map(ToolDefinition::to_function).collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        let mut registry = Self::new();

        for kind in ToolKind::ALL {
            registry
                .definitions
                .push(crate::tools::builtin::definition(kind));
        }

        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolFailure;

    #[test]
    fn test_default_registry_has_all_tools() {
        let registry = ToolRegistry::default();
        let tools = registry.list_tools();

        let expected_tools = vec![
            "write_file",
            "update_file",
            "read_file",
            "list_files",
            "finish",
        ];

        assert_eq!(tools, expected_tools);
    }

    #[test]
    fn test_lookup_unknown_tool() {
        let registry = ToolRegistry::default();
        let err = registry.lookup("deploy_to_prod").unwrap_err();
        assert_eq!(err.failure_kind(), ToolFailure::UnknownTool);
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = ToolRegistry::default();
        let duplicate = registry.lookup("finish").unwrap().clone();
        assert!(matches!(
            registry.register(duplicate),
            Err(ToolError::DuplicateTool { .. })
        ));
        assert_eq!(registry.list_tools().len(), 5);
    }

    #[test]
    fn test_tool_parameter_schemas() {
        let registry = ToolRegistry::default();

        for definition in registry.describe_all() {
            let schema = definition.parameters_schema();
            assert_eq!(schema["type"], "object", "tool '{}'", definition.name);
            assert!(schema["properties"].is_object());
            assert!(
                !definition.description.is_empty(),
                "Tool '{}' has empty description",
                definition.name
            );
        }

        let write = registry.lookup("write_file").unwrap();
        assert_eq!(
            write.parameters_schema()["required"],
            serde_json::json!(["path", "content"])
        );
        assert_eq!(write.signature(), "write_file(path, content)");
    }

    #[test]
    fn test_validate_arguments() {
        let registry = ToolRegistry::default();
        let write = registry.lookup("write_file").unwrap();

        assert!(write
            .validate(&json!({"path": "app.py", "content": ""}))
            .is_ok());

        let missing = write.validate(&json!({"path": "app.py"})).unwrap_err();
        assert!(missing.to_string().contains("missing required parameter 'content'"));

        let wrong_type = write
            .validate(&json!({"path": "app.py", "content": 7}))
            .unwrap_err();
        assert!(wrong_type.to_string().contains("must be of type string"));

        let extra = write
            .validate(&json!({"path": "a", "content": "b", "mode": "w"}))
            .unwrap_err();
        assert!(extra.to_string().contains("unexpected parameter 'mode'"));

        assert!(write.validate(&json!(["app.py"])).is_err());
    }

    #[test]
    fn test_manifest_matches_definitions() {
        let registry = ToolRegistry::default();
        let manifest = registry.manifest();
        assert_eq!(manifest.len(), registry.describe_all().len());
        assert_eq!(manifest[0].name, "write_file");
    }
}
