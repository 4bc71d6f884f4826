//! The `generate_code` tool the coder model answers through

use crate::extract::{lenient_string, string_list};
use crate::llm::ToolDefinition;
use serde::Deserialize;
use serde_json::{json, Value};

pub const GENERATE_CODE_TOOL: &str = "generate_code";

pub fn generate_code_tool() -> ToolDefinition {
    ToolDefinition {
        name: GENERATE_CODE_TOOL.to_string(),
        description: "Generate Python code that completes the given task".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "Complete Python source code"
                },
                "file_name": {
                    "type": "string",
                    "description": "File name for the code, e.g. data_preprocessing.py"
                },
                "description": {
                    "type": "string",
                    "description": "What the code does"
                },
                "dependencies": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "pip-installable libraries the code imports"
                }
            },
            "required": ["code", "file_name", "description"]
        }),
    }
}

/// Decoded `generate_code` arguments
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GenerateCodeArgs {
    #[serde(default, deserialize_with = "lenient_string")]
    pub code: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub file_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    /// May arrive as a JSON-encoded string; anything unparseable is empty
    #[serde(default, deserialize_with = "string_list")]
    pub dependencies: Vec<String>,
}

impl GenerateCodeArgs {
    /// Decodes tool arguments, which some backends deliver as a JSON string
    pub fn from_arguments(arguments: Value) -> Result<Self, serde_json::Error> {
        match arguments {
            Value::String(encoded) => serde_json::from_str(&encoded),
            other => serde_json::from_value(other),
        }
    }
}
