use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Entry in the `tools/list` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    pub description: String,
    /// JSON Schema for `arguments`.
    pub input_schema: Value,
}

impl Tool {
    pub fn new<N, D>(name: N, description: D, input_schema: Value) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Tool {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// A tool call request, as carried in the params of `tools/call`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default = "empty_arguments")]
    pub arguments: Value,
}

fn empty_arguments() -> Value {
    Value::Object(Default::default())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn tool_call_without_arguments_defaults_to_empty_object() {
        let call: ToolCall = serde_json::from_value(json!({ "name": "list" })).unwrap();
        assert_eq!(call.name, "list");
        assert_eq!(call.arguments, json!({}));
    }

    #[test]
    fn tool_serializes_input_schema_in_camel_case() {
        let tool = Tool::new("read", "Read a file", json!({ "type": "object" }));
        let value = serde_json::to_value(&tool).unwrap();
        assert_eq!(value["inputSchema"], json!({ "type": "object" }));
    }
}
