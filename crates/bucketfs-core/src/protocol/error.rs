use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The `error` member of a JSON-RPC error response.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ErrorData {
    /// One of the codes in [`constants`](super::constants).
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorData {
    pub fn new<S: Into<String>>(code: i32, message: S) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}
