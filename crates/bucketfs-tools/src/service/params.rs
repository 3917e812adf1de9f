use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileIdParams {
    pub file_id: String,
}

#[derive(Debug, Deserialize)]
pub struct WriteContentParams {
    pub filename: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct WritePathParams {
    pub filename: String,
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct WriteBase64Params {
    pub filename: String,
    pub data: String,
}

/// Deserializes tool arguments, naming the tool in the error.
pub(crate) fn parse<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T> {
    serde_json::from_value(arguments)
        .map_err(|e| Error::InvalidParameters(format!("Invalid {tool} arguments: {e}")))
}
