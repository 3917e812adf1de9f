use async_trait::async_trait;
use serde_json::Value;

use crate::{
    core::{
        ToolCall,
        protocol::{
            constants::PROTOCOL_VERSION,
            message::{JsonRpcRequest, JsonRpcResponse, RequestId},
            result::{
                CallToolResult, EmptyResult, Implementation, InitializeResult, ListToolsResult,
            },
        },
    },
    error::{Error, Result},
    router::traits::Router,
};

/// Request handlers shared by every [`Router`].
#[async_trait]
pub trait RouterExt: Router {
    fn create_response(&self, id: Option<RequestId>) -> JsonRpcResponse {
        JsonRpcResponse::new_empty(id)
    }

    async fn handle_initialize(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse> {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: self.capabilities(),
            server_info: Implementation {
                name: self.name(),
                version: self.version(),
            },
            instructions: Some(self.instructions()),
        };
        Ok(JsonRpcResponse::with_result(
            req.id,
            serde_json::to_value(result)?,
        ))
    }

    async fn handle_ping(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse> {
        Ok(JsonRpcResponse::with_result(
            req.id,
            serde_json::to_value(EmptyResult::default())?,
        ))
    }

    async fn handle_tools_list(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse> {
        let result = ListToolsResult {
            tools: self.list_tools(),
            next_cursor: None,
        };
        Ok(JsonRpcResponse::with_result(
            req.id,
            serde_json::to_value(result)?,
        ))
    }

    async fn handle_tools_call(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse> {
        let params = req
            .params
            .ok_or_else(|| Error::InvalidParameters("Missing tools/call params".into()))?;
        let call: ToolCall = serde_json::from_value(params)
            .map_err(|e| Error::InvalidParameters(format!("Invalid tools/call params: {e}")))?;

        if !self.list_tools().iter().any(|tool| tool.name == call.name) {
            return Err(Error::ToolNotFound(call.name));
        }

        let arguments = match call.arguments {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };

        let result = match self.call_tool(&call.name, arguments).await {
            Ok(content) => CallToolResult::success(content),
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool call failed");
                CallToolResult::error(e.to_string())
            }
        };

        Ok(JsonRpcResponse::with_result(
            req.id,
            serde_json::to_value(result)?,
        ))
    }
}

impl<T: Router> RouterExt for T {}
