use async_trait::async_trait;
use serde_json::Value;

use crate::{
    core::{Tool, content::Content, protocol::capabilities::ServerCapabilities},
    error::Result,
};

/// A set of tools served over MCP.
///
/// Errors returned from [`Router::call_tool`] are reported to the client as a tool result with
/// `isError: true`; only protocol faults become JSON-RPC errors.
#[async_trait]
pub trait Router: Send + Sync {
    fn name(&self) -> String;

    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    fn instructions(&self) -> String;

    fn capabilities(&self) -> ServerCapabilities;

    fn list_tools(&self) -> Vec<Tool>;

    async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<Vec<Content>>;
}
