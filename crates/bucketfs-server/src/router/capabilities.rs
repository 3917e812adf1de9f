use crate::core::protocol::capabilities::{ServerCapabilities, ToolsCapability};

/// Capabilities advertised in the `initialize` result.
#[derive(Default)]
pub struct CapabilitiesBuilder {
    tools: Option<ToolsCapability>,
}

impl CapabilitiesBuilder {
    pub fn new() -> Self {
        Self { tools: None }
    }

    pub fn with_tools(mut self, list_changed: bool) -> Self {
        self.tools = Some(ToolsCapability {
            list_changed: Some(list_changed),
        });
        self
    }

    pub fn build(self) -> ServerCapabilities {
        ServerCapabilities { tools: self.tools }
    }
}
