use async_trait::async_trait;

use crate::{core::protocol::message::JsonRpcMessage, error::Result};

#[async_trait]
pub trait ServerTransport: Send {
    /// Next incoming message, or `None` once the peer has hung up.
    ///
    /// Must be cancel safe: the server polls this alongside its response queue.
    async fn read_message(&mut self) -> Option<Result<JsonRpcMessage>>;

    async fn write_message(&mut self, msg: JsonRpcMessage) -> Result<()>;

    /// Called once after the last response has been written.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
