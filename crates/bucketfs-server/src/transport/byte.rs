use async_trait::async_trait;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout,
};

use crate::{
    core::{protocol::message::JsonRpcMessage, utils::parse_json_rpc_message},
    error::{Error, Result},
    transport::traits::ServerTransport,
};

/// Newline-delimited JSON-RPC over standard input and output.
pub type StdioTransport = ByteTransport<Stdin, Stdout>;

/// A transport that reads and writes JSON-RPC messages over byte streams, one message per line.
pub struct ByteTransport<R, W> {
    reader: BufReader<R>,
    writer: W,
    // Partial line survives a cancelled read.
    buf: Vec<u8>,
}

impl<R, W> ByteTransport<R, W>
where
    R: AsyncRead,
    W: AsyncWrite,
{
    /// Creates a new `ByteTransport` with the given reader and writer.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::with_capacity(2 * 1024 * 1024, reader),
            writer,
            buf: Vec::with_capacity(64 * 1024),
        }
    }
}

impl StdioTransport {
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

#[async_trait]
impl<R, W> ServerTransport for ByteTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn read_message(&mut self) -> Option<Result<JsonRpcMessage>> {
        loop {
            let read = match self.reader.read_until(b'\n', &mut self.buf).await {
                Ok(n) => n,
                Err(e) => return Some(Err(Error::Io(e))),
            };

            if read == 0 && self.buf.is_empty() {
                tracing::info!("Client closed connection (read 0 bytes)");
                return None;
            }

            let bytes = std::mem::take(&mut self.buf);
            let line = match String::from_utf8(bytes) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(?e, "Invalid UTF-8 line");
                    return Some(Err(Error::Utf8(e)));
                }
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            return Some(parse_json_rpc_message(line));
        }
    }

    async fn write_message(&mut self, msg: JsonRpcMessage) -> Result<()> {
        let json = serde_json::to_string(&msg)?;
        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}
