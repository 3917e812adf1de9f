use futures::future::poll_fn;
use tokio::sync::mpsc;
use tower_service::Service;

use crate::{
    core::protocol::{
        constants::{INTERNAL_ERROR, INVALID_REQUEST, PARSE_ERROR},
        error::ErrorData,
        message::{JsonRpcError, JsonRpcMessage, JsonRpcRequest, JsonRpcResponse},
    },
    error::{BoxError, Error, Result},
    transport::traits::ServerTransport,
};

/// Drives a JSON-RPC service over a transport.
///
/// Each request is handled on its own task, so a slow call (a large download, a heavy
/// document) does not hold up the ones behind it. Responses are written back as they complete.
pub struct Server<S> {
    service: S,
}

impl<S> Server<S>
where
    S: Service<JsonRpcRequest, Response = JsonRpcResponse> + Send,
    S::Error: Into<BoxError> + Send + 'static,
    S::Future: Send + 'static,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub async fn run(self, mut transport: impl ServerTransport) -> Result<()> {
        let mut service = self.service;
        let (tx, mut rx) = mpsc::unbounded_channel::<JsonRpcMessage>();

        tracing::info!("Server started");
        loop {
            tokio::select! {
                Some(outgoing) = rx.recv() => {
                    transport.write_message(outgoing).await?;
                }
                incoming = transport.read_message() => match incoming {
                    Some(Ok(msg)) => Self::handle_message(&mut service, &tx, msg).await?,
                    Some(Err(e)) => Self::handle_error(&mut transport, e).await?,
                    None => break,
                },
            }
        }
        tracing::info!("Server transport closed, flushing in-flight responses");

        drop(tx);
        while let Some(outgoing) = rx.recv().await {
            transport.write_message(outgoing).await?;
        }

        transport.close().await
    }

    async fn handle_message(
        service: &mut S,
        tx: &mpsc::UnboundedSender<JsonRpcMessage>,
        msg: JsonRpcMessage,
    ) -> Result<()> {
        match msg {
            JsonRpcMessage::Request(request) => {
                Self::dispatch_request(service, tx.clone(), request).await?;
            }
            JsonRpcMessage::Notification(notification) => {
                tracing::debug!(method = %notification.method, "Received notification");
            }
            JsonRpcMessage::Response(_) | JsonRpcMessage::Error(_) => {
                tracing::debug!("Ignoring client response; server issues no requests");
            }
        }
        Ok(())
    }

    async fn dispatch_request(
        service: &mut S,
        tx: mpsc::UnboundedSender<JsonRpcMessage>,
        request: JsonRpcRequest,
    ) -> Result<()> {
        let id = request.id.clone();
        tracing::debug!(
            request_id = ?id,
            method = %request.method,
            "Received request"
        );

        poll_fn(|cx| service.poll_ready(cx))
            .await
            .map_err(|e| Error::System(e.into().to_string()))?;
        let future = service.call(request);

        tokio::spawn(async move {
            let response = match future.await {
                Ok(response) => response,
                Err(e) => {
                    let error_msg = e.into().to_string();
                    tracing::error!(error = %error_msg, "Request processing failed");
                    JsonRpcResponse::with_error(id, ErrorData::new(INTERNAL_ERROR, error_msg))
                }
            };

            tracing::debug!(
                response_id = ?response.id,
                is_error = response.error.is_some(),
                "Sending response"
            );

            if tx.send(JsonRpcMessage::Response(response)).is_err() {
                tracing::warn!("Response dropped: transport writer is gone");
            }
        });

        Ok(())
    }

    async fn handle_error(transport: &mut impl ServerTransport, e: Error) -> Result<()> {
        // A broken pipe ends the session rather than being echoed back.
        if let Error::Io(_) = e {
            return Err(e);
        }

        tracing::warn!(error = %e, "Rejected incoming message");
        let code = match e {
            Error::Json(_) | Error::InvalidMessage(_) | Error::Utf8(_) => PARSE_ERROR,
            Error::Protocol(_) => INVALID_REQUEST,
            _ => INTERNAL_ERROR,
        };

        let error_response =
            JsonRpcMessage::Error(JsonRpcError::new(None, ErrorData::new(code, e.to_string())));

        transport.write_message(error_response).await
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, duplex};

    use super::*;
    use crate::{
        core::{Tool, content::Content, protocol::capabilities::ServerCapabilities},
        router::{RouterService, capabilities::CapabilitiesBuilder, traits::Router},
        transport::byte::ByteTransport,
    };

    #[derive(Clone)]
    struct EchoRouter;

    #[async_trait]
    impl Router for EchoRouter {
        fn name(&self) -> String {
            "echo".to_string()
        }

        fn instructions(&self) -> String {
            "Echoes its input.".to_string()
        }

        fn capabilities(&self) -> ServerCapabilities {
            CapabilitiesBuilder::new().with_tools(false).build()
        }

        fn list_tools(&self) -> Vec<Tool> {
            vec![
                Tool::new("echo", "Echo the text argument", json!({ "type": "object" })),
                Tool::new("fail", "Always fails", json!({ "type": "object" })),
            ]
        }

        async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<Vec<Content>> {
            match tool_name {
                "echo" => Ok(vec![Content::text(
                    arguments["text"].as_str().unwrap_or_default(),
                )]),
                _ => Err(Error::NotFound {
                    file_id: "missing".into(),
                }),
            }
        }
    }

    struct Client {
        writer: tokio::io::DuplexStream,
        reader: BufReader<tokio::io::DuplexStream>,
    }

    impl Client {
        async fn call(&mut self, request: Value) -> Value {
            let mut line = serde_json::to_string(&request).unwrap();
            line.push('\n');
            self.writer.write_all(line.as_bytes()).await.unwrap();
            let mut response = String::new();
            self.reader.read_line(&mut response).await.unwrap();
            serde_json::from_str(&response).unwrap()
        }
    }

    fn start() -> Client {
        let (client_writer, server_reader) = duplex(64 * 1024);
        let (server_writer, client_reader) = duplex(64 * 1024);
        let server = Server::new(RouterService(EchoRouter));
        tokio::spawn(server.run(ByteTransport::new(server_reader, server_writer)));
        Client {
            writer: client_writer,
            reader: BufReader::new(client_reader),
        }
    }

    #[tokio::test]
    async fn initialize_reports_server_info_and_tools_capability() {
        let mut client = start();
        let response = client
            .call(json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}))
            .await;

        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["serverInfo"]["name"], "echo");
        assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(response["result"]["capabilities"]["tools"]["listChanged"], false);
    }

    #[tokio::test]
    async fn tool_call_success_and_tool_failure() {
        let mut client = start();

        let ok = client
            .call(json!({
                "jsonrpc": "2.0", "id": "a", "method": "tools/call",
                "params": {"name": "echo", "arguments": {"text": "hello"}}
            }))
            .await;
        assert_eq!(ok["id"], "a");
        assert_eq!(ok["result"]["content"][0]["text"], "hello");
        assert!(ok["result"].get("isError").is_none());

        let failed = client
            .call(json!({
                "jsonrpc": "2.0", "id": 2, "method": "tools/call",
                "params": {"name": "fail", "arguments": {}}
            }))
            .await;
        assert_eq!(failed["result"]["isError"], true);
        assert_eq!(
            failed["result"]["content"][0]["text"],
            "file 'missing' not found"
        );
    }

    #[tokio::test]
    async fn unknown_method_and_unknown_tool_are_protocol_errors() {
        let mut client = start();

        let response = client
            .call(json!({"jsonrpc": "2.0", "id": 3, "method": "resources/list"}))
            .await;
        assert_eq!(response["error"]["code"], -32601);

        let response = client
            .call(json!({
                "jsonrpc": "2.0", "id": 4, "method": "tools/call",
                "params": {"name": "nope"}
            }))
            .await;
        assert_eq!(response["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn malformed_line_gets_parse_error_then_server_keeps_serving() {
        let mut client = start();
        client.writer.write_all(b"{broken\n").await.unwrap();
        let mut line = String::new();
        client.reader.read_line(&mut line).await.unwrap();
        let error: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(error["error"]["code"], -32700);
        assert_eq!(error["id"], Value::Null);

        let response = client
            .call(json!({"jsonrpc": "2.0", "id": 5, "method": "ping"}))
            .await;
        assert_eq!(response["result"], json!({}));
    }

    #[tokio::test]
    async fn notifications_get_no_response() {
        let mut client = start();
        client
            .writer
            .write_all(b"{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n")
            .await
            .unwrap();

        // The next line read belongs to the ping, not the notification.
        let response = client
            .call(json!({"jsonrpc": "2.0", "id": 6, "method": "ping"}))
            .await;
        assert_eq!(response["id"], 6);
    }
}
