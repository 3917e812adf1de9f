use std::{
    pin::Pin,
    task::{Context, Poll},
};

use tower_service::Service;

use crate::{
    core::protocol::{
        constants::{INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND},
        error::ErrorData,
        message::{JsonRpcRequest, JsonRpcResponse},
    },
    error::{BoxError, Error},
    router::{ext::RouterExt, traits::Router},
};

/// Adapts a [`Router`] into a tower [`Service`] over JSON-RPC requests.
///
/// Handler errors are folded into JSON-RPC error responses here, so the returned future only
/// fails if the router itself cannot be reached.
#[derive(Clone)]
pub struct RouterService<T>(pub T);

impl<T> Service<JsonRpcRequest> for RouterService<T>
where
    T: Router + Clone + 'static,
{
    type Response = JsonRpcResponse;
    type Error = BoxError;
    type Future =
        Pin<Box<dyn Future<Output = core::result::Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<core::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: JsonRpcRequest) -> Self::Future {
        let this = self.0.clone();

        Box::pin(async move {
            let id = req.id.clone();
            let result = match req.method.as_str() {
                "initialize" => this.handle_initialize(req).await,
                "ping" => this.handle_ping(req).await,
                "tools/list" => this.handle_tools_list(req).await,
                "tools/call" => this.handle_tools_call(req).await,
                _ => Err(Error::MethodNotFound(req.method)),
            };

            Ok(result.unwrap_or_else(|e| JsonRpcResponse::with_error(id, error_data(&e))))
        })
    }
}

fn error_data(e: &Error) -> ErrorData {
    let code = match e {
        Error::MethodNotFound(_) => METHOD_NOT_FOUND,
        Error::ToolNotFound(_) | Error::InvalidParameters(_) => INVALID_PARAMS,
        _ => INTERNAL_ERROR,
    };
    ErrorData::new(code, e.to_string())
}
