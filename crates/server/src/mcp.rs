//! JSON-RPC dispatcher and the stdio loop.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use {
    meetbridge_tools::ToolRegistry,
    serde_json::{Value, json},
    tokio::{
        io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
        sync::mpsc,
    },
    tracing::{debug, info, warn},
};

use crate::protocol::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, InitializeResult, JsonRpcRequest, JsonRpcResponse,
    METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION, ServerCapabilities, ServerInfo,
    ToolsCallParams, ToolsCallResult, ToolsCapability,
};

pub struct McpServer {
    registry: Arc<ToolRegistry>,
    debug: bool,
    initialized: AtomicBool,
}

impl McpServer {
    /// With `debug`, tool errors include their source chain.
    pub fn new(registry: Arc<ToolRegistry>, debug: bool) -> Self {
        Self {
            registry,
            debug,
            initialized: AtomicBool::new(false),
        }
    }

    /// Whether the client has sent `notifications/initialized`.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Relaxed)
    }

    /// Handle one raw message. Returns `None` for notifications.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "unparseable message");
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    PARSE_ERROR,
                    format!("parse error: {e}"),
                ));
            },
        };
        let id = value.get("id").cloned().unwrap_or(Value::Null);
        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(r) => r,
            Err(e) => {
                return Some(JsonRpcResponse::failure(
                    id,
                    INVALID_REQUEST,
                    format!("invalid request: {e}"),
                ));
            },
        };

        match request.id {
            None => {
                self.handle_notification(&request.method);
                None
            },
            Some(id) => Some(self.handle_request(id, &request.method, request.params).await),
        }
    }

    fn handle_notification(&self, method: &str) {
        match method {
            "notifications/initialized" => {
                self.initialized.store(true, Ordering::Relaxed);
                info!("client initialized");
            },
            other => debug!(method = other, "ignoring notification"),
        }
    }

    async fn handle_request(&self, id: Value, method: &str, params: Option<Value>) -> JsonRpcResponse {
        debug!(method, "request");
        match method {
            "initialize" => JsonRpcResponse::success(id, self.initialize_result()),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => {
                JsonRpcResponse::success(id, json!({ "tools": self.registry.list_schemas() }))
            },
            "tools/call" => {
                let params: ToolsCallParams =
                    match serde_json::from_value(params.unwrap_or(Value::Null)) {
                        Ok(p) => p,
                        Err(e) => {
                            return JsonRpcResponse::failure(
                                id,
                                INVALID_PARAMS,
                                format!("invalid tools/call params: {e}"),
                            );
                        },
                    };
                let result = self.call_tool(params).await;
                match serde_json::to_value(result) {
                    Ok(v) => JsonRpcResponse::success(id, v),
                    Err(e) => JsonRpcResponse::failure(id, INTERNAL_ERROR, e.to_string()),
                }
            },
            other => JsonRpcResponse::failure(id, METHOD_NOT_FOUND, format!("method not found: {other}")),
        }
    }

    fn initialize_result(&self) -> Value {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.into(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: ServerInfo {
                name: "meetbridge".into(),
                version: env!("CARGO_PKG_VERSION").into(),
            },
        };
        serde_json::to_value(result).unwrap_or_default()
    }

    async fn call_tool(&self, params: ToolsCallParams) -> ToolsCallResult {
        match self.registry.call(&params.name, params.arguments).await {
            Ok(value) => {
                let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
                ToolsCallResult::text(text, false)
            },
            Err(e) => {
                info!(tool = %params.name, kind = e.kind.as_str(), "tool call failed");
                ToolsCallResult::text(e.render(self.debug), true)
            },
        }
    }

    /// Serve newline-delimited JSON-RPC until `reader` hits EOF. Requests are
    /// handled concurrently; responses are written as they complete.
    pub async fn run<R, W>(self: Arc<Self>, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let writer_task = tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                writer.write_all(line.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
            Ok::<_, std::io::Error>(())
        });

        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim().to_string();
            if line.is_empty() {
                continue;
            }
            let server = Arc::clone(&self);
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(resp) = server.handle_line(&line).await {
                    match serde_json::to_string(&resp) {
                        Ok(out) => {
                            let _ = tx.send(out);
                        },
                        Err(e) => warn!(error = %e, "failed to encode response"),
                    }
                }
            });
        }
        debug!("stdin closed");
        drop(tx);

        writer_task
            .await
            .map_err(|e| std::io::Error::other(e.to_string()))?
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> McpServer {
        McpServer::new(Arc::new(ToolRegistry::new()), false)
    }

    #[tokio::test]
    async fn initialize_reports_tools_capability() {
        let resp = server()
            .handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
            .await
            .unwrap();
        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "meetbridge");
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn notifications_get_no_reply() {
        let server = server();
        assert!(!server.is_initialized());
        let resp = server
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(resp.is_none());
        assert!(server.is_initialized());
    }

    #[tokio::test]
    async fn protocol_errors() {
        let server = server();

        let resp = server.handle_line("{not json").await.unwrap();
        assert_eq!(resp.error.unwrap().code, PARSE_ERROR);

        let resp = server
            .handle_line(r#"{"jsonrpc":"2.0","id":7,"method":"resources/list"}"#)
            .await
            .unwrap();
        assert_eq!(resp.id, json!(7));
        assert_eq!(resp.error.unwrap().code, METHOD_NOT_FOUND);

        let resp = server
            .handle_line(r#"{"jsonrpc":"2.0","id":8,"method":"tools/call","params":{"arguments":{}}}"#)
            .await
            .unwrap();
        assert_eq!(resp.error.unwrap().code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn unknown_tool_is_a_tool_error() {
        let resp = server()
            .handle_line(
                r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"nope","arguments":{}}}"#,
            )
            .await
            .unwrap();
        let result = resp.result.unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(
            result["content"][0]["text"],
            "validation_error: unknown tool: nope"
        );
    }

    #[tokio::test]
    async fn ping_and_empty_tool_list() {
        let server = server();
        let resp = server
            .handle_line(r#"{"jsonrpc":"2.0","id":"a","method":"ping"}"#)
            .await
            .unwrap();
        assert_eq!(resp.result.unwrap(), json!({}));

        let resp = server
            .handle_line(r#"{"jsonrpc":"2.0","id":3,"method":"tools/list"}"#)
            .await
            .unwrap();
        assert_eq!(resp.result.unwrap(), json!({"tools": []}));
    }
}
