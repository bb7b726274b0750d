//! Request dispatch and the stdio message loop

use crate::protocol::{
    parse_params, JsonRpcError, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION,
    PROTOCOL_VERSION, SERVER_NAME, SERVER_VERSION, SUPPORTED_PROTOCOL_VERSIONS,
};
use crate::{resources, tools};
use contractnav_engine::SpecDiffer;
use contractnav_store::SpecStore;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitializeParams {
    #[serde(default)]
    protocol_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReadResourceParams {
    uri: String,
}

/// MCP server over a [`SpecStore`]
///
/// Each line on the input is one JSON-RPC message; each response is written
/// as one line. Nothing else is ever written to the output.
pub struct McpServer {
    store: SpecStore,
    differ: SpecDiffer,
    initialized: AtomicBool,
}

impl McpServer {
    pub fn new(store: SpecStore) -> Self {
        Self::with_differ(store, SpecDiffer::new())
    }

    pub fn with_differ(store: SpecStore, differ: SpecDiffer) -> Self {
        Self {
            store,
            differ,
            initialized: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &SpecStore {
        &self.store
    }

    /// Whether the client has sent `notifications/initialized`
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Relaxed)
    }

    /// Serve messages from `reader` until end of input
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            if let Some(response) = self.handle_message(&line).await {
                let mut frame = serde_json::to_string(&response)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
                frame.push('\n');
                writer.write_all(frame.as_bytes()).await?;
                writer.flush().await?;
            }
        }

        tracing::info!("Input closed, shutting down");
        Ok(())
    }

    /// Handle one raw message; `None` for notifications
    pub async fn handle_message(&self, line: &str) -> Option<JsonRpcResponse> {
        let message: Value = match serde_json::from_str(line) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "Unparseable message");
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    JsonRpcError::parse_error(e.to_string()),
                ));
            }
        };

        let id = message.get("id").cloned().unwrap_or(Value::Null);
        let request: JsonRpcRequest = match serde_json::from_value(message) {
            Ok(request) => request,
            Err(e) => {
                return Some(JsonRpcResponse::failure(
                    id,
                    JsonRpcError::invalid_request(e.to_string()),
                ))
            }
        };

        self.handle_request(request).await
    }

    /// Dispatch a parsed request
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.jsonrpc != JSONRPC_VERSION {
            return request.id.map(|id| {
                JsonRpcResponse::failure(
                    id,
                    JsonRpcError::invalid_request(format!(
                        "Unsupported jsonrpc version: {}",
                        request.jsonrpc
                    )),
                )
            });
        }

        tracing::debug!(method = %request.method, id = ?request.id, "Handling request");
        let outcome = self.dispatch(&request.method, &request.params).await;

        let id = match request.id {
            Some(id) => id,
            None => {
                if let Err(e) = outcome {
                    tracing::warn!(method = %request.method, error = %e, "Notification failed");
                }
                return None;
            }
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => {
                tracing::debug!(method = %request.method, error = %error, "Request failed");
                JsonRpcResponse::failure(id, error)
            }
        })
    }

    async fn dispatch(&self, method: &str, params: &Value) -> Result<Value, JsonRpcError> {
        match method {
            "initialize" => {
                let params: InitializeParams = parse_params(params)?;
                Ok(self.initialize(params.protocol_version.as_deref()))
            }
            "notifications/initialized" => {
                self.initialized.store(true, Ordering::Relaxed);
                tracing::info!("Client initialized");
                Ok(Value::Null)
            }
            "ping" => Ok(json!({})),
            "resources/list" => Ok(resources::list_resources(&self.store).await),
            "resources/templates/list" => Ok(resources::list_templates(&self.store)),
            "resources/read" => {
                let params: ReadResourceParams = parse_params(params)?;
                resources::read_resource(&self.store, &params.uri).await
            }
            "tools/list" => Ok(tools::list_tools()),
            "tools/call" => {
                let result = tools::call_tool(&self.store, &self.differ, params).await?;
                serde_json::to_value(result).map_err(|e| JsonRpcError::internal(e.to_string()))
            }
            "completion/complete" => resources::complete(&self.store, params).await,
            method if method.starts_with("notifications/") => Ok(Value::Null),
            other => Err(JsonRpcError::method_not_found(other)),
        }
    }

    fn initialize(&self, requested: Option<&str>) -> Value {
        let protocol_version = requested
            .filter(|version| SUPPORTED_PROTOCOL_VERSIONS.contains(version))
            .unwrap_or(PROTOCOL_VERSION);

        json!({
            "protocolVersion": protocol_version,
            "capabilities": {
                "resources": {"listChanged": false},
                "tools": {"listChanged": false},
                "completions": {}
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": SERVER_VERSION
            }
        })
    }
}
