//! MCP Server implementation
//!
//! Newline-delimited JSON-RPC over stdio. Requests are handled one at a
//! time: each line is processed to completion before the next is read.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::Result;
use crate::mcp::gateway::ToolGateway;
use crate::mcp::types::*;

/// MCP Server info
pub const SERVER_NAME: &str = "draft-email-server";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// MCP Server for drafting email replies
pub struct McpServer {
    /// Tool gateway
    gateway: Arc<ToolGateway>,

    /// Whether the client confirmed initialization
    initialized: bool,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(gateway: Arc<ToolGateway>) -> Self {
        Self {
            gateway,
            initialized: false,
        }
    }

    /// Whether the client has sent `notifications/initialized`
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Run the server on stdio
    pub async fn run_stdio(&mut self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.run(stdin, stdout).await
    }

    /// Serve requests from `reader` until EOF, writing responses to `writer`
    pub async fn run<R, W>(&mut self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!("{} {} listening on stdio", SERVER_NAME, SERVER_VERSION);

        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }

            let response = match std::str::from_utf8(&buf) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => self.handle_message(line.trim_end()).await,
                Err(e) => {
                    tracing::warn!("Dropping non UTF-8 line: {}", e);
                    Some(JsonRpcResponse::error(
                        None,
                        JsonRpcError::parse_error(e.to_string()),
                    ))
                }
            };

            if let Some(response) = response {
                let mut response_str = serde_json::to_string(&response)?;
                response_str.push('\n');
                writer.write_all(response_str.as_bytes()).await?;
                writer.flush().await?;
            }
        }

        tracing::info!("stdin closed, shutting down");
        Ok(())
    }

    /// Handle one incoming JSON-RPC message; `None` for notifications
    pub async fn handle_message(&mut self, message: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(message) {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!("Unparsable message: {}", e);
                return Some(JsonRpcResponse::error(
                    None,
                    JsonRpcError::parse_error(e.to_string()),
                ));
            }
        };

        tracing::debug!("<- {}", request.method);

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::error(
                request.id,
                JsonRpcError::invalid_request(format!(
                    "Unsupported jsonrpc version: {}",
                    request.jsonrpc
                )),
            ));
        }

        if request.is_notification() {
            if request.method == methods::INITIALIZED {
                self.initialized = true;
            } else {
                tracing::debug!("Ignoring notification {}", request.method);
            }
            return None;
        }

        let result = match request.method.as_str() {
            methods::INITIALIZE => serde_json::to_value(self.initialize_result()),
            methods::PING => Ok(serde_json::json!({})),
            methods::LIST_TOOLS => serde_json::to_value(ListToolsResult {
                tools: self.gateway.list_tools(),
            }),
            methods::CALL_TOOL => serde_json::to_value(self.handle_call_tool(&request).await),
            _ => {
                return Some(JsonRpcResponse::error(
                    request.id,
                    JsonRpcError::method_not_found(&request.method),
                ))
            }
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(request.id, value),
            Err(e) => JsonRpcResponse::error(request.id, JsonRpcError::internal_error(e.to_string())),
        })
    }

    fn initialize_result(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability::default()),
            },
        }
    }

    /// Handle call tool request
    async fn handle_call_tool(&self, request: &JsonRpcRequest) -> CallToolResult {
        let params: CallToolParams = match request.params.clone() {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return CallToolResult::error(format!("Invalid tool parameters: {}", e));
                }
            },
            None => return CallToolResult::error("Missing tool parameters"),
        };

        let arguments = match params.arguments {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };

        self.gateway.call_tool(&params.name, arguments).await
    }
}
