//! MCP server core: stdio transport, message routing, tool registry

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::mcp::protocol::{
    CallToolParams, CallToolResult, Implementation, InitializeParams, InitializeResult,
    JsonRpcError, JsonRpcErrorResponse, JsonRpcMessage, JsonRpcRequest, JsonRpcResponse,
    ListToolsResult, MCP_VERSION, ServerCapabilities, Tool, ToolsCapability,
};

/// Tool handler trait for implementing tool execution
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult>;
}

struct RegisteredTool {
    definition: Tool,
    handler: Box<dyn ToolHandler>,
}

/// MCP server speaking JSON-RPC 2.0 over stdio.
///
/// Tools are registered before serving; the registry is immutable while
/// the read loop runs.
pub struct McpServer {
    server_info: Implementation,
    capabilities: ServerCapabilities,
    tools: HashMap<String, RegisteredTool>,
}

impl McpServer {
    #[inline]
    pub fn new(name: String, version: String) -> Self {
        Self {
            server_info: Implementation { name, version },
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list_changed: Some(false),
                },
            },
            tools: HashMap::new(),
        }
    }

    /// Register a tool and its handler
    #[inline]
    pub fn register_tool<H>(&mut self, tool: Tool, handler: H)
    where
        H: ToolHandler + 'static,
    {
        debug!("Registered tool: {}", tool.name);
        self.tools.insert(
            tool.name.clone(),
            RegisteredTool {
                definition: tool,
                handler: Box::new(handler),
            },
        );
    }

    /// Run the server over stdio until EOF
    #[inline]
    pub async fn serve_stdio(&self) -> Result<()> {
        info!("Starting MCP server with stdio transport");

        let stdin = io::stdin();
        let mut stdout = io::stdout();
        let mut reader = BufReader::new(stdin);

        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => {
                    info!("EOF reached, closing connection");
                    break;
                }
                Ok(_) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    if let Some(reply) = self.handle_line(trimmed).await {
                        let json = serde_json::to_string(&reply)?;
                        stdout.write_all(json.as_bytes()).await?;
                        stdout.write_all(b"\n").await?;
                        stdout.flush().await?;
                    }
                }
                Err(e) => {
                    error!("Error reading from stdin: {}", e);
                    break;
                }
            }
        }

        info!("MCP server stopped");
        Ok(())
    }

    /// Process one line of input; `None` means nothing is written back
    /// (notifications)
    #[inline]
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcMessage> {
        let raw: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to parse JSON: {}", e);
                return Some(JsonRpcMessage::ErrorResponse(JsonRpcErrorResponse::new(
                    JsonRpcError::parse_error(),
                    None,
                )));
            }
        };

        let message: JsonRpcMessage = match serde_json::from_value(raw) {
            Ok(message) => message,
            Err(e) => {
                error!("Message validation failed: {}", e);
                return Some(JsonRpcMessage::ErrorResponse(JsonRpcErrorResponse::new(
                    JsonRpcError::invalid_request(),
                    None,
                )));
            }
        };

        match message {
            JsonRpcMessage::Request(request) => Some(self.handle_request(request).await),
            JsonRpcMessage::Notification(notification) => {
                match notification.method.as_str() {
                    "initialized" | "notifications/initialized" => {
                        info!("Server ready to handle requests");
                    }
                    "notifications/cancelled" => {
                        debug!("Received cancellation notification");
                    }
                    other => warn!("Unknown notification method: {}", other),
                }
                None
            }
            JsonRpcMessage::Response(_) | JsonRpcMessage::ErrorResponse(_) => {
                warn!("Received unexpected response message from client");
                None
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcMessage {
        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params),
            "tools/list" => self.handle_list_tools(),
            "tools/call" => self.handle_call_tool(request.params).await,
            "ping" => Ok(serde_json::json!({})),
            _ => {
                return JsonRpcMessage::ErrorResponse(JsonRpcErrorResponse::new(
                    JsonRpcError::method_not_found(),
                    Some(request.id),
                ));
            }
        };

        match result {
            Ok(value) => JsonRpcMessage::Response(JsonRpcResponse::new(value, request.id)),
            Err(e) => {
                error!("Error handling request {}: {}", request.method, e);
                JsonRpcMessage::ErrorResponse(JsonRpcErrorResponse::new(
                    JsonRpcError::internal_error(Some(e.to_string())),
                    Some(request.id),
                ))
            }
        }
    }

    fn handle_initialize(&self, params: Option<Value>) -> Result<Value> {
        let params: InitializeParams = match params {
            Some(p) => serde_json::from_value(p)?,
            None => return Err(anyhow!("Initialize request missing parameters")),
        };

        info!("Client initialized: {}", params.client_info.name);

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: self.capabilities.clone(),
            server_info: self.server_info.clone(),
            instructions: Some("Knowledge base search MCP server".to_string()),
        };

        Ok(serde_json::to_value(result)?)
    }

    fn handle_list_tools(&self) -> Result<Value> {
        let tools: Vec<Tool> = self
            .tools
            .values()
            .map(|tool| tool.definition.clone())
            .collect();

        Ok(serde_json::to_value(ListToolsResult { tools })?)
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value> {
        let params: CallToolParams = match params {
            Some(p) => serde_json::from_value(p)?,
            None => return Err(anyhow!("Tool call request missing parameters")),
        };

        let tool = self
            .tools
            .get(&params.name)
            .ok_or_else(|| anyhow!("Tool not found: {}", params.name))?;

        let result = tool.handler.handle(params).await?;
        Ok(serde_json::to_value(result)?)
    }
}
