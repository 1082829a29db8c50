use super::protocol::{
    CallToolParams, CallToolResult, JsonRpcMessage, RequestId, Tool, ToolContent,
};
use super::server::{McpServer, ToolHandler};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

struct EchoHandler;

#[async_trait]
impl ToolHandler for EchoHandler {
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let input = params
            .arguments
            .and_then(|args| args.get("text").and_then(|v| v.as_str()).map(String::from))
            .unwrap_or_default();

        Ok(CallToolResult {
            content: vec![ToolContent::Text { text: input }],
            is_error: None,
        })
    }
}

fn echo_tool() -> Tool {
    Tool {
        name: "echo".to_string(),
        description: Some("Echo the input".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {"text": {"type": "string"}},
            "required": ["text"]
        }),
    }
}

fn test_server() -> McpServer {
    let mut server = McpServer::new("test-server".to_string(), "0.1.0".to_string());
    server.register_tool(echo_tool(), EchoHandler);
    server
}

#[tokio::test]
async fn initialize_handshake() {
    let server = test_server();

    let request = json!({
        "jsonrpc": "2.0",
        "method": "initialize",
        "params": {
            "protocolVersion": "2024-11-05",
            "clientInfo": {"name": "test-client", "version": "1.0"},
            "capabilities": {}
        },
        "id": 1
    });

    let reply = server
        .handle_line(&request.to_string())
        .await
        .expect("initialize should produce a response");

    match reply {
        JsonRpcMessage::Response(response) => {
            assert_eq!(response.id, RequestId::Number(1));
            assert_eq!(
                response.result["serverInfo"]["name"],
                json!("test-server")
            );
            assert!(response.result["protocolVersion"].is_string());
        }
        other => panic!("Expected response, got {other:?}"),
    }
}

#[tokio::test]
async fn tools_list_includes_registered_tools() {
    let server = test_server();

    let request = json!({"jsonrpc": "2.0", "method": "tools/list", "id": 2});
    let reply = server
        .handle_line(&request.to_string())
        .await
        .expect("tools/list should produce a response");

    match reply {
        JsonRpcMessage::Response(response) => {
            let tools = response.result["tools"]
                .as_array()
                .expect("tools should be an array");
            assert_eq!(tools.len(), 1);
            assert_eq!(tools[0]["name"], json!("echo"));
        }
        other => panic!("Expected response, got {other:?}"),
    }
}

#[tokio::test]
async fn tool_call_dispatches_to_handler() {
    let server = test_server();

    let request = json!({
        "jsonrpc": "2.0",
        "method": "tools/call",
        "params": {"name": "echo", "arguments": {"text": "hello"}},
        "id": 3
    });
    let reply = server
        .handle_line(&request.to_string())
        .await
        .expect("tools/call should produce a response");

    match reply {
        JsonRpcMessage::Response(response) => {
            assert_eq!(response.result["content"][0]["text"], json!("hello"));
        }
        other => panic!("Expected response, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_tool_is_an_error() {
    let server = test_server();

    let request = json!({
        "jsonrpc": "2.0",
        "method": "tools/call",
        "params": {"name": "missing", "arguments": {}},
        "id": 4
    });
    let reply = server
        .handle_line(&request.to_string())
        .await
        .expect("tools/call should produce a response");

    assert!(matches!(reply, JsonRpcMessage::ErrorResponse(_)));
}

#[tokio::test]
async fn unknown_method_returns_method_not_found() {
    let server = test_server();

    let request = json!({"jsonrpc": "2.0", "method": "resources/list", "id": 5});
    let reply = server
        .handle_line(&request.to_string())
        .await
        .expect("unknown method should produce an error response");

    match reply {
        JsonRpcMessage::ErrorResponse(error) => {
            assert_eq!(error.error.code, -32601);
            assert_eq!(error.id, Some(RequestId::Number(5)));
        }
        other => panic!("Expected error response, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_json_returns_parse_error() {
    let server = test_server();

    let reply = server
        .handle_line("{not valid json")
        .await
        .expect("parse failure should produce an error response");

    match reply {
        JsonRpcMessage::ErrorResponse(error) => {
            assert_eq!(error.error.code, -32700);
            assert!(error.id.is_none());
        }
        other => panic!("Expected error response, got {other:?}"),
    }
}

#[tokio::test]
async fn notifications_produce_no_reply() {
    let server = test_server();

    let notification = json!({"jsonrpc": "2.0", "method": "initialized"});
    let reply = server.handle_line(&notification.to_string()).await;
    assert!(reply.is_none());
}
