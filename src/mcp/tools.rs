//! Knowledge base tool implementations exposed over MCP

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error};

use crate::knowledge::KnowledgeBase;
use crate::mcp::protocol::{CallToolParams, CallToolResult, Tool, ToolContent};
use crate::mcp::server::ToolHandler;
use crate::reader::DocumentType;

const DEFAULT_SEARCH_LIMIT: usize = 5;
const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.7;

/// Similarity search over the knowledge base
pub struct KnowledgeSearchHandler {
    knowledge: Arc<KnowledgeBase>,
}

/// Per-document summaries
pub struct ListDocumentsHandler {
    knowledge: Arc<KnowledgeBase>,
}

/// Aggregate store counts
pub struct KnowledgeStatsHandler {
    knowledge: Arc<KnowledgeBase>,
}

impl KnowledgeSearchHandler {
    #[inline]
    pub fn new(knowledge: Arc<KnowledgeBase>) -> Self {
        Self { knowledge }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "knowledge_search".to_string(),
            description: Some(
                "Search the document knowledge base by semantic similarity".to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query text"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results (default: 5)"
                    },
                    "similarity_threshold": {
                        "type": "number",
                        "description": "Minimum similarity score in [-1, 1] (default: 0.7)"
                    },
                    "document_type": {
                        "type": "string",
                        "enum": ["pdf", "docx", "text"],
                        "description": "Optional: restrict results to one document type"
                    },
                    "category": {
                        "type": "string",
                        "description": "Optional: restrict results to one category"
                    }
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for KnowledgeSearchHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let args = params.arguments.unwrap_or_default();

        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("Missing required parameter: query"))?;

        let limit = args
            .get("limit")
            .and_then(|v| v.as_u64())
            .map_or(DEFAULT_SEARCH_LIMIT, |v| v.max(1) as usize);

        let threshold = args
            .get("similarity_threshold")
            .and_then(|v| v.as_f64())
            .map_or(DEFAULT_SIMILARITY_THRESHOLD, |v| v as f32);

        let document_type = match args.get("document_type").and_then(|v| v.as_str()) {
            Some(tag) => match DocumentType::from_str(tag) {
                Ok(document_type) => Some(document_type),
                Err(e) => return Ok(error_result(e.to_string())),
            },
            None => None,
        };

        let category = args.get("category").and_then(|v| v.as_str());

        debug!(
            "knowledge_search: query='{}', limit={}, threshold={}",
            query, limit, threshold
        );

        match self
            .knowledge
            .search(query, limit, threshold, document_type, category)
            .await
        {
            Ok(matches) => {
                let text = serde_json::to_string_pretty(&json!({
                    "query": query,
                    "total_found": matches.len(),
                    "results": matches,
                }))?;
                Ok(CallToolResult {
                    content: vec![ToolContent::Text { text }],
                    is_error: None,
                })
            }
            Err(e) => {
                error!("knowledge_search failed: {}", e);
                Ok(error_result(format!("Search failed: {e}")))
            }
        }
    }
}

impl ListDocumentsHandler {
    #[inline]
    pub fn new(knowledge: Arc<KnowledgeBase>) -> Self {
        Self { knowledge }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "list_documents".to_string(),
            description: Some("List documents in the knowledge base".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "document_type": {
                        "type": "string",
                        "enum": ["pdf", "docx", "text"],
                        "description": "Optional: filter by document type"
                    },
                    "category": {
                        "type": "string",
                        "description": "Optional: filter by category"
                    }
                },
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for ListDocumentsHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let args = params.arguments.unwrap_or_default();

        let document_type = match args.get("document_type").and_then(|v| v.as_str()) {
            Some(tag) => match DocumentType::from_str(tag) {
                Ok(document_type) => Some(document_type),
                Err(e) => return Ok(error_result(e.to_string())),
            },
            None => None,
        };

        let category = args.get("category").and_then(|v| v.as_str());

        match self.knowledge.list_documents(document_type, category).await {
            Ok(documents) => {
                let text = serde_json::to_string_pretty(&json!({
                    "total_count": documents.len(),
                    "documents": documents,
                }))?;
                Ok(CallToolResult {
                    content: vec![ToolContent::Text { text }],
                    is_error: None,
                })
            }
            Err(e) => {
                error!("list_documents failed: {}", e);
                Ok(error_result(format!("Listing failed: {e}")))
            }
        }
    }
}

impl KnowledgeStatsHandler {
    #[inline]
    pub fn new(knowledge: Arc<KnowledgeBase>) -> Self {
        Self { knowledge }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "knowledge_stats".to_string(),
            description: Some("Aggregate counts for the knowledge base".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for KnowledgeStatsHandler {
    #[inline]
    async fn handle(&self, _params: CallToolParams) -> Result<CallToolResult> {
        match self.knowledge.stats().await {
            Ok(stats) => {
                let text = serde_json::to_string_pretty(&stats)?;
                Ok(CallToolResult {
                    content: vec![ToolContent::Text { text }],
                    is_error: None,
                })
            }
            Err(e) => {
                error!("knowledge_stats failed: {}", e);
                Ok(error_result(format!("Stats failed: {e}")))
            }
        }
    }
}

fn error_result(message: String) -> CallToolResult {
    CallToolResult {
        content: vec![ToolContent::Text { text: message }],
        is_error: Some(true),
    }
}
