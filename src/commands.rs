use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::Result;
use crate::config::Config;
use crate::knowledge::KnowledgeBase;
use crate::mcp::McpServer;
use crate::mcp::tools::{KnowledgeSearchHandler, KnowledgeStatsHandler, ListDocumentsHandler};
use crate::reader::DocumentType;

async fn open_knowledge_base() -> Result<KnowledgeBase> {
    let config = Config::load_default()?;
    KnowledgeBase::new(config).await
}

/// Ingest a document into the knowledge base
#[inline]
pub async fn add_document(
    file: &Path,
    document_type: DocumentType,
    category: String,
) -> Result<()> {
    info!("Adding document: {}", file.display());

    let mut knowledge = open_knowledge_base().await?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").expect("template is valid"),
    );
    spinner.set_message(format!("Ingesting {}", file.display()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = knowledge
        .add_document_from_path(file, document_type, &category)
        .await;
    spinner.finish_and_clear();

    let result = result?;

    println!("{} Document ingested", style("✓").green());
    println!("  Document ID: {}", result.document_id);
    println!("  Chunks created: {}", result.chunks_created);
    println!("  Stored at: {}", result.file_path.display());

    Ok(())
}

/// List documents currently in the knowledge base
#[inline]
pub async fn list_documents(
    document_type: Option<DocumentType>,
    category: Option<String>,
) -> Result<()> {
    let knowledge = open_knowledge_base().await?;

    let documents = knowledge
        .list_documents(document_type, category.as_deref())
        .await?;

    if documents.is_empty() {
        println!("No documents in the knowledge base yet.");
        println!("Use 'knowledge-mcp add <file> --doc-type <type>' to ingest one.");
        return Ok(());
    }

    println!("Documents ({} total):", documents.len());
    println!();

    for document in &documents {
        println!(
            "{} {} ({})",
            style("•").cyan(),
            document.file_name,
            document.document_id
        );
        println!("   Type: {}   Category: {}", document.document_type, document.category);
        println!(
            "   Chunks: {}   Content: {} bytes",
            document.chunk_count, document.total_content_length
        );
        println!(
            "   Added: {}",
            document.created_at.format("%Y-%m-%d %H:%M:%S")
        );
        println!();
    }

    Ok(())
}

/// Delete a document and all of its chunks
#[inline]
pub async fn delete_document(document_id: String) -> Result<()> {
    let mut knowledge = open_knowledge_base().await?;

    let chunks_deleted = knowledge.delete_document(&document_id).await?;

    println!(
        "{} Deleted document {} ({} chunks)",
        style("✓").green(),
        document_id,
        chunks_deleted
    );

    Ok(())
}

/// Search the knowledge base and print ranked matches
#[inline]
pub async fn search(
    query: String,
    limit: usize,
    threshold: f32,
    document_type: Option<DocumentType>,
    category: Option<String>,
) -> Result<()> {
    let knowledge = open_knowledge_base().await?;

    let matches = knowledge
        .search(&query, limit, threshold, document_type, category.as_deref())
        .await?;

    if matches.is_empty() {
        println!("No matches above threshold {threshold}.");
        return Ok(());
    }

    println!("Matches for '{query}' ({} total):", matches.len());
    println!();

    for (rank, result) in matches.iter().enumerate() {
        println!(
            "{}. {} {}  (score {:.3})",
            rank + 1,
            style(&result.file_name).bold(),
            style(format!("#{}", result.chunk_index)).dim(),
            result.similarity_score
        );

        let text = result.full_content.as_deref().unwrap_or(&result.content);
        let preview: String = text.chars().take(200).collect();
        println!("   {}", preview.replace('\n', " "));
        println!();
    }

    Ok(())
}

/// Delete and re-ingest every document from its stored file
#[inline]
pub async fn reindex() -> Result<()> {
    let mut knowledge = open_knowledge_base().await?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").expect("template is valid"),
    );
    spinner.set_message("Reindexing knowledge base");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = knowledge.reindex_all().await;
    spinner.finish_and_clear();

    let result = result?;

    println!("{} Reindex complete", style("✓").green());
    println!("  Documents processed: {}", result.documents_processed);
    println!("  Chunks created: {}", result.chunks_created);

    Ok(())
}

/// Print aggregate counts from both stores
#[inline]
pub async fn show_stats() -> Result<()> {
    let knowledge = open_knowledge_base().await?;

    let stats = knowledge.stats().await?;

    println!("Knowledge base statistics:");
    println!("  Documents: {}", stats.total_documents);
    println!("  Chunks: {}", stats.total_chunks);
    println!("  Vector records: {}", stats.vector_records);

    Ok(())
}

/// Print the active configuration
#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load_default()?;

    println!("Configuration ({}):", config.config_file_path().display());
    println!(
        "  Embedding endpoint: {}://{}:{}",
        config.embedding.protocol, config.embedding.host, config.embedding.port
    );
    println!("  Embedding model: {}", config.embedding.model);
    println!("  Embedding dimension: {}", config.embedding.embedding_dimension);
    println!("  Batch size: {}", config.embedding.batch_size);
    println!("  Chunk size: {} chars", config.chunking.chunk_size);
    println!("  Chunk overlap: {} chars", config.chunking.overlap_size);
    println!("  Metadata DB: {}", config.database_path().display());
    println!("  Vector DB: {}", config.vector_database_path().display());
    println!("  Stored files: {}", config.knowledge_dir_path().display());

    Ok(())
}

/// Write the default configuration file if none exists yet
#[inline]
pub fn init_config() -> Result<()> {
    let config = Config::load_default()?;

    if config.config_file_path().exists() {
        println!(
            "Configuration already exists at {}",
            config.config_file_path().display()
        );
        return Ok(());
    }

    config.save()?;
    println!(
        "{} Wrote default configuration to {}",
        style("✓").green(),
        config.config_file_path().display()
    );

    Ok(())
}

/// Start the MCP server on stdio
#[inline]
pub async fn serve() -> Result<()> {
    let knowledge = Arc::new(open_knowledge_base().await?);

    if let Err(e) = knowledge.health_check() {
        warn!("Embedding service is unreachable, searches will fail: {}", e);
    }

    let mut server = McpServer::new(
        env!("CARGO_PKG_NAME").to_string(),
        env!("CARGO_PKG_VERSION").to_string(),
    );

    server.register_tool(
        KnowledgeSearchHandler::tool_definition(),
        KnowledgeSearchHandler::new(Arc::clone(&knowledge)),
    );
    server.register_tool(
        ListDocumentsHandler::tool_definition(),
        ListDocumentsHandler::new(Arc::clone(&knowledge)),
    );
    server.register_tool(
        KnowledgeStatsHandler::tool_definition(),
        KnowledgeStatsHandler::new(Arc::clone(&knowledge)),
    );

    server.serve_stdio().await.map_err(crate::KnowledgeError::Other)
}
