use clap::{Parser, Subcommand};
use knowledge_mcp::Result;
use knowledge_mcp::commands::{
    add_document, delete_document, init_config, list_documents, reindex, search, serve,
    show_config, show_stats,
};
use knowledge_mcp::reader::DocumentType;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "knowledge-mcp")]
#[command(about = "A document knowledge base with vector search and MCP server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or initialize the configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Ingest a document into the knowledge base
    Add {
        /// Path to the document to ingest
        file: PathBuf,
        /// Document type of the file
        #[arg(long, value_enum)]
        doc_type: DocumentType,
        /// Category to file the document under
        #[arg(long, default_value = "general")]
        category: String,
    },
    /// List documents in the knowledge base
    List {
        /// Filter by document type
        #[arg(long, value_enum)]
        doc_type: Option<DocumentType>,
        /// Filter by category
        #[arg(long)]
        category: Option<String>,
    },
    /// Delete a document and all of its chunks
    Delete {
        /// Document ID to delete
        document_id: String,
    },
    /// Search the knowledge base
    Search {
        /// Query text
        query: String,
        /// Maximum number of results
        #[arg(long, default_value_t = 5)]
        limit: usize,
        /// Minimum similarity score in [-1, 1]
        #[arg(long, default_value_t = 0.7)]
        threshold: f32,
        /// Filter by document type
        #[arg(long, value_enum)]
        doc_type: Option<DocumentType>,
        /// Filter by category
        #[arg(long)]
        category: Option<String>,
    },
    /// Delete and re-ingest every document with fresh embeddings
    Reindex,
    /// Show aggregate knowledge base statistics
    Stats,
    /// Start MCP server on stdio
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                init_config()?;
            }
        }
        Commands::Add {
            file,
            doc_type,
            category,
        } => {
            add_document(&file, doc_type, category).await?;
        }
        Commands::List { doc_type, category } => {
            list_documents(doc_type, category).await?;
        }
        Commands::Delete { document_id } => {
            delete_document(document_id).await?;
        }
        Commands::Search {
            query,
            limit,
            threshold,
            doc_type,
            category,
        } => {
            search(query, limit, threshold, doc_type, category).await?;
        }
        Commands::Reindex => {
            reindex().await?;
        }
        Commands::Stats => {
            show_stats().await?;
        }
        Commands::Serve => {
            serve().await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["knowledge-mcp", "list"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            matches!(parsed.command, Commands::List { .. });
        }
    }

    #[test]
    fn add_command_requires_doc_type() {
        let cli = Cli::try_parse_from(["knowledge-mcp", "add", "contract.pdf"]);
        assert!(cli.is_err());

        let cli = Cli::try_parse_from([
            "knowledge-mcp",
            "add",
            "contract.pdf",
            "--doc-type",
            "pdf",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Add {
                file,
                doc_type,
                category,
            } = parsed.command
            {
                assert_eq!(file, PathBuf::from("contract.pdf"));
                assert_eq!(doc_type, DocumentType::Pdf);
                assert_eq!(category, "general");
            }
        }
    }

    #[test]
    fn add_command_with_category() {
        let cli = Cli::try_parse_from([
            "knowledge-mcp",
            "add",
            "notes.txt",
            "--doc-type",
            "text",
            "--category",
            "contracts",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Add { category, .. } = parsed.command {
                assert_eq!(category, "contracts");
            }
        }
    }

    #[test]
    fn search_command_defaults() {
        let cli = Cli::try_parse_from(["knowledge-mcp", "search", "notice period"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Search {
                query,
                limit,
                threshold,
                doc_type,
                category,
            } = parsed.command
            {
                assert_eq!(query, "notice period");
                assert_eq!(limit, 5);
                assert!((threshold - 0.7).abs() < f32::EPSILON);
                assert_eq!(doc_type, None);
                assert_eq!(category, None);
            }
        }
    }

    #[test]
    fn invalid_doc_type_is_rejected() {
        let cli = Cli::try_parse_from([
            "knowledge-mcp",
            "add",
            "page.html",
            "--doc-type",
            "html",
        ]);
        assert!(cli.is_err());
    }

    #[test]
    fn serve_command() {
        let cli = Cli::try_parse_from(["knowledge-mcp", "serve"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            matches!(parsed.command, Commands::Serve);
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["knowledge-mcp", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["knowledge-mcp", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
