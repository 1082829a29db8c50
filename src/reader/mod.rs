
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tracing::debug;

use crate::{KnowledgeError, Result};

/// Supported source document formats.
///
/// Each format carries an extension allow-list; an upload whose extension
/// falls outside the list for its declared type is rejected before any file
/// is stored.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, clap::ValueEnum,
)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Pdf,
    Docx,
    Text,
}

impl DocumentType {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::Pdf => "pdf",
            DocumentType::Docx => "docx",
            DocumentType::Text => "text",
        }
    }

    #[inline]
    pub fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            DocumentType::Pdf => &["pdf"],
            DocumentType::Docx => &["docx", "doc"],
            DocumentType::Text => &["txt", "md"],
        }
    }
}

impl std::fmt::Display for DocumentType {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentType {
    type Err = KnowledgeError;

    #[inline]
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(DocumentType::Pdf),
            "docx" => Ok(DocumentType::Docx),
            "text" => Ok(DocumentType::Text),
            other => Err(KnowledgeError::InvalidInput(format!(
                "Unsupported document type: {other}"
            ))),
        }
    }
}

/// Check a file name's extension against the allow-list for its declared
/// document type
#[inline]
pub fn validate_extension(document_type: DocumentType, file_name: &str) -> Result<()> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if document_type
        .allowed_extensions()
        .contains(&extension.as_str())
    {
        Ok(())
    } else {
        Err(KnowledgeError::InvalidInput(format!(
            "File extension '.{extension}' not allowed for type {document_type}"
        )))
    }
}

/// Extract the raw text of a stored document using the format-specific
/// reader for its type
#[inline]
pub fn read_document(path: &Path, document_type: DocumentType) -> Result<String> {
    debug!(
        "Reading {} document from {}",
        document_type,
        path.display()
    );

    match document_type {
        DocumentType::Text => read_text(path),
        DocumentType::Pdf => read_pdf(path),
        DocumentType::Docx => read_docx(path),
    }
}

fn read_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .map_err(|e| KnowledgeError::Reader(format!("Failed to read {}: {e}", path.display())))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn read_pdf(path: &Path) -> Result<String> {
    pdf_extract::extract_text(path)
        .map_err(|e| KnowledgeError::Reader(format!("Failed to extract PDF text: {e}")))
}

fn read_docx(path: &Path) -> Result<String> {
    let file = std::fs::File::open(path)
        .map_err(|e| KnowledgeError::Reader(format!("Failed to open {}: {e}", path.display())))?;

    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| KnowledgeError::Reader(format!("Not a valid DOCX archive: {e}")))?;

    let mut document = archive
        .by_name("word/document.xml")
        .map_err(|e| KnowledgeError::Reader(format!("DOCX missing word/document.xml: {e}")))?;

    let mut xml = String::new();
    document
        .read_to_string(&mut xml)
        .map_err(|e| KnowledgeError::Reader(format!("Failed to read DOCX body: {e}")))?;

    extract_docx_text(&xml)
}

/// Pull text runs (`w:t`) out of the DOCX body, turning paragraph ends
/// (`w:p`) into blank lines so the chunker sees paragraph boundaries
fn extract_docx_text(xml: &str) -> Result<String> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut output = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text_run = true,
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => output.push_str("\n\n"),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text_run => {
                let text = e
                    .unescape()
                    .map_err(|e| KnowledgeError::Reader(format!("Invalid DOCX text run: {e}")))?;
                output.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(KnowledgeError::Reader(format!(
                    "Failed to parse DOCX body: {e}"
                )));
            }
            _ => {}
        }
    }

    Ok(output)
}
