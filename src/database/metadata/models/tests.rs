use super::*;

#[test]
fn content_length_is_byte_length() {
    let record = NewChunkRecord {
        document_id: "doc-1".to_string(),
        vector_id: "vec-1".to_string(),
        file_path: "/kb/general/doc-1_a.txt".to_string(),
        file_name: "a.txt".to_string(),
        document_type: DocumentType::Text,
        category: "general".to_string(),
        chunk_index: 0,
        total_chunks: 1,
        content: "héllo".to_string(),
    };

    // Multi-byte characters count as bytes, matching the stored column
    assert_eq!(record.content_length(), 6);
}

#[test]
fn document_type_serializes_lowercase() {
    let json = serde_json::to_string(&DocumentType::Pdf).expect("should serialize");
    assert_eq!(json, "\"pdf\"");

    let parsed: DocumentType = serde_json::from_str("\"docx\"").expect("should deserialize");
    assert_eq!(parsed, DocumentType::Docx);
}
