
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A chunk of document text ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChunk {
    /// The chunk text
    pub content: String,
    /// Position of this chunk within its document, contiguous from zero
    pub chunk_index: usize,
    /// Length of the chunk in characters
    pub char_count: usize,
}

/// Configuration for document chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Characters of trailing context carried into the next chunk
    pub overlap_size: usize,
    /// Chunks shorter than this are merged into their predecessor
    pub min_chunk_size: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 1500,
            overlap_size: 200,
            min_chunk_size: 50,
        }
    }
}

/// Split document text into embedding-ready chunks.
///
/// Paragraphs (blank-line separated) are packed up to `chunk_size`
/// characters; paragraphs that exceed the budget on their own are split at
/// whitespace boundaries. Whitespace-only input yields no chunks.
#[inline]
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<ContentChunk> {
    let paragraphs: Vec<&str> = text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    if paragraphs.is_empty() {
        return Vec::new();
    }

    let mut pieces: Vec<String> = Vec::new();
    let mut current = String::new();

    for paragraph in paragraphs {
        let paragraph_len = paragraph.chars().count();

        if paragraph_len > config.chunk_size {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
            }
            split_long_paragraph(paragraph, config, &mut pieces);
            continue;
        }

        let current_len = current.chars().count();
        let separator_len = if current.is_empty() { 0 } else { 2 };

        if current_len + separator_len + paragraph_len > config.chunk_size && !current.is_empty() {
            let overlap = tail_chars(&current, config.overlap_size);
            pieces.push(std::mem::take(&mut current));
            if !overlap.is_empty() {
                current.push_str(&overlap);
                current.push_str("\n\n");
            }
            current.push_str(paragraph);
        } else {
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(paragraph);
        }
    }

    if !current.is_empty() {
        pieces.push(current);
    }

    merge_trailing_fragment(&mut pieces, config);

    let chunks: Vec<ContentChunk> = pieces
        .into_iter()
        .enumerate()
        .map(|(chunk_index, content)| {
            let char_count = content.chars().count();
            ContentChunk {
                content,
                chunk_index,
                char_count,
            }
        })
        .collect();

    debug!(
        "Chunked {} chars of text into {} chunks",
        text.chars().count(),
        chunks.len()
    );

    chunks
}

/// Split a paragraph that exceeds the chunk budget on its own.
///
/// Cuts prefer a whitespace boundary; consecutive windows share
/// `overlap_size` characters of context.
fn split_long_paragraph(paragraph: &str, config: &ChunkingConfig, pieces: &mut Vec<String>) {
    let chars: Vec<char> = paragraph.chars().collect();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + config.chunk_size).min(chars.len());
        let cut = if end < chars.len() {
            find_whitespace_cut(&chars, start, end, config.min_chunk_size)
        } else {
            end
        };

        let piece: String = chars[start..cut].iter().collect();
        let piece = piece.trim().to_string();
        if !piece.is_empty() {
            pieces.push(piece);
        }

        if cut >= chars.len() {
            break;
        }

        let next = cut.saturating_sub(config.overlap_size);
        start = if next > start { next } else { cut };
    }
}

/// Backtrack from `end` to the nearest whitespace, keeping at least
/// `min_len` characters in the window.
fn find_whitespace_cut(chars: &[char], start: usize, end: usize, min_len: usize) -> usize {
    let floor = start + min_len.min(end - start);
    let mut cut = end;
    while cut > floor && !chars[cut - 1].is_whitespace() {
        cut -= 1;
    }
    if cut == floor { end } else { cut }
}

/// A trailing fragment below the minimum size folds into its predecessor
/// rather than becoming its own chunk. A lone fragment is kept as-is.
fn merge_trailing_fragment(pieces: &mut Vec<String>, config: &ChunkingConfig) {
    if pieces.len() < 2 {
        return;
    }

    let last_len = pieces
        .last()
        .map(|piece| piece.chars().count())
        .unwrap_or_default();

    if last_len < config.min_chunk_size {
        if let Some(fragment) = pieces.pop() {
            if let Some(previous) = pieces.last_mut() {
                previous.push_str("\n\n");
                previous.push_str(&fragment);
            }
        }
    }
}

fn tail_chars(text: &str, n: usize) -> String {
    if n == 0 {
        return String::new();
    }
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(n)).collect()
}
