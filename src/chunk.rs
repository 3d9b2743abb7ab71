//! Deterministic text chunker (C3, plain-text / Markdown mode).
//!
//! Splits document text strictly by character count with literal overlap
//! (spec §4.3). Unlike a paragraph-boundary chunker, this is intentionally
//! content-blind: the same `(text, chunk_size, overlap)` must produce
//! byte-identical chunks on every run and every process (testable property 3),
//! which a semantic splitter cannot promise.

use sha2::{Digest, Sha256};

use crate::errors::IngestError;
use crate::models::{make_chunk_id, Chunk, ChunkMetadata};

/// Split `text` into [`Chunk`]s of at most `chunk_size_chars` characters, with
/// each chunk after the first overlapping the previous one by the literal
/// last `chunk_overlap_chars` characters of that chunk (spec §4.3, S4).
///
/// `metadata_template` supplies the lineage/tenancy fields shared by every
/// chunk of this document; `chunk_id`/`document_id` are filled in per-chunk.
pub fn chunk_text(
    document_id: &str,
    text: &str,
    chunk_size_chars: usize,
    chunk_overlap_chars: usize,
    max_chunks_per_document: Option<usize>,
    metadata_template: &ChunkMetadata,
) -> Result<Vec<Chunk>, IngestError> {
    if chunk_size_chars == 0 {
        return Err(IngestError::InvalidChunkSize);
    }
    if chunk_overlap_chars >= chunk_size_chars {
        return Err(IngestError::InvalidOverlap);
    }
    if text.trim().is_empty() {
        return Err(IngestError::EmptyDocument);
    }

    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let stride = chunk_size_chars - chunk_overlap_chars;

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut index = 0usize;

    loop {
        let end = (start + chunk_size_chars).min(len);
        let content: String = chars[start..end].iter().collect();
        chunks.push(make_chunk(document_id, index, &content, metadata_template));
        index += 1;

        if end >= len {
            break;
        }
        if let Some(cap) = max_chunks_per_document {
            if index >= cap {
                break;
            }
        }
        start += stride;
    }

    Ok(chunks)
}

fn make_chunk(
    document_id: &str,
    index: usize,
    content: &str,
    metadata_template: &ChunkMetadata,
) -> Chunk {
    let chunk_id = make_chunk_id(document_id, index);

    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let content_hash = format!("{:x}", hasher.finalize());

    let mut metadata = metadata_template.clone();
    metadata.document_id = document_id.to_string();
    metadata.chunk_id = chunk_id.clone();

    Chunk {
        chunk_id,
        document_id: document_id.to_string(),
        index,
        content: content.to_string(),
        content_hash,
        metadata,
        embedding: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> ChunkMetadata {
        ChunkMetadata::default()
    }

    #[test]
    fn short_document_produces_exactly_one_chunk() {
        let chunks = chunk_text("doc1", "hello world", 1200, 150, None, &template()).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "hello world");
        assert_eq!(chunks[0].chunk_id, "doc1:0");
    }

    /// S4: 3000 chars, size=1200, overlap=150 => 3 chunks at [0:1200],
    /// [1050:2250], [2100:3000].
    #[test]
    fn s4_deterministic_chunk_boundaries() {
        let text: String = (0..3000).map(|i| (b'a' + (i % 26) as u8) as char).collect();
        let chunks = chunk_text("doc1", &text, 1200, 150, None, &template()).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chunk_id, "doc1:0");
        assert_eq!(chunks[1].chunk_id, "doc1:1");
        assert_eq!(chunks[2].chunk_id, "doc1:2");

        let expected0: String = text.chars().skip(0).take(1200).collect();
        let expected1: String = text.chars().skip(1050).take(1200).collect();
        let expected2: String = text.chars().skip(2100).take(900).collect();
        assert_eq!(chunks[0].content, expected0);
        assert_eq!(chunks[1].content, expected1);
        assert_eq!(chunks[2].content, expected2);
    }

    #[test]
    fn identical_input_is_byte_identical_across_runs() {
        let text = "Die Kündigungsfrist beträgt vier Wochen. ".repeat(50);
        let a = chunk_text("doc1", &text, 300, 40, None, &template()).unwrap();
        let b = chunk_text("doc1", &text, 300, 40, None, &template()).unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.content, y.content);
            assert_eq!(x.content_hash, y.content_hash);
        }
    }

    #[test]
    fn rejects_whitespace_only_document() {
        let err = chunk_text("doc1", "   \n\t  ", 1200, 150, None, &template());
        assert!(matches!(err, Err(IngestError::EmptyDocument)));
    }

    #[test]
    fn rejects_overlap_not_less_than_size() {
        let err = chunk_text("doc1", "hello", 100, 100, None, &template());
        assert!(matches!(err, Err(IngestError::InvalidOverlap)));
    }

    #[test]
    fn rejects_zero_size() {
        let err = chunk_text("doc1", "hello", 0, 0, None, &template());
        assert!(matches!(err, Err(IngestError::InvalidChunkSize)));
    }

    #[test]
    fn max_chunks_per_document_caps_output() {
        let text = "x".repeat(10_000);
        let chunks = chunk_text("doc1", &text, 100, 10, Some(3), &template()).unwrap();
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn handles_multibyte_characters_without_panicking() {
        let text = "§ 433 Kündigungsfrist ä ö ü ß".repeat(20);
        let chunks = chunk_text("doc1", &text, 50, 5, None, &template()).unwrap();
        assert!(!chunks.is_empty());
        for c in &chunks {
            assert!(c.content.chars().count() <= 50);
        }
    }
}
