//! Core data types shared across the ingestion and retrieval pipeline.
//!
//! Mirrors the data model in spec §3: [`Document`], [`Chunk`], [`ChunkMetadata`],
//! [`CatalogEntry`]. The reference cache's own record type lives in
//! [`crate::cache`].

use serde::{Deserialize, Serialize};

/// Which of the three user-document ingestion flows (or the corpus flow)
/// produced a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    CorpusNorm,
    PlainText,
    MarkdownFile,
    PdfDerived,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::CorpusNorm => "corpus-norm",
            SourceKind::PlainText => "plain-text",
            SourceKind::MarkdownFile => "markdown-file",
            SourceKind::PdfDerived => "pdf-derived",
        }
    }
}

/// A logical unit of legal or user content (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Stable string id; deterministic when the caller omits one (see
    /// [`derive_document_id`]).
    pub document_id: String,
    pub source_name: String,
    pub source_kind: SourceKind,
    /// Unix seconds; monotonic for a given ingestion run.
    pub ingested_at: i64,
    pub canonical_url: Option<String>,
    pub relative_path: Option<String>,
    pub text: String,
}

/// Derive a deterministic `document_id` when the caller omits one (invariant 4).
///
/// `doc_{sha256(source_name ‖ text)[0:16]}`. Never derived from a timestamp —
/// ingestion must be replayable (spec §9, Design Notes: "Deterministic IDs").
pub fn derive_document_id(source_name: &str, text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(source_name.as_bytes());
    hasher.update(b"\0");
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    format!("doc_{}", hex_prefix(&digest, 16))
}

fn hex_prefix(bytes: &[u8], chars: usize) -> String {
    let mut s = String::with_capacity(chars);
    for b in bytes {
        if s.len() >= chars {
            break;
        }
        s.push_str(&format!("{:02x}", b));
    }
    s.truncate(chars);
    s
}

/// A slice of a document carrying content, embedding, and metadata — the unit
/// of indexing (spec §3). Immutable once persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// `{document_id}:{index}`.
    pub chunk_id: String,
    pub document_id: String,
    pub index: usize,
    pub content: String,
    /// Deterministic content hash of `content` (used for resume/dedup, not for
    /// `chunk_id` itself — `chunk_id` is positional so replace-semantics work).
    pub content_hash: String,
    pub metadata: ChunkMetadata,
    /// Populated once C2 has embedded the chunk; absent for chunks awaiting
    /// embedding.
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
}

pub fn make_chunk_id(document_id: &str, index: usize) -> String {
    format!("{}:{}", document_id, index)
}

/// Per-chunk metadata. Scalars only (string / int / bool) — no nested
/// structures, to preserve vector-store filter simplicity (spec §3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkMetadata {
    // Tenancy
    pub tenant_id: Option<String>,
    pub case_id: Option<String>,

    // Lineage
    pub document_id: String,
    pub chunk_id: String,
    pub source_name: String,
    pub ingested_at: i64,
    pub source_kind: String,

    // Legal-corpus fields
    pub jurisdiction: Option<String>,
    pub law_abbrev: Option<String>,
    pub norm_id: Option<String>,
    pub law_title: Option<String>,
    pub norm_title: Option<String>,
    pub level: Option<String>,
    pub paragraph_index: Option<i64>,
    pub parent_norm_id: Option<String>,

    // User-document fields
    pub tags_csv: Option<String>,
    /// Populated only when exactly one tag was supplied (single-token
    /// equality-filter escape hatch, spec §3).
    pub tag: Option<String>,

    /// Embedding model id recorded per chunk to detect mixed-model
    /// collections at query time (invariant 7).
    pub model_id: Option<String>,
}

impl ChunkMetadata {
    /// `case_id = ""` is treated as absent (SPEC_FULL open-question #3).
    pub fn normalize_case_id(case_id: Option<String>) -> Option<String> {
        case_id.filter(|s| !s.is_empty())
    }

    /// Build the `tags_csv` / `tag` pair from a tag list: sorted, lowercased,
    /// joined (spec §3).
    pub fn tags_from(tags: &[String]) -> (Option<String>, Option<String>) {
        if tags.is_empty() {
            return (None, None);
        }
        let mut normalized: Vec<String> = tags.iter().map(|t| t.to_lowercase()).collect();
        normalized.sort();
        normalized.dedup();
        let tag = if normalized.len() == 1 {
            Some(normalized[0].clone())
        } else {
            None
        };
        (Some(normalized.join(",")), tag)
    }
}

/// Offline discovery record (spec §3, C4). Read-only at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub source: String,
    pub document_id: String,
    pub canonical_url: String,
    pub document_type_prefix: String,
}
