//! Query engine (C8).
//!
//! Two query modes over the vector store (C5): corpus search (no tenancy)
//! and user-document search (mandatory `tenant_id`). Both build a filter via
//! [`crate::filter::FilterBuilder`], embed the query text via C2, and return
//! ranked hits with a bounded excerpt — never full chunk content (spec
//! §4.8).

use std::sync::Arc;

use serde::Serialize;

use crate::embedding::{embed_query, EmbeddingProvider};
use crate::errors::{CoreError, ValidationError};
use crate::filter::FilterBuilder;
use crate::vector_store::{Collection, SearchHit, VectorStore};

const DEFAULT_EXCERPT_CHARS: usize = 500;
const MIN_QUERY_LEN: usize = 2;

#[derive(Debug, Serialize)]
pub struct RankedHit {
    pub chunk_id: String,
    pub document_id: String,
    pub similarity: f32,
    pub excerpt: String,
    pub jurisdiction: Option<String>,
    pub law_abbrev: Option<String>,
    pub norm_id: Option<String>,
    pub tag: Option<String>,
}

pub struct CorpusSearchInput {
    pub query: String,
    pub law_abbrev: Option<String>,
    pub level: Option<String>,
    pub n_results: i64,
}

pub struct UserDocumentSearchInput {
    pub query: String,
    pub tenant_id: String,
    pub case_id: Option<String>,
    pub document_id: Option<String>,
    pub source_name: Option<String>,
    pub tag: Option<String>,
    pub n_results: i64,
    pub excerpt_chars: Option<usize>,
}

pub async fn search_laws(
    store: &VectorStore,
    provider: &dyn EmbeddingProvider,
    input: CorpusSearchInput,
) -> Result<Vec<RankedHit>, CoreError> {
    validate_query(&input.query)?;

    let filter = FilterBuilder::new()
        .maybe_eq("law_abbrev", input.law_abbrev)
        .maybe_eq("level", input.level)
        .build();

    let query_vector = embed_query(provider, &input.query).await?;
    let hits = store
        .search(Collection::Corpus, &query_vector, input.n_results, filter.as_ref())
        .await?;

    Ok(rank(hits, DEFAULT_EXCERPT_CHARS))
}

pub async fn search_documents(
    store: &VectorStore,
    provider: &dyn EmbeddingProvider,
    input: UserDocumentSearchInput,
) -> Result<Vec<RankedHit>, CoreError> {
    validate_query(&input.query)?;
    if input.tenant_id.trim().is_empty() {
        return Err(ValidationError::Invalid {
            field: "tenant_id".to_string(),
            reason: "must not be empty".to_string(),
        }
        .into());
    }

    // tenant_id is always the first predicate C5 sees (spec §4.5/§4.8).
    let filter = FilterBuilder::new()
        .eq("tenant_id", input.tenant_id)
        .maybe_eq("case_id", input.case_id)
        .maybe_eq("document_id", input.document_id)
        .maybe_eq("source_name", input.source_name)
        .maybe_eq("tag", input.tag)
        .build()
        .expect("tenant_id predicate always present");

    let query_vector = embed_query(provider, &input.query).await?;
    let hits = store
        .search(Collection::UserDocuments, &query_vector, input.n_results, Some(&filter))
        .await?;

    Ok(rank(hits, input.excerpt_chars.unwrap_or(DEFAULT_EXCERPT_CHARS)))
}

fn validate_query(query: &str) -> Result<(), ValidationError> {
    if query.chars().count() < MIN_QUERY_LEN {
        return Err(ValidationError::Invalid {
            field: "query".to_string(),
            reason: format!("must be at least {MIN_QUERY_LEN} characters"),
        });
    }
    Ok(())
}

/// Descending by similarity, ties by lexicographic `chunk_id` — the vector
/// store already orders this way, this just shapes the public result and
/// truncates excerpts at a codepoint boundary.
fn rank(hits: Vec<SearchHit>, excerpt_chars: usize) -> Vec<RankedHit> {
    hits.into_iter()
        .map(|hit| RankedHit {
            chunk_id: hit.chunk_id,
            document_id: hit.document_id,
            similarity: hit.score,
            excerpt: hit.content.chars().take(excerpt_chars).collect(),
            jurisdiction: hit.metadata.jurisdiction,
            law_abbrev: hit.metadata.law_abbrev,
            norm_id: hit.metadata.norm_id,
            tag: hit.metadata.tag,
        })
        .collect()
}

/// Shared by both providers in [`Arc`] form when wired through C9 — kept
/// here to avoid every tool handler repeating the downcast.
pub type SharedEmbeddingProvider = Arc<dyn EmbeddingProvider>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_query() {
        assert!(validate_query("a").is_err());
        assert!(validate_query("ab").is_ok());
    }

    #[test]
    fn excerpt_is_truncated_at_codepoint_boundary() {
        let hits = vec![SearchHit {
            chunk_id: "c1".to_string(),
            document_id: "d1".to_string(),
            content: "ä".repeat(10),
            metadata: crate::models::ChunkMetadata::default(),
            score: 0.9,
        }];
        let ranked = rank(hits, 3);
        assert_eq!(ranked[0].excerpt.chars().count(), 3);
    }
}
