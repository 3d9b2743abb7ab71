//! Black-box tests against the closed tool catalogue (C9), driven entirely
//! through `ToolRegistry::find` + `Tool::execute` the way the HTTP layer
//! (`server.rs`) itself dispatches, with a temp-dir-backed catalog snapshot
//! and an in-memory vector store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use juris_harness::cache::ReferenceCache;
use juris_harness::catalog::{self, Catalog};
use juris_harness::config::Config;
use juris_harness::embedding::EmbeddingProvider;
use juris_harness::errors::EmbeddingError;
use juris_harness::ingest::IngestionEngine;
use juris_harness::tools::{ToolContext, ToolRegistry};
use juris_harness::vector_store::VectorStore;

struct StubEmbedding;

#[async_trait]
impl EmbeddingProvider for StubEmbedding {
    fn model_name(&self) -> &str {
        "stub"
    }
    fn dims(&self) -> usize {
        3
    }
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
    }
}

async fn ctx_with_catalog(catalog: Arc<Catalog>) -> ToolContext {
    let vector_store = Arc::new(VectorStore::connect_in_memory().await.unwrap());
    let embedding: Arc<dyn EmbeddingProvider> = Arc::new(StubEmbedding);
    let ingestion = Arc::new(IngestionEngine::new(vector_store.clone(), embedding.clone(), 1200, 150, None, 4));
    ToolContext::new(
        Arc::new(Config::default()),
        vector_store,
        embedding,
        catalog,
        Arc::new(ReferenceCache::new(100, Duration::from_secs(3600))),
        ingestion,
    )
}

/// Every tool in the closed catalogue is reachable by name and advertises a
/// JSON-Schema-shaped parameter description (spec §4.9, agent discovery).
#[tokio::test]
async fn registry_exposes_the_full_closed_catalogue() {
    let registry = ToolRegistry::with_catalogue();
    assert_eq!(registry.len(), 12);

    let expected = [
        "list_available_documents",
        "search_laws",
        "get_law_by_id",
        "get_law_stats",
        "ingest_documents",
        "ingest_markdown_files",
        "ingest_pdf_files",
        "convert_files_to_markdown",
        "search_documents",
        "get_cached_result",
        "store_secret",
        "compute_with_secret",
    ];
    for name in expected {
        let tool = registry.find(name).unwrap_or_else(|| panic!("missing tool {name}"));
        assert!(tool.parameters_schema().is_object());
    }
    assert!(registry.find("delete_everything").is_none());
}

/// `list_available_documents` reads a catalog built by `catalog::load_from_dir`
/// from a discovery-snapshot directory (spec §4.4), reached entirely through
/// the tool surface rather than the `catalog` module directly.
#[tokio::test]
async fn list_available_documents_reads_loaded_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("njre.json"),
        r#"{"name":"NJRE","entries":[
            {"source":"NJRE","document_id":"NJRE0001","canonical_url":"https://example.test/1","document_type_prefix":"NJRE"},
            {"source":"NJRE","document_id":"NJRE0002","canonical_url":"https://example.test/2","document_type_prefix":"NJRE"}
        ]}"#,
    )
    .unwrap();

    let catalog = Arc::new(catalog::load_from_dir(dir.path()).unwrap());
    let ctx = ctx_with_catalog(catalog).await;
    let registry = ToolRegistry::with_catalogue();

    let tool = registry.find("list_available_documents").unwrap();
    let result = tool
        .execute(json!({ "source": "NJRE" }), &ctx)
        .await
        .unwrap();

    assert_eq!(result["total_items"], json!(2));
    assert!(result.get("ref_id").is_some());
}

/// An unknown source name surfaces as the stable `ErrCatalogNotFound` code,
/// the same code `server.rs` maps to HTTP 404.
#[tokio::test]
async fn list_available_documents_unknown_source_is_stable_error_code() {
    let ctx = ctx_with_catalog(Arc::new(Catalog::new())).await;
    let registry = ToolRegistry::with_catalogue();
    let tool = registry.find("list_available_documents").unwrap();

    let err = tool.execute(json!({ "source": "missing" }), &ctx).await.unwrap_err();
    assert_eq!(err.code(), "ErrCatalogNotFound");
}
