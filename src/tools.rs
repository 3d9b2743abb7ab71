//! Tool surface (C9).
//!
//! A closed set of operations agents call over the RPC boundary (spec §4.9,
//! §6). Every tool validates its own input against an ad-hoc schema and
//! returns a structured [`CoreError`] on failure — never a panic. Tools whose
//! result could be large wrap it through [`ToolContext::cache_list`] /
//! [`cache_text`](ToolContext::cache_text) so the wire value is always the
//! `{ref_id, preview, preview_strategy, ...}` envelope (spec §9,
//! "Cached-tool return typing"), never the raw payload.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::cache::{Actor, CachedValue, NamespacePolicy, Permission, PreviewStrategy, ReferenceCache};
use crate::catalog::Catalog;
use crate::config::Config;
use crate::convert;
use crate::embedding::EmbeddingProvider;
use crate::errors::{CoreError, ValidationError};
use crate::filter::FilterBuilder;
use crate::ingest::{IngestResult, IngestionEngine, PlainTextDocument};
use crate::models::SourceKind;
use crate::query::{self, CorpusSearchInput, UserDocumentSearchInput};
use crate::safe_path;
use crate::vector_store::{Collection, VectorStore};

const TOOLS_NAMESPACE: &str = "tools";
const SECRETS_NAMESPACE: &str = "secrets";
const DEFAULT_PREVIEW_PAGE_SIZE: usize = 50;
const DEFAULT_TEXT_PREVIEW_CHARS: usize = 2000;
const DEFAULT_SAMPLE_FIRST: usize = 10;
const DEFAULT_SAMPLE_STRIDE: usize = 1;
const DEFAULT_SAMPLE_TOKEN_BUDGET: usize = 4000;
const DEFAULT_N_RESULTS: i64 = 10;
const DEFAULT_CATALOG_LIMIT: usize = 200;

/// A single closed-catalogue operation. Implementations never panic on bad
/// input — they return [`ValidationError`] through [`CoreError`] instead.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON Schema-shaped parameter description, for agent discovery.
    fn parameters_schema(&self) -> Value;
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value, CoreError>;
}

/// Bridge from a tool's `execute` to every component it may need. Built once
/// at server startup and shared across concurrent tool invocations.
pub struct ToolContext {
    config: Arc<Config>,
    vector_store: Arc<VectorStore>,
    embedding: Arc<dyn EmbeddingProvider>,
    catalog: Arc<Catalog>,
    cache: Arc<ReferenceCache>,
    ingestion: Arc<IngestionEngine>,
}

impl ToolContext {
    pub fn new(
        config: Arc<Config>,
        vector_store: Arc<VectorStore>,
        embedding: Arc<dyn EmbeddingProvider>,
        catalog: Arc<Catalog>,
        cache: Arc<ReferenceCache>,
        ingestion: Arc<IngestionEngine>,
    ) -> Self {
        // Result caches are fully readable by either actor; the secrets
        // namespace is the one place an agent gets EXECUTE only (spec §4.9).
        cache.set_namespace_policy(
            TOOLS_NAMESPACE,
            NamespacePolicy {
                user_perms: Permission::Full,
                agent_perms: Permission::Full,
            },
        );
        cache.set_namespace_policy(
            SECRETS_NAMESPACE,
            NamespacePolicy {
                user_perms: Permission::Full,
                agent_perms: Permission::Execute,
            },
        );

        Self {
            config,
            vector_store,
            embedding,
            catalog,
            cache,
            ingestion,
        }
    }

    async fn cache_list(&self, items: Vec<Value>, strategy: PreviewStrategy, summary: Value) -> Result<Value, CoreError> {
        let total = items.len();
        let ref_id = self.cache.put(TOOLS_NAMESPACE, CachedValue::List(items), Actor::Agent, None).await?;
        let preview = self.cache.get_preview(&ref_id, Actor::Agent, strategy.clone()).await?;
        Ok(envelope(ref_id, preview.preview, strategy_name(&strategy), Some(total), summary))
    }

    async fn cache_text(&self, text: String, summary: Value) -> Result<Value, CoreError> {
        let ref_id = self.cache.put(TOOLS_NAMESPACE, CachedValue::Text(text), Actor::Agent, None).await?;
        let strategy = PreviewStrategy::Truncate { chars: DEFAULT_TEXT_PREVIEW_CHARS };
        let preview = self.cache.get_preview(&ref_id, Actor::Agent, strategy.clone()).await?;
        Ok(envelope(ref_id, preview.preview, strategy_name(&strategy), None, summary))
    }

    async fn cache_ingest_result(&self, result: IngestResult) -> Result<Value, CoreError> {
        let items: Vec<Value> = result
            .documents
            .iter()
            .map(|d| serde_json::to_value(d).expect("DocumentSummary serializes"))
            .collect();
        self.cache_list(
            items,
            PreviewStrategy::Paginate { page_size: DEFAULT_PREVIEW_PAGE_SIZE },
            json!({
                "total_chunks_created": result.total_chunks_created,
                "total_chunks_added": result.total_chunks_added,
            }),
        )
        .await
    }
}

/// Merge the cache envelope fields with per-tool summary fields (spec §6,
/// "every cached tool's wire return shape").
fn envelope(ref_id: String, preview: Value, strategy: &str, total_items: Option<usize>, summary: Value) -> Value {
    let mut out = json!({
        "ref_id": ref_id,
        "preview": preview,
        "preview_strategy": strategy,
    });
    if let Some(total) = total_items {
        out["total_items"] = json!(total);
    }
    if let (Value::Object(out_map), Value::Object(summary_map)) = (&mut out, summary) {
        out_map.extend(summary_map);
    }
    out
}

fn strategy_name(strategy: &PreviewStrategy) -> &'static str {
    match strategy {
        PreviewStrategy::Sample { .. } => "sample",
        PreviewStrategy::Truncate { .. } => "truncate",
        PreviewStrategy::Paginate { .. } => "paginate",
    }
}

/// `chunk_id` is `{document_id}:{index}` (see [`crate::models::make_chunk_id`]);
/// reconstructing a norm's full text needs chunks in positional order, not
/// lexicographic `chunk_id` order.
fn chunk_index(chunk_id: &str) -> usize {
    chunk_id.rsplit_once(':').and_then(|(_, idx)| idx.parse().ok()).unwrap_or(0)
}

fn require_str(params: &Value, field: &str) -> Result<String, CoreError> {
    params
        .get(field)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            ValidationError::Invalid {
                field: field.to_string(),
                reason: "must be a non-empty string".to_string(),
            }
            .into()
        })
}

fn opt_str(params: &Value, field: &str) -> Option<String> {
    params.get(field).and_then(|v| v.as_str()).map(str::to_string)
}

fn opt_i64(params: &Value, field: &str, default: i64) -> i64 {
    params.get(field).and_then(|v| v.as_i64()).unwrap_or(default)
}

fn opt_usize(params: &Value, field: &str, default: usize) -> usize {
    params.get(field).and_then(|v| v.as_u64()).map(|v| v as usize).unwrap_or(default)
}

fn opt_bool(params: &Value, field: &str, default: bool) -> bool {
    params.get(field).and_then(|v| v.as_bool()).unwrap_or(default)
}

fn str_array(params: &Value, field: &str) -> Vec<String> {
    params
        .get(field)
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

fn require_nonempty_str_array(params: &Value, field: &str) -> Result<Vec<String>, CoreError> {
    let values = str_array(params, field);
    if values.is_empty() {
        return Err(ValidationError::Invalid {
            field: field.to_string(),
            reason: "must be a non-empty array of strings".to_string(),
        }
        .into());
    }
    Ok(values)
}

fn parse_plain_text_documents(params: &Value) -> Result<Vec<PlainTextDocument>, CoreError> {
    let items = params.get("documents").and_then(|v| v.as_array()).filter(|a| !a.is_empty()).ok_or_else(|| {
        ValidationError::Invalid {
            field: "documents".to_string(),
            reason: "must be a non-empty array".to_string(),
        }
    })?;

    items
        .iter()
        .map(|item| {
            let source_name = item.get("source_name").and_then(|v| v.as_str()).ok_or_else(|| {
                ValidationError::Invalid {
                    field: "documents[].source_name".to_string(),
                    reason: "required".to_string(),
                }
            })?;
            let text = item.get("text").and_then(|v| v.as_str()).ok_or_else(|| ValidationError::Invalid {
                field: "documents[].text".to_string(),
                reason: "required".to_string(),
            })?;
            let case_id = item.get("case_id").and_then(|v| v.as_str()).map(str::to_string);
            let tags = item
                .get("tags")
                .and_then(|v| v.as_array())
                .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default();

            Ok(PlainTextDocument {
                source_name: source_name.to_string(),
                text: text.to_string(),
                source_kind: SourceKind::PlainText,
                case_id,
                tags,
            })
        })
        .collect::<Result<Vec<_>, ValidationError>>()
        .map_err(CoreError::from)
}

// ===== Catalog (C4) =====

pub struct ListAvailableDocumentsTool;

#[async_trait]
impl Tool for ListAvailableDocumentsTool {
    fn name(&self) -> &str {
        "list_available_documents"
    }

    fn description(&self) -> &str {
        "List catalog entries for a registered corpus source, optionally filtered by document-type prefix"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "source": { "type": "string" },
                "prefix": { "type": "string" },
                "offset": { "type": "integer", "default": 0 },
                "limit": { "type": "integer", "default": 200 }
            },
            "required": ["source"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value, CoreError> {
        let source = require_str(&params, "source")?;
        let prefix = opt_str(&params, "prefix");
        let offset = opt_usize(&params, "offset", 0);
        let limit = opt_usize(&params, "limit", DEFAULT_CATALOG_LIMIT);

        let page = ctx.catalog.list_available(&source, prefix.as_deref(), offset, limit)?;
        let items: Vec<Value> = page.items.iter().map(|e| serde_json::to_value(e).expect("CatalogEntry serializes")).collect();

        ctx.cache_list(
            items,
            PreviewStrategy::Paginate { page_size: DEFAULT_PREVIEW_PAGE_SIZE.min(limit.max(1)) },
            json!({
                "count_total": page.count_total,
                "count_filtered": page.count_filtered,
                "prefix_counts": page.prefix_counts,
            }),
        )
        .await
    }
}

// ===== Corpus (C5/C8) =====

pub struct SearchLawsTool;

#[async_trait]
impl Tool for SearchLawsTool {
    fn name(&self) -> &str {
        "search_laws"
    }

    fn description(&self) -> &str {
        "Semantic search over the bulk-ingested legal corpus"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" },
                "law_abbrev": { "type": "string" },
                "level": { "type": "string" },
                "n_results": { "type": "integer", "default": 10 }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value, CoreError> {
        let query = require_str(&params, "query")?;
        let law_abbrev = opt_str(&params, "law_abbrev");
        let level = opt_str(&params, "level");
        let n_results = opt_i64(&params, "n_results", DEFAULT_N_RESULTS);

        let hits = query::search_laws(
            &ctx.vector_store,
            ctx.embedding.as_ref(),
            CorpusSearchInput { query, law_abbrev, level, n_results },
        )
        .await?;

        let count = hits.len();
        let items: Vec<Value> = hits.iter().map(|h| serde_json::to_value(h).expect("RankedHit serializes")).collect();

        ctx.cache_list(
            items,
            PreviewStrategy::Sample {
                first: DEFAULT_SAMPLE_FIRST,
                stride: DEFAULT_SAMPLE_STRIDE,
                token_budget: DEFAULT_SAMPLE_TOKEN_BUDGET,
            },
            json!({ "count": count }),
        )
        .await
    }
}

pub struct GetLawByIdTool;

#[async_trait]
impl Tool for GetLawByIdTool {
    fn name(&self) -> &str {
        "get_law_by_id"
    }

    fn description(&self) -> &str {
        "Retrieve a norm's full text, reconstructed in order from its chunks"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "law_abbrev": { "type": "string" },
                "norm_id": { "type": "string" }
            },
            "required": ["law_abbrev", "norm_id"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value, CoreError> {
        let law_abbrev = require_str(&params, "law_abbrev")?;
        let norm_id = require_str(&params, "norm_id")?;

        let where_ = FilterBuilder::new()
            .eq("law_abbrev", law_abbrev.clone())
            .eq("norm_id", norm_id.clone())
            .build()
            .expect("eq predicates always present");

        let mut hits = ctx.vector_store.fetch_matching(Collection::Corpus, &where_).await?;
        if hits.is_empty() {
            return Err(ValidationError::Invalid {
                field: "norm_id".to_string(),
                reason: format!("no chunks found for {law_abbrev}/{norm_id}"),
            }
            .into());
        }
        hits.sort_by_key(|h| chunk_index(&h.chunk_id));

        let document_id = hits[0].document_id.clone();
        let jurisdiction = hits[0].metadata.jurisdiction.clone();
        let text = hits.iter().map(|h| h.content.as_str()).collect::<Vec<_>>().join("\n\n");

        ctx.cache_text(
            text,
            json!({
                "document_id": document_id,
                "law_abbrev": law_abbrev,
                "norm_id": norm_id,
                "jurisdiction": jurisdiction,
                "chunk_count": hits.len(),
            }),
        )
        .await
    }
}

pub struct GetLawStatsTool;

#[async_trait]
impl Tool for GetLawStatsTool {
    fn name(&self) -> &str {
        "get_law_stats"
    }

    fn description(&self) -> &str {
        "Chunk counts for the corpus, optionally scoped to one law"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "law_abbrev": { "type": "string" } }
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value, CoreError> {
        let law_abbrev = opt_str(&params, "law_abbrev");
        let where_ = FilterBuilder::new().maybe_eq("law_abbrev", law_abbrev.clone()).build();
        let count = ctx.vector_store.count(Collection::Corpus, where_.as_ref()).await?;
        Ok(json!({ "law_abbrev": law_abbrev, "chunk_count": count }))
    }
}

// ===== User documents (C5/C7/C8/C10) =====

pub struct IngestDocumentsTool;

#[async_trait]
impl Tool for IngestDocumentsTool {
    fn name(&self) -> &str {
        "ingest_documents"
    }

    fn description(&self) -> &str {
        "Chunk, embed, and upsert plain-text documents into the caller's tenant"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "tenant_id": { "type": "string" },
                "documents": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "source_name": { "type": "string" },
                            "text": { "type": "string" },
                            "case_id": { "type": "string" },
                            "tags": { "type": "array", "items": { "type": "string" } }
                        },
                        "required": ["source_name", "text"]
                    }
                }
            },
            "required": ["tenant_id", "documents"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value, CoreError> {
        let tenant_id = require_str(&params, "tenant_id")?;
        let documents = parse_plain_text_documents(&params)?;
        let result = ctx.ingestion.ingest_plain_text_documents(&tenant_id, documents).await?;
        ctx.cache_ingest_result(result).await
    }
}

pub struct IngestMarkdownFilesTool;

#[async_trait]
impl Tool for IngestMarkdownFilesTool {
    fn name(&self) -> &str {
        "ingest_markdown_files"
    }

    fn description(&self) -> &str {
        "Resolve Markdown files under the allowlisted root and ingest them into the caller's tenant"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "tenant_id": { "type": "string" },
                "paths": { "type": "array", "items": { "type": "string" } },
                "case_id": { "type": "string" },
                "tags": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["tenant_id", "paths"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value, CoreError> {
        let tenant_id = require_str(&params, "tenant_id")?;
        let paths = require_nonempty_str_array(&params, "paths")?;
        let case_id = opt_str(&params, "case_id");
        let tags = str_array(&params, "tags");

        let root = safe_path::ensure_root(&ctx.config.ingest_root.root)?;
        let result = ctx
            .ingestion
            .ingest_markdown_files(
                &tenant_id,
                &root,
                &paths,
                &ctx.config.ingest_root.allowed_suffixes,
                ctx.config.ingest_root.max_text_bytes,
                case_id,
                tags,
            )
            .await?;
        ctx.cache_ingest_result(result).await
    }
}

pub struct IngestPdfFilesTool;

#[async_trait]
impl Tool for IngestPdfFilesTool {
    fn name(&self) -> &str {
        "ingest_pdf_files"
    }

    fn description(&self) -> &str {
        "Convert PDFs under the allowlisted root to Markdown, then ingest them into the caller's tenant"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "tenant_id": { "type": "string" },
                "paths": { "type": "array", "items": { "type": "string" } },
                "case_id": { "type": "string" },
                "tags": { "type": "array", "items": { "type": "string" } },
                "replace": { "type": "boolean", "default": false }
            },
            "required": ["tenant_id", "paths"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value, CoreError> {
        let tenant_id = require_str(&params, "tenant_id")?;
        let paths = require_nonempty_str_array(&params, "paths")?;
        let case_id = opt_str(&params, "case_id");
        let tags = str_array(&params, "tags");
        let replace = opt_bool(&params, "replace", false);

        let root = safe_path::ensure_root(&ctx.config.ingest_root.root)?;
        let result = ctx
            .ingestion
            .ingest_pdf_files(
                &tenant_id,
                &root,
                &paths,
                &ctx.config.ingest_root.allowed_suffixes,
                ctx.config.ingest_root.max_converted_bytes,
                convert::DEFAULT_MAX_OUTPUT_CHARS,
                case_id,
                tags,
                replace,
            )
            .await?;
        ctx.cache_ingest_result(result).await
    }
}

pub struct ConvertFilesToMarkdownTool;

#[async_trait]
impl Tool for ConvertFilesToMarkdownTool {
    fn name(&self) -> &str {
        "convert_files_to_markdown"
    }

    fn description(&self) -> &str {
        "Convert PDFs under the allowlisted root to sibling Markdown files, without ingesting them"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "paths": { "type": "array", "items": { "type": "string" } },
                "overwrite": { "type": "boolean", "default": true }
            },
            "required": ["paths"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value, CoreError> {
        let paths = require_nonempty_str_array(&params, "paths")?;
        let overwrite = opt_bool(&params, "overwrite", true);
        let root = safe_path::ensure_root(&ctx.config.ingest_root.root)?;

        let mut items = Vec::with_capacity(paths.len());
        for rel_path in &paths {
            let outcome = match safe_path::resolve(
                &root,
                rel_path,
                &ctx.config.ingest_root.allowed_suffixes,
                ctx.config.ingest_root.max_converted_bytes,
            ) {
                Ok(safe) => match convert::convert_pdf_to_markdown(&safe, overwrite, convert::DEFAULT_MAX_OUTPUT_CHARS) {
                    Ok(conversion) => json!({
                        "input": rel_path,
                        "output_path": conversion.output_path,
                        "bytes_in": conversion.bytes_in,
                        "bytes_out": conversion.bytes_out,
                        "elapsed_ms": conversion.elapsed_ms,
                        "truncated": conversion.truncated,
                    }),
                    Err(e) => json!({ "input": rel_path, "error": e.to_string() }),
                },
                Err(e) => json!({ "input": rel_path, "error": e.to_string() }),
            };
            items.push(outcome);
        }

        ctx.cache_list(
            items,
            PreviewStrategy::Paginate { page_size: DEFAULT_PREVIEW_PAGE_SIZE },
            json!({ "count": paths.len() }),
        )
        .await
    }
}

pub struct SearchDocumentsTool;

#[async_trait]
impl Tool for SearchDocumentsTool {
    fn name(&self) -> &str {
        "search_documents"
    }

    fn description(&self) -> &str {
        "Semantic search over the caller's tenant-scoped user documents"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" },
                "tenant_id": { "type": "string" },
                "case_id": { "type": "string" },
                "document_id": { "type": "string" },
                "source_name": { "type": "string" },
                "tag": { "type": "string" },
                "n_results": { "type": "integer", "default": 10 },
                "excerpt_chars": { "type": "integer" }
            },
            "required": ["query", "tenant_id"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value, CoreError> {
        let query = require_str(&params, "query")?;
        let tenant_id = require_str(&params, "tenant_id")?;
        let case_id = opt_str(&params, "case_id");
        let document_id = opt_str(&params, "document_id");
        let source_name = opt_str(&params, "source_name");
        let tag = opt_str(&params, "tag");
        let n_results = opt_i64(&params, "n_results", DEFAULT_N_RESULTS);
        let excerpt_chars = params.get("excerpt_chars").and_then(|v| v.as_u64()).map(|v| v as usize);

        let hits = query::search_documents(
            &ctx.vector_store,
            ctx.embedding.as_ref(),
            UserDocumentSearchInput {
                query,
                tenant_id,
                case_id,
                document_id,
                source_name,
                tag,
                n_results,
                excerpt_chars,
            },
        )
        .await?;

        let count = hits.len();
        let items: Vec<Value> = hits.iter().map(|h| serde_json::to_value(h).expect("RankedHit serializes")).collect();

        ctx.cache_list(
            items,
            PreviewStrategy::Sample {
                first: DEFAULT_SAMPLE_FIRST,
                stride: DEFAULT_SAMPLE_STRIDE,
                token_budget: DEFAULT_SAMPLE_TOKEN_BUDGET,
            },
            json!({ "count": count }),
        )
        .await
    }
}

// ===== Cache (C6) =====

pub struct GetCachedResultTool;

#[async_trait]
impl Tool for GetCachedResultTool {
    fn name(&self) -> &str {
        "get_cached_result"
    }

    fn description(&self) -> &str {
        "Retrieve a page or bounded preview of a previously cached tool result"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "ref_id": { "type": "string" },
                "page": { "type": "integer" },
                "page_size": { "type": "integer" },
                "max_size": { "type": "integer" }
            },
            "required": ["ref_id"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value, CoreError> {
        let ref_id = require_str(&params, "ref_id")?;
        let page_size = opt_usize(&params, "page_size", DEFAULT_PREVIEW_PAGE_SIZE).max(1);

        if let Some(page) = params.get("page").and_then(|v| v.as_u64()) {
            let page = ctx.cache.get_page(&ref_id, Actor::Agent, page as usize, page_size).await?;
            let total_pages = (page.total_items + page.page_size - 1) / page.page_size;
            return Ok(json!({
                "ref_id": page.ref_id,
                "page": page.page,
                "page_size": page.page_size,
                "items": page.items,
                "total_items": page.total_items,
                "total_pages": total_pages,
            }));
        }

        let max_size = opt_usize(&params, "max_size", DEFAULT_TEXT_PREVIEW_CHARS);
        let preview = ctx.cache.get_preview(&ref_id, Actor::Agent, PreviewStrategy::Truncate { chars: max_size }).await?;
        Ok(json!({
            "ref_id": preview.ref_id,
            "preview": preview.preview,
            "preview_strategy": "truncate",
            "truncated": preview.truncated,
            "total_items": preview.total_items,
            "total_chars": preview.total_chars,
        }))
    }
}

// ===== Secret-style demonstration (C6 EXECUTE permission) =====

pub struct StoreSecretTool;

#[async_trait]
impl Tool for StoreSecretTool {
    fn name(&self) -> &str {
        "store_secret"
    }

    fn description(&self) -> &str {
        "Store a value under EXECUTE-only agent access; the raw value is never returned to an agent"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "value": { "type": "string" } },
            "required": ["value"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value, CoreError> {
        let value = require_str(&params, "value")?;
        let ref_id = ctx.cache.put(SECRETS_NAMESPACE, CachedValue::Text(value), Actor::User, None).await?;
        Ok(json!({ "ref_id": ref_id }))
    }
}

pub struct ComputeWithSecretTool;

#[async_trait]
impl Tool for ComputeWithSecretTool {
    fn name(&self) -> &str {
        "compute_with_secret"
    }

    fn description(&self) -> &str {
        "Compute a result from a stored secret via EXECUTE permission; the raw secret is never returned"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "secret_ref": { "type": "string" },
                "multiplier": { "type": "number" }
            },
            "required": ["secret_ref", "multiplier"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value, CoreError> {
        let secret_ref = require_str(&params, "secret_ref")?;
        let multiplier = params.get("multiplier").and_then(|v| v.as_f64()).ok_or_else(|| ValidationError::Invalid {
            field: "multiplier".to_string(),
            reason: "must be a number".to_string(),
        })?;

        let value = ctx.cache.resolve_for_execute(&secret_ref, Actor::Agent).await?;
        let CachedValue::Text(raw) = value else {
            return Err(ValidationError::Invalid {
                field: "secret_ref".to_string(),
                reason: "does not reference a scalar secret".to_string(),
            }
            .into());
        };
        let parsed: f64 = raw.trim().parse().map_err(|_| ValidationError::Invalid {
            field: "secret_ref".to_string(),
            reason: "stored value is not numeric".to_string(),
        })?;

        Ok(json!({ "result": parsed * multiplier }))
    }
}

// ===== Registry =====

/// The closed tool catalogue (spec §4.9/§6). No Lua/plugin extension point —
/// unlike the connector-style registries this grew from, the set of
/// operations this service exposes is fixed.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    pub fn with_catalogue() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ListAvailableDocumentsTool));
        registry.register(Box::new(SearchLawsTool));
        registry.register(Box::new(GetLawByIdTool));
        registry.register(Box::new(GetLawStatsTool));
        registry.register(Box::new(IngestDocumentsTool));
        registry.register(Box::new(IngestMarkdownFilesTool));
        registry.register(Box::new(IngestPdfFilesTool));
        registry.register(Box::new(ConvertFilesToMarkdownTool));
        registry.register(Box::new(SearchDocumentsTool));
        registry.register(Box::new(GetCachedResultTool));
        registry.register(Box::new(StoreSecretTool));
        registry.register(Box::new(ComputeWithSecretTool));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.iter().find(|t| t.name() == name).map(|t| t.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use async_trait::async_trait as async_trait_alias;
    use std::time::Duration;

    struct StubEmbedding;

    #[async_trait_alias]
    impl EmbeddingProvider for StubEmbedding {
        fn model_name(&self) -> &str {
            "stub"
        }
        fn dims(&self) -> usize {
            3
        }
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, crate::errors::EmbeddingError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
        }
    }

    async fn test_ctx() -> ToolContext {
        let vector_store = Arc::new(VectorStore::connect_in_memory().await.unwrap());
        let embedding: Arc<dyn EmbeddingProvider> = Arc::new(StubEmbedding);
        let ingestion = Arc::new(IngestionEngine::new(vector_store.clone(), embedding.clone(), 1200, 150, None, 4));
        ToolContext::new(
            Arc::new(Config::default()),
            vector_store,
            embedding,
            Arc::new(Catalog::new()),
            Arc::new(ReferenceCache::new(100, Duration::from_secs(3600))),
            ingestion,
        )
    }

    #[tokio::test]
    async fn ingest_then_search_round_trips_through_cache_envelope() {
        let ctx = test_ctx().await;
        let ingest_params = json!({
            "tenant_id": "T1",
            "documents": [{ "source_name": "a.txt", "text": "hello world, a real document" }]
        });
        let ingest_result = IngestDocumentsTool.execute(ingest_params, &ctx).await.unwrap();
        assert!(ingest_result.get("ref_id").is_some());
        assert_eq!(ingest_result["total_chunks_added"], json!(1));

        let search_params = json!({ "query": "hello", "tenant_id": "T1" });
        let search_result = SearchDocumentsTool.execute(search_params, &ctx).await.unwrap();
        assert_eq!(search_result["preview_strategy"], json!("sample"));
        assert_eq!(search_result["count"], json!(1));
    }

    #[tokio::test]
    async fn missing_required_field_yields_validation_error() {
        let ctx = test_ctx().await;
        let err = SearchDocumentsTool.execute(json!({ "query": "x" }), &ctx).await.unwrap_err();
        assert_eq!(err.code(), "ErrInvalidInput");
    }

    #[tokio::test]
    async fn compute_with_secret_never_returns_raw_value() {
        let ctx = test_ctx().await;
        let store_result = StoreSecretTool.execute(json!({ "value": "42" }), &ctx).await.unwrap();
        let ref_id = store_result["ref_id"].as_str().unwrap().to_string();

        let compute_result = ComputeWithSecretTool
            .execute(json!({ "secret_ref": ref_id, "multiplier": 2.0 }), &ctx)
            .await
            .unwrap();
        assert_eq!(compute_result["result"], json!(84.0));
        assert!(compute_result.get("value").is_none());
        assert_eq!(compute_result.as_object().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_cached_result_paginates() {
        let ctx = test_ctx().await;
        let ingest_params = json!({
            "tenant_id": "T1",
            "documents": (0..5).map(|i| json!({ "source_name": format!("d{i}.txt"), "text": format!("document body number {i}") })).collect::<Vec<_>>()
        });
        let result = IngestDocumentsTool.execute(ingest_params, &ctx).await.unwrap();
        let ref_id = result["ref_id"].as_str().unwrap().to_string();

        let page = GetCachedResultTool
            .execute(json!({ "ref_id": ref_id, "page": 1, "page_size": 2 }), &ctx)
            .await
            .unwrap();
        assert_eq!(page["items"].as_array().unwrap().len(), 2);
        assert_eq!(page["total_items"], json!(5));
    }
}
