//! Typed error taxonomy (see spec §7).
//!
//! Each core module owns a narrow error enum for the failure modes its callers
//! need to branch on (retry vs. surface vs. record-and-continue). [`CoreError`]
//! aggregates them behind `#[from]` so the tool surface and CLI can convert any
//! of them into a JSON error body or an `anyhow::Error` without a manual match
//! at every call site.

use thiserror::Error;

/// Failures from the safe-path resolver (C1).
#[derive(Debug, Error)]
pub enum PathError {
    #[error("path must not be absolute")]
    Absolute,
    #[error("path contains a `..` component")]
    Traversal,
    #[error("resolved path escapes the allowlisted root")]
    Escape,
    #[error("allowlisted root is misconfigured: {0}")]
    RootMisconfigured(String),
    #[error("path is not a regular file")]
    NotRegularFile,
    #[error("suffix not in the caller's allowlist")]
    SuffixNotAllowed,
    #[error("file exceeds the size cap ({actual} > {limit} bytes)")]
    TooLarge { actual: u64, limit: u64 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures from the embedding gateway (C2).
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("no healthy embedding endpoint available")]
    Unavailable,
    #[error("embedding provider is disabled")]
    Disabled,
    #[error("embedding request failed: {0}")]
    Request(String),
}

/// Failures from the catalog store (C4).
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog source not found: {0}")]
    NotFound(String),
}

/// Failures from the vector store (C5).
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("user_documents operation missing required tenant_id scope")]
    MissingTenantScope,
    #[error("k must be in [1, 50], got {0}")]
    InvalidK(i64),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Failures from the reference cache (C6).
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("ref_id not found: {0}")]
    NotFound(String),
    #[error("cache is at capacity and cannot admit a new entry")]
    Full,
    #[error("permission denied for this operation")]
    PermissionDenied,
    #[error("partial eviction state detected for {0} — this is a bug")]
    PartialEviction(String),
}

/// Failures from the PDF-to-Markdown converter (C10).
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("converter failed: {0}")]
    Failed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures surfaced by the ingestion engine (C7) and query engine (C8) that
/// are not per-document (those are recorded in the result summary instead).
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("document text is whitespace-only")]
    EmptyDocument,
    #[error("chunk_size_chars must be >= 1")]
    InvalidChunkSize,
    #[error("chunk_overlap_chars must be < chunk_size_chars")]
    InvalidOverlap,
}

/// Validation failures surfaced synchronously at the tool boundary (C9).
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {reason}")]
    Invalid { field: String, reason: String },
}

/// Crate-wide error aggregate. The tool surface converts this into a
/// structured JSON error object; the CLI converts it into `anyhow::Error`.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    VectorStore(#[from] VectorStoreError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Convert(#[from] ConvertError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Stable error code used at the tool RPC boundary (see spec §7/§9).
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Path(PathError::Absolute) => "ErrPathAbsolute",
            CoreError::Path(PathError::Traversal) => "ErrPathTraversal",
            CoreError::Path(PathError::Escape) => "ErrPathEscape",
            CoreError::Path(PathError::RootMisconfigured(_)) => "ErrRootMisconfigured",
            CoreError::Path(PathError::NotRegularFile) => "ErrNotRegularFile",
            CoreError::Path(PathError::SuffixNotAllowed) => "ErrSuffixNotAllowed",
            CoreError::Path(PathError::TooLarge { .. }) => "ErrTooLarge",
            CoreError::Path(PathError::Io(_)) => "ErrRootMisconfigured",
            CoreError::Embedding(_) => "ErrEmbeddingUnavailable",
            CoreError::Catalog(_) => "ErrCatalogNotFound",
            CoreError::VectorStore(VectorStoreError::MissingTenantScope) => "ErrPermissionDenied",
            CoreError::VectorStore(_) => "ErrVectorStoreUnavailable",
            CoreError::Cache(CacheError::Full) => "ErrCacheFull",
            CoreError::Cache(CacheError::PermissionDenied) => "ErrPermissionDenied",
            CoreError::Cache(CacheError::NotFound(_)) => "ErrRefNotFound",
            CoreError::Cache(CacheError::PartialEviction(_)) => "ErrCacheInvariant",
            CoreError::Convert(_) => "ErrConverterFailed",
            CoreError::Ingest(_) => "ErrInvalidInput",
            CoreError::Validation(_) => "ErrInvalidInput",
        }
    }
}
