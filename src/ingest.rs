//! Ingestion engine (C7).
//!
//! Five flows built from the same primitives — chunk (C3), embed (C2),
//! upsert (C5) — differing only in where the input comes from and which
//! collection it lands in (spec §4.7). Concurrency is bounded by a
//! semaphore over embedding calls; per-document failures are recorded in
//! the result rather than aborting the batch.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;

use crate::chunk::chunk_text;
use crate::embedding::EmbeddingProvider;
use crate::errors::{CoreError, IngestError};
use crate::filter::FilterBuilder;
use crate::html_corpus::parse_legal_html;
use crate::models::{derive_document_id, Chunk, ChunkMetadata, SourceKind};
use crate::safe_path;
use crate::vector_store::{Collection, VectorStore};

/// Per-document error messages are bounded so a batch result never carries
/// raw document content (spec §4.7).
const MAX_ERROR_CHARS: usize = 200;
const DEFAULT_WORKER_POOL: usize = 16;

/// Stamp `ingested_at`/`model_id` on chunks right before they are upserted —
/// never at template-construction time, since a document can sit queued
/// behind the embed semaphore for a while before this actually happens.
fn stamp_for_upsert(chunks: &mut [Chunk], model_name: &str) {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    for chunk in chunks {
        chunk.metadata.ingested_at = now;
        chunk.metadata.model_id = Some(model_name.to_string());
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub document_id: String,
    pub source_name: String,
    pub chunks_created: usize,
    pub chunks_added: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct IngestResult {
    pub documents: Vec<DocumentSummary>,
    pub total_chunks_created: usize,
    pub total_chunks_added: usize,
}

impl IngestResult {
    fn push(&mut self, summary: DocumentSummary) {
        self.total_chunks_created += summary.chunks_created;
        self.total_chunks_added += summary.chunks_added;
        self.documents.push(summary);
    }
}

/// An in-memory document bound for `user_documents`, as supplied to
/// `ingest_plain_text_documents` or produced internally by the
/// markdown/PDF flows.
pub struct PlainTextDocument {
    pub source_name: String,
    pub text: String,
    pub source_kind: SourceKind,
    pub case_id: Option<String>,
    pub tags: Vec<String>,
}

impl PlainTextDocument {
    pub fn plain_text(source_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            text: text.into(),
            source_kind: SourceKind::PlainText,
            case_id: None,
            tags: Vec::new(),
        }
    }
}

pub struct IngestionEngine {
    vector_store: Arc<VectorStore>,
    embedding: Arc<dyn EmbeddingProvider>,
    chunk_size_chars: usize,
    chunk_overlap_chars: usize,
    max_chunks_per_document: Option<usize>,
    embed_concurrency: Arc<Semaphore>,
}

impl IngestionEngine {
    pub fn new(
        vector_store: Arc<VectorStore>,
        embedding: Arc<dyn EmbeddingProvider>,
        chunk_size_chars: usize,
        chunk_overlap_chars: usize,
        max_chunks_per_document: Option<usize>,
        embed_concurrency: usize,
    ) -> Self {
        Self {
            vector_store,
            embedding,
            chunk_size_chars,
            chunk_overlap_chars,
            max_chunks_per_document,
            embed_concurrency: Arc::new(Semaphore::new(embed_concurrency.max(1))),
        }
    }

    // ===== Flow 1: corpus bulk ingest from a local HTML tree =====

    /// Walk `root` for `.html`/`.htm` files with a bounded worker pool
    /// (default 16), parsing each with C3 in legal mode and upserting into
    /// `corpus`. No tenant metadata is written. `law_abbrev`/`jurisdiction`
    /// apply to every file in this call — one call ingests one law corpus.
    pub async fn ingest_corpus_html(
        &self,
        root: &Path,
        declared_encoding: &str,
        law_abbrev: &str,
        jurisdiction: &str,
        worker_pool: Option<usize>,
    ) -> Result<IngestResult, CoreError> {
        let files = collect_html_files(root);
        let worker_pool = worker_pool.unwrap_or(DEFAULT_WORKER_POOL).max(1);
        let pool_semaphore = Arc::new(Semaphore::new(worker_pool));

        let mut handles = Vec::with_capacity(files.len());
        for file in files {
            let permit_pool = pool_semaphore.clone();
            let vector_store = self.vector_store.clone();
            let embedding = self.embedding.clone();
            let embed_concurrency = self.embed_concurrency.clone();
            let declared_encoding = declared_encoding.to_string();
            let law_abbrev = law_abbrev.to_string();
            let jurisdiction = jurisdiction.to_string();
            let chunk_size_chars = self.chunk_size_chars;
            let chunk_overlap_chars = self.chunk_overlap_chars;
            let max_chunks_per_document = self.max_chunks_per_document;

            handles.push(tokio::spawn(async move {
                let _permit = permit_pool.acquire_owned().await.expect("pool semaphore closed");
                ingest_one_corpus_file(
                    &file,
                    &declared_encoding,
                    &law_abbrev,
                    &jurisdiction,
                    vector_store,
                    embedding,
                    embed_concurrency,
                    chunk_size_chars,
                    chunk_overlap_chars,
                    max_chunks_per_document,
                )
                .await
            }));
        }

        let mut result = IngestResult::default();
        for handle in handles {
            match handle.await {
                Ok(summaries) => {
                    for summary in summaries {
                        result.push(summary);
                    }
                }
                Err(join_err) => {
                    result.push(DocumentSummary {
                        document_id: String::new(),
                        source_name: "<worker panicked>".to_string(),
                        chunks_created: 0,
                        chunks_added: 0,
                        errors: vec![truncate_error(&join_err.to_string())],
                    });
                }
            }
        }

        Ok(result)
    }

    // ===== Flow 2: plain-text ingest =====

    /// Chunk → embed → upsert each document into `user_documents`.
    /// Whitespace-only documents are rejected per-document, never failing
    /// the batch (spec §4.7).
    pub async fn ingest_plain_text_documents(
        &self,
        tenant_id: &str,
        documents: Vec<PlainTextDocument>,
    ) -> Result<IngestResult, CoreError> {
        let mut result = IngestResult::default();
        for doc in documents {
            let summary = self.ingest_one_plain_text(tenant_id, doc).await;
            result.push(summary);
        }
        Ok(result)
    }

    async fn ingest_one_plain_text(&self, tenant_id: &str, doc: PlainTextDocument) -> DocumentSummary {
        let document_id = derive_document_id(&doc.source_name, &doc.text);
        let (tags_csv, tag) = ChunkMetadata::tags_from(&doc.tags);

        let template = ChunkMetadata {
            tenant_id: Some(tenant_id.to_string()),
            case_id: ChunkMetadata::normalize_case_id(doc.case_id.clone()),
            document_id: document_id.clone(),
            source_name: doc.source_name.clone(),
            ingested_at: 0,
            source_kind: doc.source_kind.as_str().to_string(),
            tags_csv,
            tag,
            ..Default::default()
        };

        let chunks = match chunk_text(
            &document_id,
            &doc.text,
            self.chunk_size_chars,
            self.chunk_overlap_chars,
            self.max_chunks_per_document,
            &template,
        ) {
            Ok(chunks) => chunks,
            Err(IngestError::EmptyDocument) => {
                return DocumentSummary {
                    document_id,
                    source_name: doc.source_name,
                    chunks_created: 0,
                    chunks_added: 0,
                    errors: vec!["document text is whitespace-only".to_string()],
                };
            }
            Err(e) => {
                return DocumentSummary {
                    document_id,
                    source_name: doc.source_name,
                    chunks_created: 0,
                    chunks_added: 0,
                    errors: vec![truncate_error(&e.to_string())],
                };
            }
        };

        self.embed_and_upsert(Collection::UserDocuments, document_id, doc.source_name, chunks)
            .await
    }

    // ===== Flow 3: markdown-file ingest =====

    pub async fn ingest_markdown_files(
        &self,
        tenant_id: &str,
        root: &Path,
        paths: &[String],
        allowed_suffixes: &[String],
        size_cap: u64,
        case_id: Option<String>,
        tags: Vec<String>,
    ) -> Result<IngestResult, CoreError> {
        let mut documents = Vec::with_capacity(paths.len());
        let mut result = IngestResult::default();

        for rel_path in paths {
            match safe_path::resolve(root, rel_path, allowed_suffixes, size_cap) {
                Ok(safe) => {
                    let bytes = std::fs::read(&safe.absolute).unwrap_or_default();
                    let text = String::from_utf8_lossy(&bytes).into_owned();
                    documents.push(PlainTextDocument {
                        source_name: basename(&safe.absolute),
                        text,
                        source_kind: SourceKind::MarkdownFile,
                        case_id: case_id.clone(),
                        tags: tags.clone(),
                    });
                }
                Err(e) => {
                    result.push(DocumentSummary {
                        document_id: String::new(),
                        source_name: rel_path.clone(),
                        chunks_created: 0,
                        chunks_added: 0,
                        errors: vec![truncate_error(&e.to_string())],
                    });
                }
            }
        }

        let ingested = self.ingest_plain_text_documents(tenant_id, documents).await?;
        for summary in ingested.documents {
            result.push(summary);
        }
        Ok(result)
    }

    // ===== Flow 4: PDF ingest =====

    #[allow(clippy::too_many_arguments)]
    pub async fn ingest_pdf_files(
        &self,
        tenant_id: &str,
        root: &Path,
        paths: &[String],
        allowed_suffixes: &[String],
        size_cap: u64,
        max_output_chars: usize,
        case_id: Option<String>,
        tags: Vec<String>,
        replace: bool,
    ) -> Result<IngestResult, CoreError> {
        let mut result = IngestResult::default();

        for rel_path in paths {
            let safe = match safe_path::resolve(root, rel_path, allowed_suffixes, size_cap) {
                Ok(safe) => safe,
                Err(e) => {
                    push_error(&mut result, rel_path, &e.to_string());
                    continue;
                }
            };

            let md_path = match crate::convert::convert_pdf_to_markdown(&safe, true, max_output_chars) {
                Ok(conversion) => conversion.output_path,
                Err(e) => {
                    push_error(&mut result, rel_path, &e.to_string());
                    continue;
                }
            };

            let bytes = std::fs::read(&md_path).unwrap_or_default();
            let text = String::from_utf8_lossy(&bytes).into_owned();
            let source_name = basename(&safe.absolute);
            let document_id = derive_document_id(&source_name, &text);

            let summary = if replace {
                self.replace_one_pdf_document(
                    tenant_id,
                    document_id,
                    source_name,
                    text,
                    case_id.clone(),
                    tags.clone(),
                )
                .await
            } else {
                self.ingest_one_plain_text(
                    tenant_id,
                    PlainTextDocument {
                        source_name,
                        text,
                        source_kind: SourceKind::PdfDerived,
                        case_id: case_id.clone(),
                        tags: tags.clone(),
                    },
                )
                .await
            };
            result.push(summary);
        }

        Ok(result)
    }

    /// Replace-on-reingest path for flow 4: rewrites a document's chunks
    /// atomically (delete + upsert in one transaction) rather than the
    /// resume/skip-existing path `ingest_one_plain_text` takes, since a
    /// user-requested replace means "this document changed, discard the old
    /// chunks" rather than "this document might already be ingested" (spec
    /// §5 open-question #1).
    #[allow(clippy::too_many_arguments)]
    async fn replace_one_pdf_document(
        &self,
        tenant_id: &str,
        document_id: String,
        source_name: String,
        text: String,
        case_id: Option<String>,
        tags: Vec<String>,
    ) -> DocumentSummary {
        let (tags_csv, tag) = ChunkMetadata::tags_from(&tags);
        let case_id = ChunkMetadata::normalize_case_id(case_id);

        let template = ChunkMetadata {
            tenant_id: Some(tenant_id.to_string()),
            case_id: case_id.clone(),
            document_id: document_id.clone(),
            source_name: source_name.clone(),
            ingested_at: 0,
            source_kind: SourceKind::PdfDerived.as_str().to_string(),
            tags_csv,
            tag,
            ..Default::default()
        };

        let mut chunks = match chunk_text(
            &document_id,
            &text,
            self.chunk_size_chars,
            self.chunk_overlap_chars,
            self.max_chunks_per_document,
            &template,
        ) {
            Ok(chunks) => chunks,
            Err(IngestError::EmptyDocument) => {
                return DocumentSummary {
                    document_id,
                    source_name,
                    chunks_created: 0,
                    chunks_added: 0,
                    errors: vec!["document text is whitespace-only".to_string()],
                };
            }
            Err(e) => {
                return DocumentSummary {
                    document_id,
                    source_name,
                    chunks_created: 0,
                    chunks_added: 0,
                    errors: vec![truncate_error(&e.to_string())],
                };
            }
        };
        let chunks_created = chunks.len();

        {
            let _permit = self.embed_concurrency.acquire().await.expect("embed semaphore closed");
            let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
            match self.embedding.embed_batch(&texts).await {
                Ok(vectors) => {
                    for (chunk, vector) in chunks.iter_mut().zip(vectors.into_iter()) {
                        chunk.embedding = Some(vector);
                    }
                    stamp_for_upsert(&mut chunks, self.embedding.model_name());
                }
                Err(e) => {
                    return DocumentSummary {
                        document_id,
                        source_name,
                        chunks_created,
                        chunks_added: 0,
                        errors: vec![truncate_error(&e.to_string())],
                    };
                }
            }
        }

        let where_ = FilterBuilder::new()
            .eq("tenant_id", tenant_id)
            .maybe_eq("case_id", case_id)
            .eq("document_id", document_id.clone())
            .build()
            .expect("tenant_id predicate always present");

        match self.vector_store.replace(Collection::UserDocuments, &where_, &chunks).await {
            Ok(()) => DocumentSummary {
                document_id,
                source_name,
                chunks_created,
                chunks_added: chunks_created,
                errors: Vec::new(),
            },
            Err(e) => DocumentSummary {
                document_id,
                source_name,
                chunks_created,
                chunks_added: 0,
                errors: vec![truncate_error(&e.to_string())],
            },
        }
    }

    async fn embed_and_upsert(
        &self,
        collection: Collection,
        document_id: String,
        source_name: String,
        mut chunks: Vec<Chunk>,
    ) -> DocumentSummary {
        let chunks_created = chunks.len();

        let existing = self
            .vector_store
            .existing_chunk_ids(collection, &document_id)
            .await
            .unwrap_or_default();
        chunks.retain(|c| !existing.contains(&c.chunk_id));

        if chunks.is_empty() {
            return DocumentSummary {
                document_id,
                source_name,
                chunks_created,
                chunks_added: 0,
                errors: Vec::new(),
            };
        }

        let _permit = self.embed_concurrency.acquire().await.expect("embed semaphore closed");
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        match self.embedding.embed_batch(&texts).await {
            Ok(vectors) => {
                for (chunk, vector) in chunks.iter_mut().zip(vectors.into_iter()) {
                    chunk.embedding = Some(vector);
                }
                stamp_for_upsert(&mut chunks, self.embedding.model_name());
                let chunks_added = chunks.len();
                match self.vector_store.upsert(collection, &chunks).await {
                    Ok(()) => DocumentSummary {
                        document_id,
                        source_name,
                        chunks_created,
                        chunks_added,
                        errors: Vec::new(),
                    },
                    Err(e) => DocumentSummary {
                        document_id,
                        source_name,
                        chunks_created,
                        chunks_added: 0,
                        errors: vec![truncate_error(&e.to_string())],
                    },
                }
            }
            Err(e) => DocumentSummary {
                document_id,
                source_name,
                chunks_created,
                chunks_added: 0,
                errors: vec![truncate_error(&e.to_string())],
            },
        }
    }

    /// Flow 5: ingest a single externally-rendered document into
    /// `user_documents`, on explicit user action. Never bulk-crawls (spec
    /// §4.7) — the caller supplies exactly one already-rendered document.
    pub async fn ingest_rendered_document(
        &self,
        tenant_id: &str,
        jurisdiction: &str,
        source_name: String,
        text: String,
    ) -> DocumentSummary {
        self.ingest_one_plain_text(
            tenant_id,
            PlainTextDocument {
                source_name: format!("{jurisdiction}:{source_name}"),
                text,
                source_kind: SourceKind::PlainText,
                case_id: None,
                tags: vec![jurisdiction.to_string()],
            },
        )
        .await
    }
}

#[allow(clippy::too_many_arguments)]
async fn ingest_one_corpus_file(
    file: &Path,
    declared_encoding: &str,
    law_abbrev: &str,
    jurisdiction: &str,
    vector_store: Arc<VectorStore>,
    embedding: Arc<dyn EmbeddingProvider>,
    embed_concurrency: Arc<Semaphore>,
    chunk_size_chars: usize,
    chunk_overlap_chars: usize,
    max_chunks_per_document: Option<usize>,
) -> Vec<DocumentSummary> {
    let raw = match std::fs::read(file) {
        Ok(bytes) => bytes,
        Err(e) => {
            return vec![DocumentSummary {
                document_id: String::new(),
                source_name: file.display().to_string(),
                chunks_created: 0,
                chunks_added: 0,
                errors: vec![truncate_error(&e.to_string())],
            }]
        }
    };

    let parsed = parse_legal_html(&raw, declared_encoding, law_abbrev, jurisdiction);
    let mut summaries = Vec::with_capacity(parsed.len());

    for doc in parsed {
        let chunks = match chunk_text(
            &doc.document_id,
            &doc.text,
            chunk_size_chars,
            chunk_overlap_chars,
            max_chunks_per_document,
            &doc.metadata,
        ) {
            Ok(chunks) => chunks,
            Err(e) => {
                summaries.push(DocumentSummary {
                    document_id: doc.document_id,
                    source_name: doc.metadata.source_name,
                    chunks_created: 0,
                    chunks_added: 0,
                    errors: vec![truncate_error(&e.to_string())],
                });
                continue;
            }
        };

        let chunks_created = chunks.len();
        let existing = vector_store
            .existing_chunk_ids(Collection::Corpus, &doc.document_id)
            .await
            .unwrap_or_default();
        let mut fresh: Vec<Chunk> = chunks.into_iter().filter(|c| !existing.contains(&c.chunk_id)).collect();

        if fresh.is_empty() {
            summaries.push(DocumentSummary {
                document_id: doc.document_id,
                source_name: doc.metadata.source_name,
                chunks_created,
                chunks_added: 0,
                errors: Vec::new(),
            });
            continue;
        }

        let _permit = embed_concurrency.acquire().await.expect("embed semaphore closed");
        let texts: Vec<String> = fresh.iter().map(|c| c.content.clone()).collect();
        match embedding.embed_batch(&texts).await {
            Ok(vectors) => {
                for (chunk, vector) in fresh.iter_mut().zip(vectors.into_iter()) {
                    chunk.embedding = Some(vector);
                }
                stamp_for_upsert(&mut fresh, embedding.model_name());
                let chunks_added = fresh.len();
                match vector_store.upsert(Collection::Corpus, &fresh).await {
                    Ok(()) => summaries.push(DocumentSummary {
                        document_id: doc.document_id,
                        source_name: doc.metadata.source_name,
                        chunks_created,
                        chunks_added,
                        errors: Vec::new(),
                    }),
                    Err(e) => summaries.push(DocumentSummary {
                        document_id: doc.document_id,
                        source_name: doc.metadata.source_name,
                        chunks_created,
                        chunks_added: 0,
                        errors: vec![truncate_error(&e.to_string())],
                    }),
                }
            }
            Err(e) => summaries.push(DocumentSummary {
                document_id: doc.document_id,
                source_name: doc.metadata.source_name,
                chunks_created,
                chunks_added: 0,
                errors: vec![truncate_error(&e.to_string())],
            }),
        }
    }

    summaries
}

fn collect_html_files(root: &Path) -> Vec<std::path::PathBuf> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
                .unwrap_or(false)
        })
        .map(|e| e.path().to_path_buf())
        .collect()
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn truncate_error(message: &str) -> String {
    message.chars().take(MAX_ERROR_CHARS).collect()
}

fn push_error(result: &mut IngestResult, source_name: &str, message: &str) {
    result.push(DocumentSummary {
        document_id: String::new(),
        source_name: source_name.to_string(),
        chunks_created: 0,
        chunks_added: 0,
        errors: vec![truncate_error(message)],
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StubEmbedding;

    #[async_trait]
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

    async fn engine() -> IngestionEngine {
        let store = Arc::new(VectorStore::connect_in_memory().await.unwrap());
        IngestionEngine::new(store, Arc::new(StubEmbedding), 1200, 150, None, 4)
    }

    #[tokio::test]
    async fn plain_text_ingest_creates_chunks_and_reports_summary() {
        let engine = engine().await;
        let docs = vec![PlainTextDocument::plain_text(
            "a.txt",
            "hello world, this is a test document",
        )];
        let result = engine.ingest_plain_text_documents("T1", docs).await.unwrap();
        assert_eq!(result.documents.len(), 1);
        assert_eq!(result.documents[0].chunks_added, 1);
        assert!(result.documents[0].errors.is_empty());
    }

    #[tokio::test]
    async fn whitespace_only_document_is_rejected_without_failing_batch() {
        let engine = engine().await;
        let docs = vec![
            PlainTextDocument::plain_text("empty.txt", "   \n  "),
            PlainTextDocument::plain_text("real.txt", "actual content here"),
        ];
        let result = engine.ingest_plain_text_documents("T1", docs).await.unwrap();
        assert_eq!(result.documents.len(), 2);
        assert!(!result.documents[0].errors.is_empty());
        assert!(result.documents[1].errors.is_empty());
    }

    #[tokio::test]
    async fn resume_skips_already_upserted_chunks() {
        let engine = engine().await;
        let text = "hello world, this is a test document".to_string();
        let docs = vec![PlainTextDocument::plain_text("a.txt", text.clone())];
        engine.ingest_plain_text_documents("T1", docs).await.unwrap();

        let docs_again = vec![PlainTextDocument::plain_text("a.txt", text)];
        let result = engine.ingest_plain_text_documents("T1", docs_again).await.unwrap();
        assert_eq!(result.documents[0].chunks_added, 0, "resume must skip existing chunk_ids");
    }

    #[tokio::test]
    async fn pdf_replace_rewrites_chunks_atomically() {
        let engine = engine().await;
        let first = engine
            .replace_one_pdf_document(
                "T1",
                "doc_replace".to_string(),
                "contract.pdf".to_string(),
                "original contract text goes here".to_string(),
                None,
                Vec::new(),
            )
            .await;
        assert_eq!(first.chunks_added, 1);

        let second = engine
            .replace_one_pdf_document(
                "T1",
                "doc_replace".to_string(),
                "contract.pdf".to_string(),
                "revised contract text, now longer than before".to_string(),
                None,
                Vec::new(),
            )
            .await;
        assert_eq!(second.chunks_added, 1, "replace rewrites rather than skipping as already-present");

        let remaining = engine
            .vector_store
            .existing_chunk_ids(Collection::UserDocuments, "doc_replace")
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1, "old chunks must be gone after replace");
    }

    #[test]
    fn error_messages_are_bounded() {
        let long = "x".repeat(1000);
        assert_eq!(truncate_error(&long).chars().count(), MAX_ERROR_CHARS);
    }
}
