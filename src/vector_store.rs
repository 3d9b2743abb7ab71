//! Vector store (C5).
//!
//! A persistent, embedding-indexed collection store over two logical
//! collections: `corpus` (shared, no tenant field) and `user_documents`
//! (every chunk carries a non-empty `tenant_id`). Built on SQLite; cosine
//! ranking happens in-process over the SQL-filtered candidate set, not inside
//! the database (spec §4.5).
//!
//! Filters are always normalised [`FilterExpr`] values built through
//! [`crate::filter::FilterBuilder`] — see that module for why the bare/AND
//! distinction matters.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::errors::VectorStoreError;
use crate::filter::{FilterExpr, ScalarValue};
use crate::models::{Chunk, ChunkMetadata};

/// The two logical collections the core operates over (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Corpus,
    UserDocuments,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Corpus => "corpus",
            Collection::UserDocuments => "user_documents",
        }
    }

    fn requires_tenant_scope(&self) -> bool {
        matches!(self, Collection::UserDocuments)
    }
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chunk_id: String,
    pub document_id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    pub score: f32,
}

/// Columns a [`FilterExpr`] is allowed to reference — anything else is a
/// programming error, not a user input error, since filters are always
/// built by trusted call sites via [`crate::filter::FilterBuilder`].
const FILTERABLE_COLUMNS: &[&str] = &[
    "tenant_id",
    "case_id",
    "jurisdiction",
    "law_abbrev",
    "norm_id",
    "source_kind",
    "tag",
    "document_id",
    "level",
    "source_name",
];

pub struct VectorStore {
    pool: SqlitePool,
}

impl VectorStore {
    pub async fn connect(path: &std::path::Path) -> Result<Self, VectorStoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).ok();
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| VectorStoreError::Sqlx(sqlx::Error::Configuration(e.into())))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// In-memory store, for tests.
    pub async fn connect_in_memory() -> Result<Self, VectorStoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), VectorStoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS vector_chunks (
                collection TEXT NOT NULL,
                chunk_id TEXT NOT NULL,
                document_id TEXT NOT NULL,
                content TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                embedding BLOB NOT NULL,
                tenant_id TEXT,
                case_id TEXT,
                jurisdiction TEXT,
                law_abbrev TEXT,
                norm_id TEXT,
                law_title TEXT,
                norm_title TEXT,
                level TEXT,
                paragraph_index INTEGER,
                parent_norm_id TEXT,
                source_kind TEXT NOT NULL,
                source_name TEXT NOT NULL DEFAULT '',
                tag TEXT,
                tags_csv TEXT,
                model_id TEXT,
                ingested_at INTEGER NOT NULL,
                PRIMARY KEY (collection, chunk_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_vector_chunks_tenant ON vector_chunks(collection, tenant_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Idempotent by `(collection, chunk_id)` — re-ingesting the same chunk
    /// overwrites it in place rather than duplicating it.
    pub async fn upsert(&self, collection: Collection, chunks: &[Chunk]) -> Result<(), VectorStoreError> {
        let mut tx = self.pool.begin().await?;

        for chunk in chunks {
            let embedding = chunk.embedding.as_deref().unwrap_or(&[]);
            sqlx::query(
                r#"
                INSERT INTO vector_chunks (
                    collection, chunk_id, document_id, content, content_hash, embedding,
                    tenant_id, case_id, jurisdiction, law_abbrev, norm_id, law_title,
                    norm_title, level, paragraph_index, parent_norm_id, source_kind,
                    source_name, tag, tags_csv, model_id, ingested_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (collection, chunk_id) DO UPDATE SET
                    document_id = excluded.document_id,
                    content = excluded.content,
                    content_hash = excluded.content_hash,
                    embedding = excluded.embedding,
                    tenant_id = excluded.tenant_id,
                    case_id = excluded.case_id,
                    jurisdiction = excluded.jurisdiction,
                    law_abbrev = excluded.law_abbrev,
                    norm_id = excluded.norm_id,
                    law_title = excluded.law_title,
                    norm_title = excluded.norm_title,
                    level = excluded.level,
                    paragraph_index = excluded.paragraph_index,
                    parent_norm_id = excluded.parent_norm_id,
                    source_kind = excluded.source_kind,
                    source_name = excluded.source_name,
                    tag = excluded.tag,
                    tags_csv = excluded.tags_csv,
                    model_id = excluded.model_id,
                    ingested_at = excluded.ingested_at
                "#,
            )
            .bind(collection.as_str())
            .bind(&chunk.chunk_id)
            .bind(&chunk.document_id)
            .bind(&chunk.content)
            .bind(&chunk.content_hash)
            .bind(vec_to_blob(embedding))
            .bind(&chunk.metadata.tenant_id)
            .bind(&chunk.metadata.case_id)
            .bind(&chunk.metadata.jurisdiction)
            .bind(&chunk.metadata.law_abbrev)
            .bind(&chunk.metadata.norm_id)
            .bind(&chunk.metadata.law_title)
            .bind(&chunk.metadata.norm_title)
            .bind(&chunk.metadata.level)
            .bind(chunk.metadata.paragraph_index)
            .bind(&chunk.metadata.parent_norm_id)
            .bind(&chunk.metadata.source_kind)
            .bind(&chunk.metadata.source_name)
            .bind(&chunk.metadata.tag)
            .bind(&chunk.metadata.tags_csv)
            .bind(&chunk.metadata.model_id)
            .bind(chunk.metadata.ingested_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// `k ∈ [1, 50]`; `where_` must include `tenant_id` when `collection` is
    /// `user_documents` (defence in depth — C8 is expected to enforce this
    /// already).
    pub async fn search(
        &self,
        collection: Collection,
        query_vector: &[f32],
        k: i64,
        where_: Option<&FilterExpr>,
    ) -> Result<Vec<SearchHit>, VectorStoreError> {
        if !(1..=50).contains(&k) {
            return Err(VectorStoreError::InvalidK(k));
        }
        if collection.requires_tenant_scope() && !filter_has_tenant_scope(where_) {
            return Err(VectorStoreError::MissingTenantScope);
        }

        let (clause, params) = filter_to_sql(where_);
        let sql = format!(
            "SELECT chunk_id, document_id, content, embedding, tenant_id, case_id, jurisdiction, \
             law_abbrev, norm_id, law_title, norm_title, level, paragraph_index, parent_norm_id, \
             source_kind, source_name, tag, tags_csv, model_id, ingested_at \
             FROM vector_chunks WHERE collection = ?{}",
            clause
        );

        let mut query = sqlx::query(&sql).bind(collection.as_str());
        for param in &params {
            query = bind_scalar(query, param);
        }

        let rows = query.fetch_all(&self.pool).await?;

        let mut hits: Vec<SearchHit> = rows
            .into_iter()
            .map(|row| {
                let embedding = blob_to_vec(row.get::<Vec<u8>, _>("embedding").as_slice());
                let score = cosine_similarity(query_vector, &embedding);
                SearchHit {
                    chunk_id: row.get("chunk_id"),
                    document_id: row.get("document_id"),
                    content: row.get("content"),
                    metadata: ChunkMetadata {
                        tenant_id: row.get("tenant_id"),
                        case_id: row.get("case_id"),
                        document_id: row.get("document_id"),
                        chunk_id: row.get("chunk_id"),
                        source_name: row.get("source_name"),
                        ingested_at: row.get("ingested_at"),
                        source_kind: row.get("source_kind"),
                        jurisdiction: row.get("jurisdiction"),
                        law_abbrev: row.get("law_abbrev"),
                        norm_id: row.get("norm_id"),
                        law_title: row.get("law_title"),
                        norm_title: row.get("norm_title"),
                        level: row.get("level"),
                        paragraph_index: row.get("paragraph_index"),
                        parent_norm_id: row.get("parent_norm_id"),
                        tags_csv: row.get("tags_csv"),
                        tag: row.get("tag"),
                        model_id: row.get("model_id"),
                    },
                    score,
                }
            })
            .collect();

        // Descending by score; stable tie-break by chunk_id (spec §4.5).
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk_id.cmp(&b.chunk_id))
        });
        hits.truncate(k as usize);

        Ok(hits)
    }

    /// `chunk_id`s of `document_id` already present in `collection` — used by
    /// the ingestion engine to skip chunks on resume (spec §4.7).
    pub async fn existing_chunk_ids(
        &self,
        collection: Collection,
        document_id: &str,
    ) -> Result<std::collections::HashSet<String>, VectorStoreError> {
        let rows = sqlx::query("SELECT chunk_id FROM vector_chunks WHERE collection = ? AND document_id = ?")
            .bind(collection.as_str())
            .bind(document_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| r.get::<String, _>("chunk_id")).collect())
    }

    /// All chunks matching `where_`, unranked (no query vector involved) and
    /// ordered by `chunk_id` ascending. Used by `get_law_by_id` to
    /// reconstruct a full norm's text from its chunks rather than return a
    /// similarity-ranked excerpt (spec §4.9).
    pub async fn fetch_matching(
        &self,
        collection: Collection,
        where_: &FilterExpr,
    ) -> Result<Vec<SearchHit>, VectorStoreError> {
        let (clause, params) = filter_to_sql(Some(where_));
        let sql = format!(
            "SELECT chunk_id, document_id, content, embedding, tenant_id, case_id, jurisdiction, \
             law_abbrev, norm_id, law_title, norm_title, level, paragraph_index, parent_norm_id, \
             source_kind, source_name, tag, tags_csv, model_id, ingested_at \
             FROM vector_chunks WHERE collection = ?{} ORDER BY chunk_id ASC",
            clause
        );

        let mut query = sqlx::query(&sql).bind(collection.as_str());
        for param in &params {
            query = bind_scalar(query, param);
        }

        let rows = query.fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|row| SearchHit {
                chunk_id: row.get("chunk_id"),
                document_id: row.get("document_id"),
                content: row.get("content"),
                metadata: ChunkMetadata {
                    tenant_id: row.get("tenant_id"),
                    case_id: row.get("case_id"),
                    document_id: row.get("document_id"),
                    chunk_id: row.get("chunk_id"),
                    source_name: row.get("source_name"),
                    ingested_at: row.get("ingested_at"),
                    source_kind: row.get("source_kind"),
                    jurisdiction: row.get("jurisdiction"),
                    law_abbrev: row.get("law_abbrev"),
                    norm_id: row.get("norm_id"),
                    law_title: row.get("law_title"),
                    norm_title: row.get("norm_title"),
                    level: row.get("level"),
                    paragraph_index: row.get("paragraph_index"),
                    parent_norm_id: row.get("parent_norm_id"),
                    tags_csv: row.get("tags_csv"),
                    tag: row.get("tag"),
                    model_id: row.get("model_id"),
                },
                score: 0.0,
            })
            .collect())
    }

    /// Atomic replace: delete rows matching `where_`, then upsert `chunks`,
    /// in a single transaction (SPEC_FULL §5 open-question #1 — a failed
    /// transaction rolls back whole, which is strictly stronger than the
    /// snapshot-and-restore plan spec.md §9 floats).
    pub async fn replace(
        &self,
        collection: Collection,
        where_: &FilterExpr,
        chunks: &[Chunk],
    ) -> Result<(), VectorStoreError> {
        if collection.requires_tenant_scope() && !filter_has_tenant_scope(Some(where_)) {
            return Err(VectorStoreError::MissingTenantScope);
        }

        let mut tx = self.pool.begin().await?;

        let (clause, params) = filter_to_sql(Some(where_));
        let sql = format!("DELETE FROM vector_chunks WHERE collection = ?{}", clause);
        let mut delete_query = sqlx::query(&sql).bind(collection.as_str());
        for param in &params {
            delete_query = bind_scalar(delete_query, param);
        }
        delete_query.execute(&mut *tx).await?;

        for chunk in chunks {
            let embedding = chunk.embedding.as_deref().unwrap_or(&[]);
            sqlx::query(
                r#"
                INSERT INTO vector_chunks (
                    collection, chunk_id, document_id, content, content_hash, embedding,
                    tenant_id, case_id, jurisdiction, law_abbrev, norm_id, law_title,
                    norm_title, level, paragraph_index, parent_norm_id, source_kind,
                    source_name, tag, tags_csv, model_id, ingested_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (collection, chunk_id) DO UPDATE SET
                    document_id = excluded.document_id,
                    content = excluded.content,
                    content_hash = excluded.content_hash,
                    embedding = excluded.embedding,
                    tenant_id = excluded.tenant_id,
                    case_id = excluded.case_id,
                    jurisdiction = excluded.jurisdiction,
                    law_abbrev = excluded.law_abbrev,
                    norm_id = excluded.norm_id,
                    law_title = excluded.law_title,
                    norm_title = excluded.norm_title,
                    level = excluded.level,
                    paragraph_index = excluded.paragraph_index,
                    parent_norm_id = excluded.parent_norm_id,
                    source_kind = excluded.source_kind,
                    source_name = excluded.source_name,
                    tag = excluded.tag,
                    tags_csv = excluded.tags_csv,
                    model_id = excluded.model_id,
                    ingested_at = excluded.ingested_at
                "#,
            )
            .bind(collection.as_str())
            .bind(&chunk.chunk_id)
            .bind(&chunk.document_id)
            .bind(&chunk.content)
            .bind(&chunk.content_hash)
            .bind(vec_to_blob(embedding))
            .bind(&chunk.metadata.tenant_id)
            .bind(&chunk.metadata.case_id)
            .bind(&chunk.metadata.jurisdiction)
            .bind(&chunk.metadata.law_abbrev)
            .bind(&chunk.metadata.norm_id)
            .bind(&chunk.metadata.law_title)
            .bind(&chunk.metadata.norm_title)
            .bind(&chunk.metadata.level)
            .bind(chunk.metadata.paragraph_index)
            .bind(&chunk.metadata.parent_norm_id)
            .bind(&chunk.metadata.source_kind)
            .bind(&chunk.metadata.source_name)
            .bind(&chunk.metadata.tag)
            .bind(&chunk.metadata.tags_csv)
            .bind(&chunk.metadata.model_id)
            .bind(chunk.metadata.ingested_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Scoped deletion for replace semantics (spec §4.7's single-transaction
    /// replace flow calls this before re-upserting).
    pub async fn delete(&self, collection: Collection, where_: &FilterExpr) -> Result<u64, VectorStoreError> {
        if collection.requires_tenant_scope() && !filter_has_tenant_scope(Some(where_)) {
            return Err(VectorStoreError::MissingTenantScope);
        }

        let (clause, params) = filter_to_sql(Some(where_));
        let sql = format!("DELETE FROM vector_chunks WHERE collection = ?{}", clause);

        let mut query = sqlx::query(&sql).bind(collection.as_str());
        for param in &params {
            query = bind_scalar(query, param);
        }

        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn count(&self, collection: Collection, where_: Option<&FilterExpr>) -> Result<u64, VectorStoreError> {
        let (clause, params) = filter_to_sql(where_);
        let sql = format!(
            "SELECT COUNT(*) as n FROM vector_chunks WHERE collection = ?{}",
            clause
        );

        let mut query = sqlx::query(&sql).bind(collection.as_str());
        for param in &params {
            query = bind_scalar(query, param);
        }

        let row = query.fetch_one(&self.pool).await?;
        Ok(row.get::<i64, _>("n") as u64)
    }
}

fn filter_has_tenant_scope(where_: Option<&FilterExpr>) -> bool {
    match where_ {
        None => false,
        Some(FilterExpr::Eq { field, value }) => {
            field == "tenant_id" && !matches!(value, ScalarValue::Str(s) if s.is_empty())
        }
        Some(FilterExpr::And { predicates }) => predicates.iter().any(|p| {
            matches!(p, FilterExpr::Eq { field, value } if field == "tenant_id" && !matches!(value, ScalarValue::Str(s) if s.is_empty()))
        }),
    }
}

/// Translate a normalised [`FilterExpr`] into a ` AND col = ? AND ...` SQL
/// fragment plus its bind parameters, in leaf order. Only columns in
/// [`FILTERABLE_COLUMNS`] are accepted.
fn filter_to_sql(where_: Option<&FilterExpr>) -> (String, Vec<ScalarValue>) {
    let mut clause = String::new();
    let mut params = Vec::new();

    let Some(expr) = where_ else {
        return (clause, params);
    };

    let leaves: Vec<(&str, &ScalarValue)> = match expr {
        FilterExpr::Eq { field, value } => vec![(field.as_str(), value)],
        FilterExpr::And { predicates } => predicates
            .iter()
            .map(|p| match p {
                FilterExpr::Eq { field, value } => (field.as_str(), value),
                FilterExpr::And { .. } => panic!("nested And is not a valid normalised filter"),
            })
            .collect(),
    };

    for (field, value) in leaves {
        assert!(
            FILTERABLE_COLUMNS.contains(&field),
            "filter references unfilterable column: {field}"
        );
        clause.push_str(&format!(" AND {field} = ?"));
        params.push(value.clone());
    }

    (clause, params)
}

fn bind_scalar<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    value: &'q ScalarValue,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    match value {
        ScalarValue::Str(s) => query.bind(s),
        ScalarValue::Int(i) => query.bind(i),
        ScalarValue::Bool(b) => query.bind(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterBuilder;

    fn chunk(id: &str, tenant: Option<&str>, embedding: Vec<f32>) -> Chunk {
        Chunk {
            chunk_id: id.to_string(),
            document_id: "doc1".to_string(),
            index: 0,
            content: format!("content for {id}"),
            content_hash: "hash".to_string(),
            metadata: ChunkMetadata {
                tenant_id: tenant.map(str::to_string),
                document_id: "doc1".to_string(),
                chunk_id: id.to_string(),
                source_kind: "plain-text".to_string(),
                ingested_at: 0,
                ..Default::default()
            },
            embedding: Some(embedding),
        }
    }

    #[tokio::test]
    async fn upsert_is_idempotent_by_chunk_id() {
        let store = VectorStore::connect_in_memory().await.unwrap();
        let c = chunk("doc1:0", Some("T1"), vec![1.0, 0.0, 0.0]);
        store.upsert(Collection::UserDocuments, &[c.clone()]).await.unwrap();
        store.upsert(Collection::UserDocuments, &[c]).await.unwrap();

        let where_ = FilterBuilder::new().eq("tenant_id", "T1").build();
        let count = store.count(Collection::UserDocuments, where_.as_ref()).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn search_requires_tenant_scope_for_user_documents() {
        let store = VectorStore::connect_in_memory().await.unwrap();
        let err = store
            .search(Collection::UserDocuments, &[1.0, 0.0], 5, None)
            .await;
        assert!(matches!(err, Err(VectorStoreError::MissingTenantScope)));
    }

    #[tokio::test]
    async fn search_rejects_k_out_of_range() {
        let store = VectorStore::connect_in_memory().await.unwrap();
        let where_ = FilterBuilder::new().eq("tenant_id", "T1").build();
        let err = store
            .search(Collection::UserDocuments, &[1.0, 0.0], 0, where_.as_ref())
            .await;
        assert!(matches!(err, Err(VectorStoreError::InvalidK(0))));
    }

    #[tokio::test]
    async fn tenant_isolation_excludes_other_tenants() {
        let store = VectorStore::connect_in_memory().await.unwrap();
        store
            .upsert(
                Collection::UserDocuments,
                &[
                    chunk("t1:0", Some("T1"), vec![1.0, 0.0]),
                    chunk("t2:0", Some("T2"), vec![1.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        let where_ = FilterBuilder::new().eq("tenant_id", "T1").build();
        let hits = store
            .search(Collection::UserDocuments, &[1.0, 0.0], 10, where_.as_ref())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, "t1:0");
    }

    #[tokio::test]
    async fn search_filters_on_level_and_source_name_without_panicking() {
        let store = VectorStore::connect_in_memory().await.unwrap();
        let mut c1 = chunk("c:0", None, vec![1.0, 0.0]);
        c1.metadata.level = Some("paragraph".to_string());
        c1.metadata.source_name = "bgb.html".to_string();
        let mut c2 = chunk("c:1", None, vec![1.0, 0.0]);
        c2.metadata.level = Some("article".to_string());
        c2.metadata.source_name = "stgb.html".to_string();
        store.upsert(Collection::Corpus, &[c1, c2]).await.unwrap();

        let where_ = FilterBuilder::new().eq("level", "paragraph").build();
        let hits = store
            .search(Collection::Corpus, &[1.0, 0.0], 10, where_.as_ref())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata.source_name, "bgb.html");

        let where_src = FilterBuilder::new().eq("source_name", "stgb.html").build();
        let hits_src = store
            .search(Collection::Corpus, &[1.0, 0.0], 10, where_src.as_ref())
            .await
            .unwrap();
        assert_eq!(hits_src.len(), 1);
        assert_eq!(hits_src[0].chunk_id, "c:1");
    }

    #[tokio::test]
    async fn round_trips_legal_metadata_fields() {
        let store = VectorStore::connect_in_memory().await.unwrap();
        let mut c = chunk("doc1:0", None, vec![1.0, 0.0]);
        c.metadata.law_title = Some("Bürgerliches Gesetzbuch".to_string());
        c.metadata.norm_title = Some("§ 123".to_string());
        c.metadata.level = Some("paragraph".to_string());
        c.metadata.paragraph_index = Some(3);
        c.metadata.parent_norm_id = Some("bgb-122".to_string());
        c.metadata.source_name = "bgb.html".to_string();
        store.upsert(Collection::Corpus, &[c]).await.unwrap();

        let hits = store
            .search(Collection::Corpus, &[1.0, 0.0], 10, None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        let m = &hits[0].metadata;
        assert_eq!(m.law_title.as_deref(), Some("Bürgerliches Gesetzbuch"));
        assert_eq!(m.norm_title.as_deref(), Some("§ 123"));
        assert_eq!(m.level.as_deref(), Some("paragraph"));
        assert_eq!(m.paragraph_index, Some(3));
        assert_eq!(m.parent_norm_id.as_deref(), Some("bgb-122"));
        assert_eq!(m.source_name, "bgb.html");
    }

    #[tokio::test]
    async fn corpus_search_does_not_require_tenant() {
        let store = VectorStore::connect_in_memory().await.unwrap();
        store
            .upsert(Collection::Corpus, &[chunk("c:0", None, vec![1.0, 0.0])])
            .await
            .unwrap();
        let hits = store
            .search(Collection::Corpus, &[1.0, 0.0], 10, None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn delete_is_scoped() {
        let store = VectorStore::connect_in_memory().await.unwrap();
        store
            .upsert(
                Collection::UserDocuments,
                &[
                    chunk("t1:0", Some("T1"), vec![1.0, 0.0]),
                    chunk("t2:0", Some("T2"), vec![1.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        let where_ = FilterBuilder::new().eq("tenant_id", "T1").build().unwrap();
        let deleted = store.delete(Collection::UserDocuments, &where_).await.unwrap();
        assert_eq!(deleted, 1);

        let where_t2 = FilterBuilder::new().eq("tenant_id", "T2").build();
        let remaining = store
            .count(Collection::UserDocuments, where_t2.as_ref())
            .await
            .unwrap();
        assert_eq!(remaining, 1);
    }
}
