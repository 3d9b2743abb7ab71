//! # juris-harness
//!
//! A legal-document retrieval RPC service for AI agents: bulk-ingest a local
//! corpus of legal HTML, let tenants ingest their own text/Markdown/PDF
//! documents, and expose semantic search and retrieval over both through a
//! closed tool catalogue (C9).
//!
//! ## Architecture
//!
//! ```text
//! Corpus HTML tree ──┐
//!                     ├─▶ Ingestion (C7) ─▶ Vector store (C5) ─▶ Query engine (C8) ─┐
//! Tenant text/md/pdf ─┘         │                                                    │
//!                               ▼                                                    ▼
//!                      Embedding gateway (C2)                              Tool surface (C9) ─▶ HTTP (server.rs)
//!                                                                                    ▲
//!                                                             Catalog (C4), Reference cache (C6)
//! ```
//!
//! ## Components
//!
//! | Module | Component | Purpose |
//! |--------|-----------|---------|
//! | [`safe_path`] | C1 | Allowlisted-root path resolution; rejects traversal/absolute/oversized/wrong-suffix input |
//! | [`embedding`] | C2 | Round-robin HTTP embedding gateway with health tracking, in-process fallback |
//! | [`html_corpus`] | C3 | Legal-HTML parsing into norm/paragraph documents |
//! | [`chunk`] | C3 | Deterministic char-count+overlap text chunking |
//! | [`catalog`] | C4 | Read-only, prefix-filterable discovery index, loaded once at startup |
//! | [`filter`] | C5 | Filter-expression algebra for scoped vector-store queries |
//! | [`vector_store`] | C5 | SQLite-backed `corpus`/`user_documents` collections with in-Rust cosine ranking |
//! | [`cache`] | C6 | Content-addressed, permissioned, LRU+TTL reference cache |
//! | [`ingest`] | C7 | Five ingestion flows built from chunk/embed/upsert primitives |
//! | [`query`] | C8 | Corpus and tenant-scoped user-document semantic search |
//! | [`tools`] | C9 | The closed RPC tool catalogue |
//! | [`convert`] | C10 | PDF-to-Markdown sidecar conversion |
//! | [`server`] | ambient | Axum HTTP transport for the tool catalogue |
//! | [`config`] | ambient | TOML configuration + spec §6 environment overrides |
//! | [`errors`] | ambient | Per-module `thiserror` taxonomies aggregated into [`errors::CoreError`] |
//! | [`models`] | ambient | Shared data types: `Document`, `Chunk`, `ChunkMetadata`, `CatalogEntry` |
//!
//! ## Configuration
//!
//! Configured via a TOML file (default `config/juris.toml`); see [`config`] for
//! every section and [`config::load_config`] for the environment-variable
//! overrides mandated by the external interface contract.

pub mod cache;
pub mod catalog;
pub mod chunk;
pub mod config;
pub mod convert;
pub mod embedding;
pub mod errors;
pub mod filter;
pub mod html_corpus;
pub mod ingest;
pub mod models;
pub mod query;
pub mod safe_path;
pub mod server;
pub mod tools;
pub mod vector_store;
