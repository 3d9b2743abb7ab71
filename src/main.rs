//! `jurisctl` — CLI entry point.
//!
//! Two commands: `serve` starts the tool-surface HTTP server, `ingest-corpus`
//! runs the offline bulk corpus ingestion flow (C7 flow 1) against a local
//! HTML tree. There is no RPC tool for corpus bulk ingest — it is an operator
//! action, not something an agent triggers (spec §4.7).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use juris_harness::cache::ReferenceCache;
use juris_harness::catalog::{self, Catalog};
use juris_harness::config;
use juris_harness::embedding;
use juris_harness::ingest::IngestionEngine;
use juris_harness::server;
use juris_harness::tools::{ToolContext, ToolRegistry};
use juris_harness::vector_store::VectorStore;

#[derive(Parser)]
#[command(name = "jurisctl", about = "Legal-document retrieval RPC service for AI agents", version)]
struct Cli {
    #[arg(long, global = true, default_value = "./config/juris.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the tool-surface HTTP server.
    Serve,

    /// Bulk-ingest a local HTML tree into the shared corpus collection.
    IngestCorpus {
        /// Root directory to walk for `.html`/`.htm` files.
        root: PathBuf,

        /// Declared source encoding (e.g. `utf-8`, `windows-1252`).
        #[arg(long, default_value = "utf-8")]
        encoding: String,

        /// Law abbreviation applied to every document ingested in this call.
        #[arg(long)]
        law_abbrev: String,

        /// Jurisdiction applied to every document ingested in this call.
        #[arg(long)]
        jurisdiction: String,

        /// Worker pool size; defaults to the configured ingest worker pool.
        #[arg(long)]
        worker_pool: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            let vector_store = Arc::new(VectorStore::connect(&cfg.vector_store.path).await?);
            let embedding = embedding::create_provider(&cfg.embedding);
            let catalog = load_catalog(&cfg)?;
            let cache = Arc::new(ReferenceCache::new(cfg.cache.capacity, Duration::from_secs(cfg.cache.default_ttl_secs)));
            let ingestion = Arc::new(IngestionEngine::new(
                vector_store.clone(),
                embedding.clone(),
                cfg.chunking.chunk_size_chars,
                cfg.chunking.chunk_overlap_chars,
                cfg.chunking.max_chunks_per_document,
                cfg.vector_store.ingest_worker_pool,
            ));

            let tool_ctx = Arc::new(ToolContext::new(
                Arc::new(cfg.clone()),
                vector_store,
                embedding,
                catalog,
                cache,
                ingestion,
            ));
            let registry = Arc::new(ToolRegistry::with_catalogue());

            server::run_server(&cfg, registry, tool_ctx).await?;
        }
        Commands::IngestCorpus {
            root,
            encoding,
            law_abbrev,
            jurisdiction,
            worker_pool,
        } => {
            let vector_store = Arc::new(VectorStore::connect(&cfg.vector_store.path).await?);
            let embedding = embedding::create_provider(&cfg.embedding);
            let ingestion = IngestionEngine::new(
                vector_store,
                embedding,
                cfg.chunking.chunk_size_chars,
                cfg.chunking.chunk_overlap_chars,
                cfg.chunking.max_chunks_per_document,
                cfg.vector_store.ingest_worker_pool,
            );

            let result = ingestion
                .ingest_corpus_html(&root, &encoding, &law_abbrev, &jurisdiction, worker_pool)
                .await?;

            println!(
                "ingested {} documents, {} chunks created, {} chunks added",
                result.documents.len(),
                result.total_chunks_created,
                result.total_chunks_added
            );
            for doc in &result.documents {
                if !doc.errors.is_empty() {
                    println!("  {}: {}", doc.source_name, doc.errors.join("; "));
                }
            }
        }
    }

    Ok(())
}

fn load_catalog(cfg: &config::Config) -> anyhow::Result<Arc<Catalog>> {
    match &cfg.catalog.snapshot_dir {
        Some(dir) => Ok(Arc::new(catalog::load_from_dir(dir)?)),
        None => Ok(Arc::new(Catalog::new())),
    }
}
