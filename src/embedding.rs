//! Embedding gateway (C2).
//!
//! Fans out `embed_batch` over a pool of HTTP embedding replicas with
//! round-robin selection and per-endpoint health tracking (spec §4.2). Falls
//! back to a lazily-initialised, single-flight in-process model when no
//! endpoint is configured (spec §9, "Mutable singleton embedding model").
//!
//! # Retry strategy
//!
//! Exponential backoff on non-2xx / transport failure: 1s, 2s, 4s, … capped
//! at 32s. After `max_retries` consecutive failures an endpoint is marked
//! unhealthy for `unhealthy_cooldown_secs` and the gateway continues with the
//! remaining healthy endpoints; [`EmbeddingError::Unavailable`] is returned
//! only once none are healthy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::config::EmbeddingConfig;
use crate::errors::EmbeddingError;

/// Trait for embedding providers: HTTP gateway or in-process fallback.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn model_name(&self) -> &str;
    fn dims(&self) -> usize;
    /// Embed a batch of texts, preserving input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Embed a single query text. Convenience wrapper for search (C8).
pub async fn embed_query(
    provider: &dyn EmbeddingProvider,
    text: &str,
) -> Result<Vec<f32>, EmbeddingError> {
    let mut results = provider.embed_batch(&[text.to_string()]).await?;
    results
        .pop()
        .ok_or_else(|| EmbeddingError::Request("empty embedding response".to_string()))
}

/// Build the configured provider: HTTP gateway if endpoints are configured,
/// otherwise the in-process singleton fallback.
pub fn create_provider(config: &EmbeddingConfig) -> Arc<dyn EmbeddingProvider> {
    if config.has_http_endpoints() {
        Arc::new(HttpGatewayProvider::new(config))
    } else {
        Arc::new(InProcessProvider::new(config.dims))
    }
}

// ============ HTTP gateway provider ============

#[derive(Debug, Clone)]
struct EndpointHealth {
    unhealthy_until: Option<Instant>,
    consecutive_failures: u32,
}

impl Default for EndpointHealth {
    fn default() -> Self {
        Self {
            unhealthy_until: None,
            consecutive_failures: 0,
        }
    }
}

impl EndpointHealth {
    fn is_healthy(&self, now: Instant) -> bool {
        match self.unhealthy_until {
            Some(until) => now >= until,
            None => true,
        }
    }
}

/// HTTP fan-out embedding gateway. The endpoint health table is the only
/// mutable shared state (spec §5); it is a [`DashMap`] so reads and writes
/// take only a short per-shard critical section.
pub struct HttpGatewayProvider {
    endpoints: Vec<String>,
    health: DashMap<String, EndpointHealth>,
    next: AtomicUsize,
    client: reqwest::Client,
    dims: usize,
    batch_size: usize,
    max_retries: u32,
    cooldown: Duration,
}

impl HttpGatewayProvider {
    pub fn new(config: &EmbeddingConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("embedding HTTP client must build");

        let health = DashMap::new();
        for endpoint in &config.endpoints {
            health.insert(endpoint.clone(), EndpointHealth::default());
        }

        Self {
            endpoints: config.endpoints.clone(),
            health,
            next: AtomicUsize::new(0),
            client,
            dims: config.dims,
            batch_size: config.batch_size,
            max_retries: config.max_retries,
            cooldown: Duration::from_secs(config.unhealthy_cooldown_secs),
        }
    }

    /// Select the next endpoint to try, round-robin over currently healthy
    /// endpoints. Exposed separately from `embed_batch` so the selection
    /// policy is testable without network I/O.
    fn select_endpoint(&self) -> Option<String> {
        let now = Instant::now();
        let healthy: Vec<String> = self
            .endpoints
            .iter()
            .filter(|e| {
                self.health
                    .get(e.as_str())
                    .map(|h| h.is_healthy(now))
                    .unwrap_or(true)
            })
            .cloned()
            .collect();
        select_round_robin(&healthy, &self.next)
    }

    fn record_success(&self, endpoint: &str) {
        if let Some(mut entry) = self.health.get_mut(endpoint) {
            entry.consecutive_failures = 0;
            entry.unhealthy_until = None;
        }
    }

    fn record_failure(&self, endpoint: &str) {
        let mut entry = self.health.entry(endpoint.to_string()).or_default();
        entry.consecutive_failures += 1;
        if entry.consecutive_failures >= self.max_retries {
            entry.unhealthy_until = Some(Instant::now() + self.cooldown);
        }
    }

    async fn embed_one_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            let Some(endpoint) = self.select_endpoint() else {
                return Err(EmbeddingError::Unavailable);
            };

            if attempt > 0 {
                tokio::time::sleep(backoff_delay(attempt)).await;
            }

            let body = serde_json::json!({ "input": texts });
            match self
                .client
                .post(format!("{}/embed", endpoint.trim_end_matches('/')))
                .json(&body)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    self.record_success(&endpoint);
                    let json: serde_json::Value = response
                        .json()
                        .await
                        .map_err(|e| EmbeddingError::Request(e.to_string()))?;
                    return parse_embed_response(&json);
                }
                Ok(response) => {
                    self.record_failure(&endpoint);
                    last_err = Some(EmbeddingError::Request(format!(
                        "{} returned {}",
                        endpoint,
                        response.status()
                    )));
                }
                Err(e) => {
                    self.record_failure(&endpoint);
                    last_err = Some(EmbeddingError::Request(e.to_string()));
                }
            }
        }

        Err(last_err.unwrap_or(EmbeddingError::Unavailable))
    }
}

#[async_trait]
impl EmbeddingProvider for HttpGatewayProvider {
    fn model_name(&self) -> &str {
        "http-gateway"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size.max(1)) {
            let vectors = self.embed_one_batch(batch).await?;
            out.extend(vectors);
        }
        Ok(out)
    }
}

/// Round-robin selection over a slice of currently-healthy endpoint names.
fn select_round_robin(healthy: &[String], counter: &AtomicUsize) -> Option<String> {
    if healthy.is_empty() {
        return None;
    }
    let idx = counter.fetch_add(1, Ordering::Relaxed) % healthy.len();
    Some(healthy[idx].clone())
}

/// Exponential backoff: 1s, 2s, 4s, … capped at 32s.
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << (attempt - 1).min(5))
}

fn parse_embed_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let data = json
        .get("embeddings")
        .and_then(|d| d.as_array())
        .ok_or_else(|| EmbeddingError::Request("missing embeddings array".to_string()))?;

    Ok(data
        .iter()
        .map(|row| {
            row.as_array()
                .map(|arr| arr.iter().map(|v| v.as_f64().unwrap_or(0.0) as f32).collect())
                .unwrap_or_default()
        })
        .collect())
}

// ============ In-process fallback provider ============

/// Lazily-initialised, single-flight in-process embedding model (spec §4.2,
/// §9). Only one model instance is ever loaded regardless of how many
/// concurrent callers request it — the `Mutex` both guards the lazy init and
/// serialises inference, acceptable since this path is a fallback, not the
/// production path (HTTP fan-out is preferred).
pub struct InProcessProvider {
    dims: usize,
    model: Mutex<Option<LocalModel>>,
}

struct LocalModel {
    #[cfg(feature = "local-embeddings-fastembed")]
    inner: fastembed::TextEmbedding,
    #[allow(dead_code)]
    dims: usize,
}

impl InProcessProvider {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            model: Mutex::new(None),
        }
    }

    async fn ensure_loaded(&self) -> Result<(), EmbeddingError> {
        let mut guard = self.model.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        #[cfg(feature = "local-embeddings-fastembed")]
        {
            let inner = fastembed::TextEmbedding::try_new(Default::default())
                .map_err(|e| EmbeddingError::Request(format!("failed to load local model: {e}")))?;
            *guard = Some(LocalModel {
                inner,
                dims: self.dims,
            });
            return Ok(());
        }

        #[cfg(not(feature = "local-embeddings-fastembed"))]
        {
            Err(EmbeddingError::Disabled)
        }
    }
}

#[async_trait]
impl EmbeddingProvider for InProcessProvider {
    fn model_name(&self) -> &str {
        "in-process"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.ensure_loaded().await?;
        let guard = self.model.lock().await;
        let _model = guard.as_ref().ok_or(EmbeddingError::Disabled)?;

        #[cfg(feature = "local-embeddings-fastembed")]
        {
            let owned: Vec<String> = texts.to_vec();
            let embeddings = _model
                .inner
                .embed(owned, None)
                .map_err(|e| EmbeddingError::Request(e.to_string()))?;
            return Ok(embeddings);
        }

        #[cfg(not(feature = "local-embeddings-fastembed"))]
        {
            Err(EmbeddingError::Disabled)
        }
    }
}

// ============ Vector utilities ============

/// Encode a float vector as little-endian bytes for SQLite BLOB storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector. Inverse of [`vec_to_blob`].
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity mapped into `[0, 1]` per spec §4.5 ("return
/// `similarity ∈ [0, 1]` where 1 is identical"): `(cos(θ) + 1) / 2`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    let raw = (dot / denom).clamp(-1.0, 1.0);
    (raw + 1.0) / 2.0
}
