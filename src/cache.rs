//! Reference cache (C6).
//!
//! A content-addressed cache with hierarchical namespaces and a permission
//! model (spec §4.6). Large tool results are registered here and returned to
//! callers as an opaque handle (`ref_id`) plus a bounded preview, never as
//! the raw value — the RPC boundary must never see the inner value's shape
//! (spec §4.6, "Tool-wrapping contract"; spec §9, "Cached-tool return
//! typing").

use std::time::{Duration, Instant};

use dashmap::DashMap;
use lru::LruCache;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::errors::CacheError;

/// Who is asking. Namespace policies carry a separate permission for each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    User,
    Agent,
}

/// Access level, per spec §4.6. Ordinal order is `None < Execute < Read <
/// Write < Full`, but `Read` and `Write` are NOT comparable to each other —
/// `Full` is their union, not a point above both on a single scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Permission {
    None,
    Execute,
    Read,
    Write,
    Full,
}

impl Permission {
    fn allows_execute(self) -> bool {
        self >= Permission::Execute
    }
    fn allows_read(self) -> bool {
        matches!(self, Permission::Read | Permission::Full)
    }
    fn allows_write(self) -> bool {
        matches!(self, Permission::Write | Permission::Full)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NamespacePolicy {
    pub user_perms: Permission,
    pub agent_perms: Permission,
}

impl NamespacePolicy {
    fn perms_for(&self, actor: Actor) -> Permission {
        match actor {
            Actor::User => self.user_perms,
            Actor::Agent => self.agent_perms,
        }
    }
}

/// Whether the cached value is list-shaped or string-shaped — this drives
/// which preview strategy applies (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueShape {
    Text,
    List,
}

#[derive(Debug, Clone)]
pub enum CachedValue {
    Text(String),
    List(Vec<serde_json::Value>),
}

impl CachedValue {
    fn shape(&self) -> ValueShape {
        match self {
            CachedValue::Text(_) => ValueShape::Text,
            CachedValue::List(_) => ValueShape::List,
        }
    }

    fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        match self {
            CachedValue::Text(s) => hasher.update(s.as_bytes()),
            CachedValue::List(items) => {
                for item in items {
                    hasher.update(item.to_string().as_bytes());
                    hasher.update(b"\0");
                }
            }
        }
        format!("{:x}", hasher.finalize())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum PreviewStrategy {
    Sample { first: usize, stride: usize, token_budget: usize },
    Truncate { chars: usize },
    Paginate { page_size: usize },
}

#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    pub ref_id: String,
    pub shape: ValueShape,
    pub preview: serde_json::Value,
    pub truncated: bool,
    pub total_items: Option<usize>,
    pub total_chars: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub ref_id: String,
    pub page: usize,
    pub page_size: usize,
    pub items: Vec<serde_json::Value>,
    pub total_items: usize,
}

struct CacheEntry {
    namespace: String,
    content_hash: String,
    value: CachedValue,
    policy: NamespacePolicy,
    created_at: Instant,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Content-addressed, namespace-scoped, LRU+TTL-evicted cache.
///
/// Eviction consistency (spec §4.6: "a `ref_id` is either fully present or
/// fully absent") falls out of holding the whole map behind one `Mutex` —
/// there is no window where an entry is half-removed.
pub struct ReferenceCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    namespace_policies: DashMap<String, NamespacePolicy>,
    default_ttl: Duration,
}

impl ReferenceCache {
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        let capacity = std::num::NonZeroUsize::new(capacity.max(1)).expect("capacity > 0");
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            namespace_policies: DashMap::new(),
            default_ttl,
        }
    }

    /// Register (or override) the permission policy for `namespace`. Child
    /// namespaces inherit this until they register their own.
    pub fn set_namespace_policy(&self, namespace: impl Into<String>, policy: NamespacePolicy) {
        self.namespace_policies.insert(namespace.into(), policy);
    }

    /// Walk from `namespace` up through its `/`-separated ancestors to find
    /// the nearest registered policy; `NONE`/`NONE` if nothing matches.
    fn effective_policy(&self, namespace: &str) -> NamespacePolicy {
        let mut current = namespace;
        loop {
            if let Some(policy) = self.namespace_policies.get(current) {
                return *policy;
            }
            match current.rfind('/') {
                Some(idx) => current = &current[..idx],
                None => break,
            }
        }
        self.namespace_policies
            .get(current)
            .map(|p| *p)
            .unwrap_or(NamespacePolicy {
                user_perms: Permission::None,
                agent_perms: Permission::None,
            })
    }

    /// Store `value` under `namespace`, returning its `ref_id`. Content
    /// addressing means re-putting identical content in the same namespace
    /// returns the existing `ref_id` rather than a new entry.
    pub async fn put(
        &self,
        namespace: &str,
        value: CachedValue,
        actor: Actor,
        ttl: Option<Duration>,
    ) -> Result<String, CacheError> {
        let policy = self.effective_policy(namespace);
        if !policy.perms_for(actor).allows_write() {
            return Err(CacheError::PermissionDenied);
        }

        let content_hash = value.content_hash();
        let now = Instant::now();
        let mut guard = self.entries.lock().await;

        if let Some(existing_ref_id) = find_by_hash(&guard, namespace, &content_hash) {
            return Ok(existing_ref_id);
        }

        let ref_id = allocate_ref_id(&guard, namespace, &content_hash);
        let entry = CacheEntry {
            namespace: namespace.to_string(),
            content_hash,
            value,
            policy,
            created_at: now,
            expires_at: now + ttl.unwrap_or(self.default_ttl),
        };

        if guard.put(ref_id.clone(), entry).is_some() {
            return Err(CacheError::PartialEviction(ref_id));
        }

        Ok(ref_id)
    }

    /// Preview the value at `ref_id` without materialising it in full
    /// (unless it is already small enough that the strategy returns
    /// everything). Requires at least `READ`.
    pub async fn get_preview(
        &self,
        ref_id: &str,
        actor: Actor,
        strategy: PreviewStrategy,
    ) -> Result<Preview, CacheError> {
        let mut guard = self.entries.lock().await;
        let entry = take_live_entry(&mut guard, ref_id)?;

        if !entry.policy.perms_for(actor).allows_read() {
            return Err(CacheError::PermissionDenied);
        }

        Ok(build_preview(ref_id, &entry.value, &strategy))
    }

    /// Fetch one page of a list-shaped value (spec §4.6, `paginate`).
    pub async fn get_page(
        &self,
        ref_id: &str,
        actor: Actor,
        page: usize,
        page_size: usize,
    ) -> Result<Page, CacheError> {
        let mut guard = self.entries.lock().await;
        let entry = take_live_entry(&mut guard, ref_id)?;

        if !entry.policy.perms_for(actor).allows_read() {
            return Err(CacheError::PermissionDenied);
        }

        let CachedValue::List(items) = &entry.value else {
            return Err(CacheError::NotFound(ref_id.to_string()));
        };

        let page_size = page_size.max(1);
        let start = page.saturating_sub(1) * page_size;
        let page_items: Vec<serde_json::Value> = items.iter().skip(start).take(page_size).cloned().collect();

        Ok(Page {
            ref_id: ref_id.to_string(),
            page,
            page_size,
            items: page_items,
            total_items: items.len(),
        })
    }

    /// Resolve `ref_id` for use as an internal computation argument without
    /// ever returning the raw value to the caller — satisfied by `EXECUTE`
    /// and anything more permissive (spec §4.6).
    pub async fn resolve_for_execute(&self, ref_id: &str, actor: Actor) -> Result<CachedValue, CacheError> {
        let mut guard = self.entries.lock().await;
        let entry = take_live_entry(&mut guard, ref_id)?;

        if !entry.policy.perms_for(actor).allows_execute() {
            return Err(CacheError::PermissionDenied);
        }

        Ok(entry.value.clone())
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

/// Clone-on-read of the entry at `ref_id`, evicting it first if expired so
/// an expired entry is never observed as present (spec §4.6 consistency).
fn take_live_entry(guard: &mut LruCache<String, CacheEntry>, ref_id: &str) -> Result<ClonedEntry, CacheError> {
    let now = Instant::now();
    let expired = guard.peek(ref_id).map(|e| e.is_expired(now)).unwrap_or(false);
    if expired {
        guard.pop(ref_id);
    }
    let entry = guard.get(ref_id).ok_or_else(|| CacheError::NotFound(ref_id.to_string()))?;
    Ok(ClonedEntry {
        value: entry.value.clone(),
        policy: entry.policy,
    })
}

struct ClonedEntry {
    value: CachedValue,
    policy: NamespacePolicy,
}

fn find_by_hash(guard: &LruCache<String, CacheEntry>, namespace: &str, content_hash: &str) -> Option<String> {
    guard
        .iter()
        .find(|(_, e)| e.namespace == namespace && e.content_hash == content_hash)
        .map(|(ref_id, _)| ref_id.clone())
}

/// `ref_id = "{namespace}:{hash_prefix}"`, starting at an 8-hex-char prefix
/// and extending to 12 on collision (spec §4.6). Collisions surviving past
/// 12 characters (astronomically unlikely for SHA-256) fall back to a
/// numeric suffix rather than failing the put.
fn allocate_ref_id(guard: &LruCache<String, CacheEntry>, namespace: &str, content_hash: &str) -> String {
    for prefix_len in 8..=12 {
        let candidate = format!("{}:{}", namespace, &content_hash[..prefix_len]);
        if !guard.contains(&candidate) {
            return candidate;
        }
    }
    let mut suffix = 2u32;
    loop {
        let candidate = format!("{}:{}-{}", namespace, &content_hash[..12], suffix);
        if !guard.contains(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

fn build_preview(ref_id: &str, value: &CachedValue, strategy: &PreviewStrategy) -> Preview {
    match (value, strategy) {
        (CachedValue::List(items), PreviewStrategy::Sample { first, stride, token_budget }) => {
            let first = *first;
            let stride = (*stride).max(1);
            let token_budget = *token_budget;
            let mut sampled = Vec::new();
            let mut budget_used = 0usize;
            let mut truncated = false;

            for (i, item) in items.iter().enumerate() {
                let taken = i < first || (i >= first && (i - first) % stride == 0);
                if !taken {
                    continue;
                }
                let approx_tokens = item.to_string().len() / 4 + 1;
                if budget_used + approx_tokens > token_budget {
                    truncated = true;
                    break;
                }
                budget_used += approx_tokens;
                sampled.push(item.clone());
            }
            if sampled.len() < items.len() {
                truncated = true;
            }

            Preview {
                ref_id: ref_id.to_string(),
                shape: ValueShape::List,
                preview: serde_json::Value::Array(sampled),
                truncated,
                total_items: Some(items.len()),
                total_chars: None,
            }
        }
        (CachedValue::Text(text), PreviewStrategy::Truncate { chars }) => {
            let total_chars = text.chars().count();
            let truncated_text: String = text.chars().take(*chars).collect();
            Preview {
                ref_id: ref_id.to_string(),
                shape: ValueShape::Text,
                preview: serde_json::Value::String(truncated_text),
                truncated: total_chars > *chars,
                total_items: None,
                total_chars: Some(total_chars),
            }
        }
        (CachedValue::List(items), PreviewStrategy::Paginate { page_size }) => {
            let page: Vec<serde_json::Value> = items.iter().take(*page_size).cloned().collect();
            Preview {
                ref_id: ref_id.to_string(),
                shape: ValueShape::List,
                preview: serde_json::Value::Array(page),
                truncated: items.len() > *page_size,
                total_items: Some(items.len()),
                total_chars: None,
            }
        }
        // Strategy/shape mismatch (e.g. `truncate` on a list): fall back to
        // an empty preview rather than panicking — the caller picked the
        // wrong strategy for the shape, not a cache-consistency failure.
        _ => Preview {
            ref_id: ref_id.to_string(),
            shape: value.shape(),
            preview: serde_json::Value::Null,
            truncated: true,
            total_items: None,
            total_chars: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_policy() -> NamespacePolicy {
        NamespacePolicy {
            user_perms: Permission::Full,
            agent_perms: Permission::Full,
        }
    }

    #[tokio::test]
    async fn put_then_preview_truncates_text() {
        let cache = ReferenceCache::new(10, Duration::from_secs(3600));
        cache.set_namespace_policy("public", full_policy());

        let ref_id = cache
            .put("public", CachedValue::Text("x".repeat(1000)), Actor::User, None)
            .await
            .unwrap();

        let preview = cache
            .get_preview(&ref_id, Actor::User, PreviewStrategy::Truncate { chars: 100 })
            .await
            .unwrap();
        assert_eq!(preview.shape, ValueShape::Text);
        assert!(preview.truncated);
        assert_eq!(preview.total_chars, Some(1000));
    }

    #[tokio::test]
    async fn content_addressing_dedupes_identical_puts() {
        let cache = ReferenceCache::new(10, Duration::from_secs(3600));
        cache.set_namespace_policy("public", full_policy());

        let a = cache
            .put("public", CachedValue::Text("same".to_string()), Actor::User, None)
            .await
            .unwrap();
        let b = cache
            .put("public", CachedValue::Text("same".to_string()), Actor::User, None)
            .await
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn execute_permission_does_not_allow_read() {
        let cache = ReferenceCache::new(10, Duration::from_secs(3600));
        cache.set_namespace_policy(
            "secrets",
            NamespacePolicy {
                user_perms: Permission::Full,
                agent_perms: Permission::Execute,
            },
        );

        let ref_id = cache
            .put("secrets", CachedValue::Text("top-secret".to_string()), Actor::User, None)
            .await
            .unwrap();

        let read_result = cache
            .get_preview(&ref_id, Actor::Agent, PreviewStrategy::Truncate { chars: 10 })
            .await;
        assert!(matches!(read_result, Err(CacheError::PermissionDenied)));

        let execute_result = cache.resolve_for_execute(&ref_id, Actor::Agent).await;
        assert!(execute_result.is_ok());
    }

    #[tokio::test]
    async fn child_namespace_inherits_policy() {
        let cache = ReferenceCache::new(10, Duration::from_secs(3600));
        cache.set_namespace_policy("user:alice", full_policy());

        let ref_id = cache
            .put(
                "user:alice/session:abc",
                CachedValue::Text("hello".to_string()),
                Actor::User,
                None,
            )
            .await
            .unwrap();

        let preview = cache
            .get_preview(&ref_id, Actor::User, PreviewStrategy::Truncate { chars: 10 })
            .await;
        assert!(preview.is_ok());
    }

    #[tokio::test]
    async fn unregistered_namespace_denies_all_access() {
        let cache = ReferenceCache::new(10, Duration::from_secs(3600));
        let result = cache
            .put("no-policy", CachedValue::Text("x".to_string()), Actor::User, None)
            .await;
        assert!(matches!(result, Err(CacheError::PermissionDenied)));
    }

    #[tokio::test]
    async fn expired_entry_is_absent_not_partial() {
        let cache = ReferenceCache::new(10, Duration::from_millis(1));
        cache.set_namespace_policy("public", full_policy());
        let ref_id = cache
            .put("public", CachedValue::Text("hi".to_string()), Actor::User, None)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;

        let result = cache
            .get_preview(&ref_id, Actor::User, PreviewStrategy::Truncate { chars: 10 })
            .await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn pagination_returns_requested_page() {
        let cache = ReferenceCache::new(10, Duration::from_secs(3600));
        cache.set_namespace_policy("public", full_policy());
        let items: Vec<serde_json::Value> = (0..25).map(|i| serde_json::json!(i)).collect();
        let ref_id = cache
            .put("public", CachedValue::List(items), Actor::User, None)
            .await
            .unwrap();

        let page1 = cache.get_page(&ref_id, Actor::User, 1, 10).await.unwrap();
        assert_eq!(page1.items.len(), 10);
        let page3 = cache.get_page(&ref_id, Actor::User, 3, 10).await.unwrap();
        assert_eq!(page3.items.len(), 5);
        assert_eq!(page3.total_items, 25);
    }
}
