//! Catalog store (C4).
//!
//! A read-only, prefix-filterable index over discoverable document
//! identifiers, loaded once at process start from a structured local
//! database file per registered source (spec §4.4). Never touches the
//! network and never retrieves content — it answers "what exists", not
//! "what does it say".

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::CatalogError;
use crate::models::CatalogEntry;

/// One registered catalog source, loaded at startup and held for the life of
/// the process. Entries are kept sorted by `document_id` so pagination is a
/// plain slice operation.
pub struct CatalogSource {
    name: String,
    entries: Vec<CatalogEntry>,
}

impl CatalogSource {
    /// Build a source from a snapshot's entries, sorting by `document_id`
    /// (spec §4.4: "lexicographic by `document_id`, stable, deterministic").
    pub fn new(name: impl Into<String>, mut entries: Vec<CatalogEntry>) -> Self {
        entries.sort_by(|a, b| a.document_id.cmp(&b.document_id));
        Self {
            name: name.into(),
            entries,
        }
    }
}

/// The set of catalog sources known to this process. Immutable once built —
/// there is no runtime mutation path (spec invariant 6: "Catalog is
/// read-only at runtime").
#[derive(Default)]
pub struct Catalog {
    sources: BTreeMap<String, CatalogSource>,
}

#[derive(Debug, Serialize)]
pub struct CatalogPage {
    pub count_total: usize,
    pub count_filtered: usize,
    /// Entry counts per `document_type_prefix`, computed across the whole
    /// source regardless of the requested page or prefix filter.
    pub prefix_counts: BTreeMap<String, usize>,
    pub items: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, source: CatalogSource) {
        self.sources.insert(source.name.clone(), source);
    }

    /// List `source`'s entries, optionally filtered by `document_type_prefix`,
    /// paginated by `offset`/`limit` (spec §4.4, S5).
    pub fn list_available(
        &self,
        source: &str,
        prefix: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Result<CatalogPage, CatalogError> {
        let entry = self
            .sources
            .get(source)
            .ok_or_else(|| CatalogError::NotFound(source.to_string()))?;

        let limit = limit.clamp(1, 200);

        let mut prefix_counts: BTreeMap<String, usize> = BTreeMap::new();
        for e in &entry.entries {
            *prefix_counts.entry(e.document_type_prefix.clone()).or_insert(0) += 1;
        }

        let filtered: Vec<&CatalogEntry> = entry
            .entries
            .iter()
            .filter(|e| prefix.map(|p| e.document_type_prefix == p).unwrap_or(true))
            .collect();

        let count_filtered = filtered.len();
        let items = filtered
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        Ok(CatalogPage {
            count_total: entry.entries.len(),
            count_filtered,
            prefix_counts,
            items,
        })
    }
}

/// On-disk shape of one source's discovery snapshot file.
#[derive(Deserialize)]
struct SnapshotFile {
    name: String,
    entries: Vec<CatalogEntry>,
}

/// Load every `*.json` snapshot file in `dir` into a fresh [`Catalog`]
/// (spec §4.4: "Built offline from a discovery snapshot; loaded at process
/// start"). A missing or unreadable directory is `ErrCatalogNotFound`, not a
/// silent empty catalog, since a misconfigured root means every
/// `list_available_documents` call would otherwise fail with a confusing
/// "source unknown" instead of pointing at the real cause.
pub fn load_from_dir(dir: &Path) -> Result<Catalog, CatalogError> {
    let read_dir = std::fs::read_dir(dir).map_err(|e| CatalogError::NotFound(format!("{}: {e}", dir.display())))?;

    let mut catalog = Catalog::new();
    for entry in read_dir {
        let entry = entry.map_err(|e| CatalogError::NotFound(e.to_string()))?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }

        let content = std::fs::read_to_string(&path).map_err(|e| CatalogError::NotFound(format!("{}: {e}", path.display())))?;
        let snapshot: SnapshotFile =
            serde_json::from_str(&content).map_err(|e| CatalogError::NotFound(format!("{}: {e}", path.display())))?;

        catalog.register(CatalogSource::new(snapshot.name, snapshot.entries));
    }

    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, prefix: &str) -> CatalogEntry {
        CatalogEntry {
            source: "S".to_string(),
            document_id: id.to_string(),
            canonical_url: format!("https://example.test/{id}"),
            document_type_prefix: prefix.to_string(),
        }
    }

    fn sample_catalog() -> Catalog {
        let mut entries = Vec::new();
        for i in 0..250 {
            entries.push(entry(&format!("jlr-{i:04}"), "jlr"));
        }
        for i in 0..100 {
            entries.push(entry(&format!("NJRE{i:04}"), "NJRE"));
        }
        let mut catalog = Catalog::new();
        catalog.register(CatalogSource::new("S", entries));
        catalog
    }

    /// S5: 250 `jlr-*` + 100 `NJRE*`; prefix-filtered paging returns the
    /// expected page sizes while `prefix_counts` stays source-wide.
    #[test]
    fn s5_catalog_pagination() {
        let catalog = sample_catalog();

        let page1 = catalog.list_available("S", Some("jlr"), 0, 200).unwrap();
        assert_eq!(page1.items.len(), 200);
        assert!(page1.items.iter().all(|i| i.document_type_prefix == "jlr"));
        assert_eq!(page1.prefix_counts.get("jlr"), Some(&250));
        assert_eq!(page1.prefix_counts.get("NJRE"), Some(&100));

        let page2 = catalog.list_available("S", Some("jlr"), 200, 200).unwrap();
        assert_eq!(page2.items.len(), 50);
        assert_eq!(page2.prefix_counts.get("jlr"), Some(&250));
    }

    #[test]
    fn unknown_source_errors() {
        let catalog = sample_catalog();
        let err = catalog.list_available("missing", None, 0, 10);
        assert!(matches!(err, Err(CatalogError::NotFound(_))));
    }

    #[test]
    fn limit_is_clamped_to_200() {
        let catalog = sample_catalog();
        let page = catalog.list_available("S", None, 0, 10_000).unwrap();
        assert_eq!(page.items.len(), 200);
    }

    #[test]
    fn entries_are_lexicographically_ordered() {
        let catalog = sample_catalog();
        let page = catalog.list_available("S", Some("NJRE"), 0, 200).unwrap();
        let ids: Vec<&str> = page.items.iter().map(|i| i.document_id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn no_prefix_filter_returns_all_types() {
        let catalog = sample_catalog();
        let page = catalog.list_available("S", None, 0, 200).unwrap();
        assert_eq!(page.count_filtered, 350);
    }

    #[test]
    fn load_from_dir_reads_every_snapshot_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("statutes.json"),
            r#"{"name":"S","entries":[{"source":"S","document_id":"jlr-0001","canonical_url":"https://example.test/jlr-0001","document_type_prefix":"jlr"}]}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("README.md"), "not json, must be ignored").unwrap();

        let catalog = load_from_dir(dir.path()).unwrap();
        let page = catalog.list_available("S", None, 0, 200).unwrap();
        assert_eq!(page.count_total, 1);
    }

    #[test]
    fn load_from_dir_missing_directory_errors() {
        let err = load_from_dir(Path::new("/nonexistent/catalog/snapshots"));
        assert!(matches!(err, Err(CatalogError::NotFound(_))));
    }
}
