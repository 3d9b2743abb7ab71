//! Vector-store filter algebra (C5 filter-composition contract, spec §4.5/§9).
//!
//! Filters are built from scalar-equality predicates and normalised before
//! use: a single predicate is a bare [`FilterExpr::Eq`] node; two or more are
//! always wrapped in an explicit [`FilterExpr::And`] node. This is not
//! cosmetic — at least one widely deployed vector-store backend silently
//! interpreted an unwrapped multi-predicate filter list as a disjunction,
//! producing cross-tenant leakage. Normalising through [`FilterBuilder::build`]
//! is the only path that should ever construct a filter passed to
//! [`crate::vector_store`].

use serde::Serialize;

/// A scalar value usable in an equality predicate. No nested structures
/// (spec §3: metadata is scalar-only).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        ScalarValue::Str(s.to_string())
    }
}
impl From<String> for ScalarValue {
    fn from(s: String) -> Self {
        ScalarValue::Str(s)
    }
}
impl From<i64> for ScalarValue {
    fn from(v: i64) -> Self {
        ScalarValue::Int(v)
    }
}
impl From<bool> for ScalarValue {
    fn from(v: bool) -> Self {
        ScalarValue::Bool(v)
    }
}

/// A normalised filter expression. `n = 1` predicate ⇒ bare [`FilterExpr::Eq`];
/// `n >= 2` ⇒ explicit [`FilterExpr::And`] (testable property 7).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterExpr {
    Eq { field: String, value: ScalarValue },
    And { predicates: Vec<FilterExpr> },
}

impl FilterExpr {
    /// Number of leaf equality predicates this expression carries.
    pub fn predicate_count(&self) -> usize {
        match self {
            FilterExpr::Eq { .. } => 1,
            FilterExpr::And { predicates } => predicates.len(),
        }
    }

    /// Whether `metadata` (a flat set of key/value scalars, as persisted per
    /// chunk) satisfies this filter. Used by the in-memory vector-store
    /// realisation and by tests.
    pub fn matches(&self, metadata: &[(String, ScalarValue)]) -> bool {
        match self {
            FilterExpr::Eq { field, value } => metadata
                .iter()
                .any(|(k, v)| k == field && v == value),
            FilterExpr::And { predicates } => predicates.iter().all(|p| p.matches(metadata)),
        }
    }
}

/// Accumulates equality predicates and normalises them into a [`FilterExpr`]
/// on [`build`](FilterBuilder::build). This is the only supported
/// construction path — never build [`FilterExpr::And`] by hand outside tests.
#[derive(Debug, Default, Clone)]
pub struct FilterBuilder {
    predicates: Vec<(String, ScalarValue)>,
}

impl FilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.predicates.push((field.into(), value.into()));
        self
    }

    /// Same as [`eq`](Self::eq) but skips the predicate when `value` is
    /// `None` — convenient for optional query parameters like `law_abbrev`.
    pub fn maybe_eq(self, field: impl Into<String>, value: Option<impl Into<ScalarValue>>) -> Self {
        match value {
            Some(v) => self.eq(field, v),
            None => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Normalise the accumulated predicates into a [`FilterExpr`]. Returns
    /// `None` if no predicates were added.
    pub fn build(self) -> Option<FilterExpr> {
        match self.predicates.len() {
            0 => None,
            1 => {
                let (field, value) = self.predicates.into_iter().next().unwrap();
                Some(FilterExpr::Eq { field, value })
            }
            _ => Some(FilterExpr::And {
                predicates: self
                    .predicates
                    .into_iter()
                    .map(|(field, value)| FilterExpr::Eq { field, value })
                    .collect(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_predicate_is_bare_eq() {
        let expr = FilterBuilder::new().eq("tenant_id", "T1").build().unwrap();
        assert!(matches!(expr, FilterExpr::Eq { .. }));
        assert_eq!(expr.predicate_count(), 1);
    }

    #[test]
    fn two_predicates_are_wrapped_in_and() {
        let expr = FilterBuilder::new()
            .eq("tenant_id", "T1")
            .eq("case_id", "C1")
            .build()
            .unwrap();
        assert!(matches!(expr, FilterExpr::And { .. }));
        assert_eq!(expr.predicate_count(), 2);
    }

    #[test]
    fn empty_builder_yields_none() {
        assert!(FilterBuilder::new().build().is_none());
    }

    #[test]
    fn maybe_eq_skips_none() {
        let expr = FilterBuilder::new()
            .eq("tenant_id", "T1")
            .maybe_eq("law_abbrev", None::<String>)
            .build()
            .unwrap();
        assert_eq!(expr.predicate_count(), 1);
    }

    #[test]
    fn matches_and_semantics_not_or() {
        let expr = FilterBuilder::new()
            .eq("tenant_id", "T1")
            .eq("case_id", "C1")
            .build()
            .unwrap();
        let partial = vec![("tenant_id".to_string(), ScalarValue::Str("T1".to_string()))];
        assert!(!expr.matches(&partial), "AND must require every predicate");

        let full = vec![
            ("tenant_id".to_string(), ScalarValue::Str("T1".to_string())),
            ("case_id".to_string(), ScalarValue::Str("C1".to_string())),
        ];
        assert!(expr.matches(&full));
    }
}
