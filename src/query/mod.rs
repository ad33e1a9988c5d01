//! Query pipeline for collection reads
//!
//! A `GET /<collection>` runs the collection's records through four stages in
//! a fixed order. Query parameters select what each stage does but never
//! reorder the stages:
//!
//! 1. [`filter`] - keep records matching every non-reserved parameter
//! 2. [`sort`] - stable multi-key sort from `_sort`
//! 3. [`range`] - `_start`/`_end`/`_limit` slicing, or `_page`/`_per_page`
//! 4. [`embed`] - attach related records named by `_embed`
//!
//! Stages work on owned copies; the store is only read.

pub mod embed;
pub mod filter;
pub mod range;
pub mod sort;

use serde_json::Value;

use crate::store::Store;

/// Query keys that control the pipeline and never act as filters
pub const RESERVED_KEYS: [&str; 7] = [
    "_sort", "_start", "_end", "_limit", "_page", "_per_page", "_embed",
];

/// Check whether a query key is a pipeline control key
pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Decoded query string: ordered key/value pairs, duplicates kept
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// First value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First non-empty value for `key` (empty values fall back to defaults)
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// Whether `key` appears at all, even with an empty value
    pub fn has(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// Every pair that is not a reserved control key
    pub fn filters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs
            .iter()
            .filter(|(k, _)| !is_reserved(k))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Run all pipeline stages over a collection of `store`.
///
/// Unknown collections and non-array entries produce an empty result.
pub fn run(store: &Store, collection: &str, params: &QueryParams) -> Vec<Value> {
    let items = filter::apply(store.records(collection), params);
    let items = sort::apply(items, params);
    let items = range::apply(items, params);
    embed::apply(items, params, store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn todo_store() -> Store {
        Store::from_snapshot(json!({
            "todos": [
                {"Id": 1, "title": "a", "completed": true},
                {"Id": 2, "title": "b", "completed": false},
                {"Id": 3, "title": "c", "completed": true},
                {"Id": 4, "title": "d", "completed": true},
                {"Id": 5, "title": "e", "completed": false}
            ],
            "comments": [
                {"Id": 1, "postId": 4, "body": "nice"},
                {"Id": 2, "postId": 3, "body": "meh"}
            ]
        }))
        .unwrap()
    }

    fn ids(items: &[Value]) -> Vec<i64> {
        items.iter().map(|v| v["Id"].as_i64().unwrap()).collect()
    }

    // ============================================================================
    // QueryParams
    // ============================================================================

    #[test]
    fn test_params_get_first_value() {
        let params = QueryParams::from_pairs([("a", "1"), ("a", "2"), ("b", "")]);

        assert_eq!(params.get("a"), Some("1"));
        assert_eq!(params.get("b"), Some(""));
        assert_eq!(params.get_non_empty("b"), None);
        assert!(params.has("b"));
        assert!(!params.has("c"));
    }

    #[test]
    fn test_params_filters_skip_reserved() {
        let params = QueryParams::from_pairs([
            ("_sort", "Id"),
            ("title", "a"),
            ("_embed", "comments"),
            ("Id>", "2"),
            ("_per_page", "3"),
        ]);

        let filters: Vec<(&str, &str)> = params.filters().collect();
        assert_eq!(filters, vec![("title", "a"), ("Id>", "2")]);
    }

    #[test]
    fn test_reserved_keys() {
        for key in RESERVED_KEYS {
            assert!(is_reserved(key));
        }
        assert!(!is_reserved("_other"));
        assert!(!is_reserved("sort"));
    }

    // ============================================================================
    // Full Pipeline
    // ============================================================================

    #[test]
    fn test_run_no_params_returns_first_page() {
        let store = todo_store();
        let items = run(&store, "todos", &QueryParams::new());
        assert_eq!(ids(&items), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_run_unknown_collection_is_empty() {
        let store = todo_store();
        assert!(run(&store, "nope", &QueryParams::new()).is_empty());
    }

    #[test]
    fn test_run_filter_sort_limit() {
        let store = todo_store();
        let params = QueryParams::from_pairs([
            ("completed==", "true"),
            ("_sort", "-Id"),
            ("_limit", "2"),
        ]);

        let items = run(&store, "todos", &params);
        assert_eq!(ids(&items), vec![4, 3]);
    }

    #[test]
    fn test_run_stages_filter_before_paginate() {
        let store = todo_store();
        let params = QueryParams::from_pairs([
            ("completed", "false"),
            ("_page", "1"),
            ("_per_page", "1"),
        ]);

        let items = run(&store, "todos", &params);
        assert_eq!(ids(&items), vec![2]);
    }

    #[test]
    fn test_run_embed_after_slicing() {
        let store = todo_store();
        let params = QueryParams::from_pairs([("_start", "2"), ("_end", "4"), ("_embed", "comments")]);

        let items = run(&store, "todos", &params);
        assert_eq!(ids(&items), vec![3, 4]);
        assert_eq!(items[0]["comments"], json!([{"Id": 2, "postId": 3, "body": "meh"}]));
        assert_eq!(items[1]["comments"], json!([{"Id": 1, "postId": 4, "body": "nice"}]));

        // Store records are untouched
        assert!(store.records("todos")[2].get("comments").is_none());
    }
}
