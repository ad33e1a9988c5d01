//! `_sort` handling
//!
//! `_sort=a,-b` sorts ascending by `a`, then descending by `b`. The sort is
//! stable, so records equal on every listed field keep their original order.

use std::cmp::Ordering;

use serde_json::Value;

use super::QueryParams;
use crate::value::sort_cmp;

/// One `_sort` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    pub fn parse(entry: &str) -> Self {
        match entry.strip_prefix('-') {
            Some(field) => Self { field: field.to_string(), descending: true },
            None => Self { field: entry.to_string(), descending: false },
        }
    }

    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        let ord = sort_cmp(a.get(&self.field), b.get(&self.field));
        if self.descending {
            ord.reverse()
        } else {
            ord
        }
    }
}

/// Parse a comma-separated `_sort` value
pub fn parse_keys(value: &str) -> Vec<SortKey> {
    value.split(',').map(SortKey::parse).collect()
}

/// Sort `items` by the `_sort` parameter, if present and non-empty
pub fn apply(mut items: Vec<Value>, params: &QueryParams) -> Vec<Value> {
    let Some(value) = params.get_non_empty("_sort") else {
        return items;
    };

    let keys = parse_keys(value);
    items.sort_by(|a, b| {
        keys.iter()
            .map(|key| key.compare(a, b))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    });
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn books() -> Vec<Value> {
        vec![
            json!({"Id": 1, "author": "le guin", "year": 1969}),
            json!({"Id": 2, "author": "banks", "year": 1987}),
            json!({"Id": 3, "author": "le guin", "year": 1974}),
            json!({"Id": 4, "author": "banks", "year": 1987}),
            json!({"Id": 5, "title": "anonymous"}),
        ]
    }

    fn sorted_ids(sort: &str) -> Vec<i64> {
        let params = QueryParams::from_pairs([("_sort", sort)]);
        apply(books(), &params)
            .iter()
            .map(|v| v["Id"].as_i64().unwrap())
            .collect()
    }

    #[test]
    fn test_parse_keys() {
        assert_eq!(
            parse_keys("a,-b"),
            vec![
                SortKey { field: "a".to_string(), descending: false },
                SortKey { field: "b".to_string(), descending: true },
            ]
        );
    }

    #[test]
    fn test_no_sort_keeps_order() {
        let params = QueryParams::new();
        assert_eq!(apply(books(), &params), books());
        assert_eq!(sorted_ids(""), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_sort_ascending_numeric() {
        assert_eq!(sorted_ids("year"), vec![1, 3, 2, 4, 5]);
    }

    #[test]
    fn test_sort_descending() {
        // Missing fields sort last ascending, first descending
        assert_eq!(sorted_ids("-year"), vec![5, 2, 4, 3, 1]);
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        // 2 and 4 tie on both keys and keep insertion order
        assert_eq!(sorted_ids("author,year"), vec![2, 4, 1, 3, 5]);
    }

    #[test]
    fn test_sort_multi_key_mixed_direction() {
        assert_eq!(sorted_ids("author,-year"), vec![2, 4, 3, 1, 5]);
    }

    #[test]
    fn test_sort_by_unknown_field_is_noop() {
        assert_eq!(sorted_ids("missing"), vec![1, 2, 3, 4, 5]);
    }
}
