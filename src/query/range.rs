//! Range slicing and pagination
//!
//! `_start`, `_end` and `_limit` select a range; when any of them is present
//! pagination is skipped entirely. Otherwise `_page`/`_per_page` pick a page
//! (defaults: page 1, 10 per page).
//!
//! Bounds follow array `slice` rules: negative indices count from the end,
//! out-of-range indices clamp, and an unparsable bound (`None` here) acts as 0.

use serde_json::Value;

use super::QueryParams;
use crate::value::parse_int;

/// Default page size when `_per_page` is absent
pub const DEFAULT_PER_PAGE: i64 = 10;

/// Resolve a slice bound against a collection length
fn resolve_bound(bound: Option<i64>, len: usize) -> usize {
    let len_i = i64::try_from(len).unwrap_or(i64::MAX);
    match bound {
        None => 0,
        Some(b) if b < 0 => usize::try_from(len_i.saturating_add(b).max(0)).unwrap_or(0),
        Some(b) => usize::try_from(b.min(len_i)).unwrap_or(len),
    }
}

/// `items.slice(start, end)` with unparsable bounds treated as 0
pub fn slice(items: Vec<Value>, start: Option<i64>, end: Option<i64>) -> Vec<Value> {
    let len = items.len();
    let from = resolve_bound(start, len);
    let to = resolve_bound(end, len);
    if from >= to {
        return Vec::new();
    }
    items.into_iter().skip(from).take(to - from).collect()
}

/// Integer parameter with a default for absent or empty values
fn int_param(params: &QueryParams, key: &str, default: i64) -> Option<i64> {
    match params.get_non_empty(key) {
        Some(raw) => parse_int(raw),
        None => Some(default),
    }
}

/// Whether the range group (`_start`, `_end`, `_limit`) is in effect
pub fn has_range(params: &QueryParams) -> bool {
    params.has("_start") || params.has("_end") || params.has("_limit")
}

/// Range slicing: `slice(start, end || limit)`
pub fn apply_range(items: Vec<Value>, params: &QueryParams) -> Vec<Value> {
    let len = i64::try_from(items.len()).unwrap_or(i64::MAX);
    let start = int_param(params, "_start", 0);
    let end = int_param(params, "_end", len);
    let limit = int_param(params, "_limit", len);

    // A zero or unparsable end falls back to the limit
    let end = match end {
        Some(e) if e != 0 => Some(e),
        _ => limit,
    };
    slice(items, start, end)
}

/// Page slicing: `slice((page - 1) * perPage, (page - 1) * perPage + perPage)`
pub fn apply_pagination(items: Vec<Value>, params: &QueryParams) -> Vec<Value> {
    let page = int_param(params, "_page", 1);
    let per_page = int_param(params, "_per_page", DEFAULT_PER_PAGE);

    let bounds = page.zip(per_page).map(|(page, per_page)| {
        let start = page.saturating_sub(1).saturating_mul(per_page);
        (start, start.saturating_add(per_page))
    });

    match bounds {
        Some((start, end)) => slice(items, Some(start), Some(end)),
        None => Vec::new(),
    }
}

/// Apply range slicing if requested, pagination otherwise
pub fn apply(items: Vec<Value>, params: &QueryParams) -> Vec<Value> {
    if has_range(params) {
        apply_range(items, params)
    } else {
        apply_pagination(items, params)
    }
}
