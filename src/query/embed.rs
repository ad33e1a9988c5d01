//! `_embed` handling
//!
//! `_embed=comments` attaches to every result record a `comments` field with
//! the records of the `comments` collection whose `postId` equals the
//! record's `Id`. One level only; embedded records are copied as stored.

use serde_json::Value;

use super::QueryParams;
use crate::store::{Store, ID_FIELD};
use crate::value::strict_eq;

/// Foreign key field matched against the parent's `Id`
pub const FOREIGN_KEY_FIELD: &str = "postId";

/// Attach related records named by `_embed`.
///
/// Does nothing when `_embed` is absent, empty, or names something that is
/// not an array collection.
pub fn apply(mut items: Vec<Value>, params: &QueryParams, store: &Store) -> Vec<Value> {
    let Some(name) = params.get_non_empty("_embed") else {
        return items;
    };
    let Some(related) = store.collection(name).and_then(Value::as_array) else {
        return items;
    };

    for item in items.iter_mut() {
        let children: Vec<Value> = related
            .iter()
            .filter(|child| strict_eq(child.get(FOREIGN_KEY_FIELD), item.get(ID_FIELD)))
            .cloned()
            .collect();

        if let Value::Object(fields) = item {
            fields.insert(name.to_string(), Value::Array(children));
        }
    }
    items
}
