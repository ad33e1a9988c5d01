//! Store - in-memory collections with per-collection id counters
//!
//! The store maps collection names to JSON arrays of records and keeps a
//! parallel map of "next id" counters. It is built once from a snapshot at
//! startup, mutated only by inserts, and serialized back to a snapshot after
//! every insert.
//!
//! # Invariants
//!
//! - For every collection with a counter, the counter is strictly greater
//!   than every `Id` in that collection. Counters only ever grow.
//! - Ids never exceed [`MAX_ID`]. A snapshot holding a larger `Id` is rejected
//!   at load, and a collection whose counter passes `MAX_ID` refuses inserts.
//! - Top-level snapshot values that are not arrays are kept verbatim and have
//!   no counter until the first insert replaces them with an empty collection.
//! - Collection order and record field order are preserved.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::{Result, StoreError};

/// Name of the identity field injected into every inserted record.
pub const ID_FIELD: &str = "Id";

/// Largest assignable id: 2^53 - 1, the last integer a JSON number holds exactly
pub const MAX_ID: u64 = (1 << 53) - 1;

/// In-memory collections plus next-id counters
#[derive(Debug, Default, Clone)]
pub struct Store {
    /// Collection name -> JSON value (an array of records for real collections)
    collections: Map<String, Value>,
    /// Collection name -> next id to assign
    next_ids: HashMap<String, u64>,
}

impl Store {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a snapshot value.
    ///
    /// The snapshot must be a JSON object. Every array entry gets a counter of
    /// `1 + max(Id)`, where missing or non-numeric ids count as 0. An `Id`
    /// above [`MAX_ID`] makes the snapshot invalid.
    pub fn from_snapshot(snapshot: Value) -> Result<Self> {
        let collections = match snapshot {
            Value::Object(map) => map,
            other => {
                return Err(StoreError::InvalidSnapshot(format!(
                    "top-level value must be an object, found {}",
                    json_type_name(&other)
                )))
            }
        };

        let next_ids = collections
            .iter()
            .filter_map(|(name, value)| value.as_array().map(|records| (name, records)))
            .map(|(name, records)| -> Result<(String, u64)> {
                Ok((name.clone(), max_id(name, records)? + 1))
            })
            .collect::<Result<HashMap<_, _>>>()?;

        Ok(Self { collections, next_ids })
    }

    /// Serialize the whole store as a snapshot value
    pub fn snapshot(&self) -> Value {
        Value::Object(self.collections.clone())
    }

    /// Raw value stored under a collection name
    pub fn collection(&self, name: &str) -> Option<&Value> {
        self.collections.get(name)
    }

    /// Records of a collection; empty for unknown or non-array entries
    pub fn records(&self, name: &str) -> &[Value] {
        self.collections
            .get(name)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Find the record whose `Id` equals `id`
    pub fn find_by_id(&self, name: &str, id: i64) -> Option<&Value> {
        self.records(name).iter().find(|record| {
            record
                .get(ID_FIELD)
                .and_then(Value::as_f64)
                .is_some_and(|record_id| record_id == id as f64)
        })
    }

    /// Next id that `assign_id` would hand out, if the collection has a counter
    pub fn next_id(&self, name: &str) -> Option<u64> {
        self.next_ids.get(name).copied()
    }

    /// Number of top-level entries
    pub fn collection_count(&self) -> usize {
        self.collections.len()
    }

    /// Total number of records across all array collections
    pub fn record_count(&self) -> usize {
        self.collections
            .values()
            .filter_map(Value::as_array)
            .map(Vec::len)
            .sum()
    }

    /// Identity assigner: reserve the next id for a collection.
    ///
    /// A missing or non-array collection is (re)initialized to an empty array
    /// with its counter reset to 1. Returns the current counter and advances it,
    /// or `IdsExhausted` once the counter has passed [`MAX_ID`].
    pub fn assign_id(&mut self, name: &str) -> Result<u64> {
        let is_array = self
            .collections
            .get(name)
            .is_some_and(Value::is_array);

        if !is_array {
            self.collections
                .insert(name.to_string(), Value::Array(Vec::new()));
            self.next_ids.insert(name.to_string(), 1);
        }

        let counter = self.next_ids.entry(name.to_string()).or_insert(1);
        let id = *counter;
        if id > MAX_ID {
            return Err(StoreError::IdsExhausted(name.to_string()));
        }
        *counter = id + 1;
        Ok(id)
    }

    /// Append a new record built from `body`, returning the stored record.
    ///
    /// The body's fields are spread into a fresh record and `Id` is set to a
    /// newly assigned id (overwriting any client-supplied `Id` in place).
    /// Nothing is appended when no id can be assigned.
    pub fn insert(&mut self, name: &str, body: Value) -> Result<Value> {
        let id = self.assign_id(name)?;

        let mut record = spread_fields(body);
        record.insert(ID_FIELD.to_string(), Value::from(id));
        let record = Value::Object(record);

        if let Some(Value::Array(records)) = self.collections.get_mut(name) {
            records.push(record.clone());
        }

        Ok(record)
    }
}

/// Highest numeric `Id` in a collection, treating anything else as 0.
fn max_id(name: &str, records: &[Value]) -> Result<u64> {
    let mut max = 0;
    for id in records.iter().filter_map(|record| record.get(ID_FIELD)) {
        max = max.max(id_value(name, id)?);
    }
    Ok(max)
}

fn id_value(name: &str, value: &Value) -> Result<u64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => crate::value::parse_number(s),
        _ => None,
    };
    match n {
        Some(n) if n > MAX_ID as f64 => Err(StoreError::InvalidSnapshot(format!(
            "collection {} holds Id {} above the largest assignable id {}",
            name, value, MAX_ID
        ))),
        Some(n) if n > 0.0 => Ok(n.floor() as u64),
        _ => Ok(0),
    }
}

/// Spread an insert body into record fields the way object spread does:
/// objects keep their fields, arrays and strings become index-keyed fields,
/// other scalars contribute nothing.
fn spread_fields(body: Value) -> Map<String, Value> {
    match body {
        Value::Object(map) => map,
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| (i.to_string(), item))
            .collect(),
        Value::String(s) => s
            .chars()
            .enumerate()
            .map(|(i, c)| (i.to_string(), Value::String(c.to_string())))
            .collect(),
        _ => Map::new(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
