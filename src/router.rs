//! RequestRouter - dispatches requests onto the store
//!
//! The router is the transport-independent entry point: it receives a method,
//! a raw path, decoded query parameters and the raw body, and returns a status
//! plus a JSON payload. The HTTP layer in [`crate::server`] is a thin adapter
//! around [`RequestRouter::handle`].
//!
//! # Routing
//!
//! | Method           | Path                    | Result                          |
//! |------------------|-------------------------|---------------------------------|
//! | GET              | `/`                     | whole store, 200                |
//! | GET              | `/<collection>`         | query pipeline, 200             |
//! | GET              | `/<collection>/<id>`    | record 200, or 404              |
//! | POST             | `/<collection>`         | insert 201, or 400 on bad JSON  |
//! | POST             | anything else           | 400                             |
//! | PUT/PATCH/DELETE | any                     | 501                             |
//! | other            | any                     | 405                             |
//!
//! # Concurrency
//!
//! The store sits behind one `RwLock`. Reads run the whole pipeline under the
//! read lock; inserts hold the write lock across id assignment, append and
//! persist, so ids are handed out once and snapshot writes never interleave.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use axum::http::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::metrics::{Metrics, Operation};
use crate::persistence::SnapshotStore;
use crate::query::{self, QueryParams};
use crate::store::Store;
use crate::value::parse_int;

pub const MSG_NOT_FOUND: &str = "Item not found.";
pub const MSG_APPENDED: &str = "Appended";
pub const MSG_INVALID_JSON: &str = "Invalid JSON body.";
pub const MSG_INVALID_POST_PATH: &str = "Invalid path for POST request.";
pub const MSG_NOT_IMPLEMENTED: &str = "Not implemented.";
pub const MSG_METHOD_NOT_ALLOWED: &str = "Method not allowed";
pub const MSG_INTERNAL: &str = "Internal server error.";

/// JSON payload of a reply
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReplyBody {
    /// Store content passed through unchanged
    Data(Value),

    Appended {
        message: &'static str,
        data: Value,
    },

    Message {
        message: &'static str,
    },
}

/// Response produced by the router
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: ReplyBody,
    /// What the request did (for logs and metrics)
    pub operation: Operation,
}

impl Reply {
    fn ok(operation: Operation, data: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: ReplyBody::Data(data),
            operation,
        }
    }

    /// `{ "message": ... }` reply
    pub fn message(status: StatusCode, operation: Operation, message: &'static str) -> Self {
        Self {
            status,
            body: ReplyBody::Message { message },
            operation,
        }
    }

    /// Generic 500 reply; details stay in the log
    pub fn internal_error() -> Self {
        Self::message(StatusCode::INTERNAL_SERVER_ERROR, Operation::Rejected, MSG_INTERNAL)
    }
}

/// Split a request path into trimmed, non-empty segments
pub fn path_segments(path: &str) -> Vec<&str> {
    path.split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Store + persistence adapter, shared by every request
pub struct RequestRouter {
    store: RwLock<Store>,
    snapshot: Box<dyn SnapshotStore>,
    metrics: Option<Arc<Metrics>>,
}

impl RequestRouter {
    /// Load the store from `snapshot`.
    ///
    /// Fails if the snapshot cannot be read or is not a JSON object; callers
    /// treat this as fatal.
    pub fn open(snapshot: Box<dyn SnapshotStore>) -> Result<Self> {
        let store = Store::from_snapshot(snapshot.load()?)?;
        Ok(Self::with_store(store, snapshot))
    }

    /// Wrap an already-built store
    pub fn with_store(store: Store, snapshot: Box<dyn SnapshotStore>) -> Self {
        Self {
            store: RwLock::new(store),
            snapshot,
            metrics: None,
        }
    }

    /// Attach a metrics collector for persist timings
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Where the snapshot lives (for logs)
    pub fn snapshot_location(&self) -> String {
        self.snapshot.describe()
    }

    fn read_store(&self) -> Result<RwLockReadGuard<'_, Store>> {
        self.store.read().map_err(|_| StoreError::LockPoisoned("read"))
    }

    fn write_store(&self) -> Result<RwLockWriteGuard<'_, Store>> {
        self.store.write().map_err(|_| StoreError::LockPoisoned("write"))
    }

    /// (collections, records) currently held
    pub fn stats(&self) -> Result<(usize, usize)> {
        let store = self.read_store()?;
        Ok((store.collection_count(), store.record_count()))
    }

    /// Copy of the whole store
    pub fn snapshot_value(&self) -> Result<Value> {
        Ok(self.read_store()?.snapshot())
    }

    /// Write the current store to the snapshot
    pub fn flush(&self) -> Result<()> {
        let store = self.read_store()?;
        self.snapshot.persist(&store.snapshot())
    }

    /// Dispatch one request
    pub fn handle(&self, method: &Method, path: &str, query: &QueryParams, body: &[u8]) -> Reply {
        let segments = path_segments(path);

        let result = match *method {
            Method::GET => self.handle_get(&segments, query),
            Method::POST => self.handle_post(&segments, body),
            Method::PUT | Method::PATCH | Method::DELETE => Ok(Reply::message(
                StatusCode::NOT_IMPLEMENTED,
                Operation::Rejected,
                MSG_NOT_IMPLEMENTED,
            )),
            _ => Ok(Reply::message(
                StatusCode::METHOD_NOT_ALLOWED,
                Operation::Rejected,
                MSG_METHOD_NOT_ALLOWED,
            )),
        };

        result.unwrap_or_else(|e| {
            tracing::error!(code = e.code(), error = %e, %method, path, "request failed");
            Reply::internal_error()
        })
    }

    fn handle_get(&self, segments: &[&str], query: &QueryParams) -> Result<Reply> {
        let store = self.read_store()?;

        let Some(collection) = segments.first() else {
            return Ok(Reply::ok(Operation::Root, store.snapshot()));
        };

        let Some(id) = segments.get(1) else {
            let items = query::run(&store, collection, query);
            return Ok(Reply::ok(Operation::List, Value::Array(items)));
        };

        let found = parse_int(id).and_then(|id| store.find_by_id(collection, id));
        Ok(match found {
            Some(record) => Reply::ok(Operation::GetItem, record.clone()),
            None => Reply::message(StatusCode::NOT_FOUND, Operation::GetItem, MSG_NOT_FOUND),
        })
    }

    fn handle_post(&self, segments: &[&str], body: &[u8]) -> Result<Reply> {
        let [collection] = segments else {
            return Ok(Reply::message(
                StatusCode::BAD_REQUEST,
                Operation::Rejected,
                MSG_INVALID_POST_PATH,
            ));
        };

        let body = match serde_json::from_slice::<Value>(body) {
            Ok(Value::Null) | Err(_) => {
                return Ok(Reply::message(
                    StatusCode::BAD_REQUEST,
                    Operation::Rejected,
                    MSG_INVALID_JSON,
                ))
            }
            Ok(body) => body,
        };

        let mut store = self.write_store()?;
        let record = store.insert(collection, body)?;

        // Persist failures are logged only; the insert stands
        let started = Instant::now();
        let persisted = self.snapshot.persist(&store.snapshot());
        if let Some(metrics) = &self.metrics {
            metrics.record_persist(started.elapsed().as_millis() as u64, persisted.is_ok());
        }
        if let Err(e) = persisted {
            tracing::error!(
                code = e.code(),
                error = %e,
                location = %self.snapshot.describe(),
                "failed to persist snapshot after insert"
            );
        }

        Ok(Reply {
            status: StatusCode::CREATED,
            body: ReplyBody::Appended {
                message: MSG_APPENDED,
                data: record,
            },
            operation: Operation::Insert,
        })
    }
}
