//! mockdb - JSON-file backed mock REST server
//!
//! Collections live in memory, are loaded once from a JSON snapshot and are
//! written back after every insert. `GET` requests run a fixed query pipeline
//! (filter, sort, range/paginate, embed); `POST` appends records with
//! auto-incremented `Id`s.

pub mod config;
pub mod error;
pub mod metrics;
pub mod persistence;
pub mod query;
pub mod router;
pub mod server;
pub mod store;
pub mod value;

pub use config::ServerConfig;
pub use error::{Result, StoreError};
pub use metrics::{Metrics, MetricsSnapshot, Operation};
pub use persistence::{JsonFileSnapshot, MemorySnapshot, SnapshotStore};
pub use query::QueryParams;
pub use router::{Reply, ReplyBody, RequestRouter};
pub use store::Store;
