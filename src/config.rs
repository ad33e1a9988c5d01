//! Server configuration
//!
//! Plain values only; the binary fills this from its command line and
//! environment.

use std::path::PathBuf;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Everything needed to start a server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Snapshot file backing the store
    pub db_path: PathBuf,
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Create an empty snapshot when `db_path` does not exist
    pub init: bool,
    /// Permissive CORS for browser clients
    pub cors: bool,
    /// Collect request metrics
    pub metrics: bool,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl ServerConfig {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            init: false,
            cors: true,
            metrics: false,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }

    /// `host:port` for binding
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
