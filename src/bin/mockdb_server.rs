//! mockdb server - serves a JSON snapshot file as a REST API
//!
//! Usage:
//!   mockdb-server ./db.json [--port 8000] [--host 0.0.0.0] [--init] [--metrics]
//!
//! The snapshot must be a JSON object mapping collection names to arrays of
//! records. It is rewritten after every successful POST and once more on
//! shutdown.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use mockdb::config::{DEFAULT_HOST, DEFAULT_LOG_LEVEL, DEFAULT_PORT};
use mockdb::server::{self, AppState};
use mockdb::{JsonFileSnapshot, Metrics, MetricsSnapshot, RequestRouter, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "mockdb-server", version, about = "Disposable REST backend over a JSON file")]
struct Cli {
    /// Path to the JSON snapshot file
    #[arg(env = "MOCKDB_PATH")]
    db_path: PathBuf,

    /// Address to bind
    #[arg(long, env = "MOCKDB_HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// Port to bind
    #[arg(short, long, env = "MOCKDB_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Create an empty snapshot if the file does not exist
    #[arg(long)]
    init: bool,

    /// Disable permissive CORS headers
    #[arg(long)]
    no_cors: bool,

    /// Collect request metrics and log them on shutdown
    #[arg(long)]
    metrics: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = DEFAULT_LOG_LEVEL)]
    log_level: String,
}

impl From<Cli> for ServerConfig {
    fn from(cli: Cli) -> Self {
        Self {
            db_path: cli.db_path,
            host: cli.host,
            port: cli.port,
            init: cli.init,
            cors: !cli.no_cors,
            metrics: cli.metrics,
            log_level: cli.log_level,
        }
    }
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn log_metrics(snapshot: &MetricsSnapshot) {
    tracing::info!(
        requests = snapshot.request_count,
        slow = snapshot.slow_request_count,
        p50_ms = snapshot.p50_ms,
        p95_ms = snapshot.p95_ms,
        p99_ms = snapshot.p99_ms,
        avg_ms = snapshot.avg_ms,
        persists = snapshot.persist_count,
        persist_failures = snapshot.persist_failures,
        persist_avg_ms = snapshot.persist_avg_ms,
        uptime_secs = snapshot.uptime_secs,
        "metrics"
    );
    for stat in &snapshot.op_stats {
        tracing::info!(op = %stat.operation, count = stat.count, avg_ms = stat.avg_ms, "metrics by operation");
    }
    for slow in &snapshot.slow_requests {
        tracing::info!(
            op = %slow.operation,
            path = %slow.path,
            duration_ms = slow.duration_ms,
            at_ms = slow.timestamp_ms,
            "slow request"
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from(Cli::parse());
    init_logging(&config.log_level);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting mockdb-server");

    let snapshot = JsonFileSnapshot::new(&config.db_path);
    if config.init && snapshot.init_if_missing()? {
        tracing::info!(path = %config.db_path.display(), "created empty snapshot");
    }

    let metrics = config.metrics.then(|| Arc::new(Metrics::new()));

    let mut router = RequestRouter::open(Box::new(snapshot))
        .with_context(|| format!("failed to load snapshot {}", config.db_path.display()))?;
    if let Some(metrics) = &metrics {
        router = router.with_metrics(Arc::clone(metrics));
        tracing::info!("metrics collection enabled");
    }
    let router = Arc::new(router);

    let (collections, records) = router.stats()?;
    tracing::info!(
        path = %router.snapshot_location(),
        collections,
        records,
        "snapshot loaded"
    );

    let mut state = AppState::new(Arc::clone(&router));
    if let Some(metrics) = &metrics {
        state = state.with_metrics(Arc::clone(metrics));
    }

    server::serve(&config, state, server::shutdown_signal())
        .await
        .with_context(|| format!("server error on {}", config.bind_addr()))?;

    match router.flush() {
        Ok(()) => tracing::info!(path = %router.snapshot_location(), "snapshot flushed"),
        Err(e) => tracing::error!(error = %e, "final flush failed"),
    }

    if let Some(metrics) = &metrics {
        log_metrics(&metrics.snapshot());
    }

    tracing::info!("exiting");
    Ok(())
}
