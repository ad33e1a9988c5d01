//! HTTP transport - maps every request onto [`RequestRouter::handle`]
//!
//! There are no fixed routes: any path may name a collection, so a single
//! fallback handler receives everything. Store work is synchronous (it may
//! write the snapshot file) and runs on tokio's blocking pool.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mockdb::{JsonFileSnapshot, RequestRouter, ServerConfig};
//! use mockdb::server::{self, AppState};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::new("db.json");
//! let router = RequestRouter::open(Box::new(JsonFileSnapshot::new(&config.db_path)))?;
//! let state = AppState::new(Arc::new(router));
//! server::serve(&config, state, std::future::pending()).await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{Method, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use crate::config::ServerConfig;
use crate::metrics::{Metrics, Operation};
use crate::query::QueryParams;
use crate::router::{Reply, RequestRouter};

/// Shared state for the HTTP handler
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<RequestRouter>,
    pub metrics: Option<Arc<Metrics>>,
}

impl AppState {
    pub fn new(router: Arc<RequestRouter>) -> Self {
        Self { router, metrics: None }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

/// Build the axum app; `cors` adds a permissive CORS layer which also answers
/// preflight `OPTIONS` requests.
pub fn app(state: AppState, cors: bool) -> Router {
    let app = Router::new().fallback(dispatch).with_state(state);
    if cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Bind to the configured address and serve until `shutdown` resolves
pub async fn serve<F>(config: &ServerConfig, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app(state, config.cors))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Resolves on Ctrl-C, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let path = uri.path().to_string();

    let params = match query {
        Ok(Query(pairs)) => QueryParams::from_pairs(pairs),
        Err(e) => {
            tracing::warn!(error = %e, path = %path, "unparsable query string ignored");
            QueryParams::new()
        }
    };

    let router = Arc::clone(&state.router);
    let task_method = method.clone();
    let task_path = path.clone();
    let reply = tokio::task::spawn_blocking(move || {
        router.handle(&task_method, &task_path, &params, &body)
    })
    .await
    .unwrap_or_else(|e| {
        tracing::error!(error = %e, "request task failed");
        Reply::internal_error()
    });

    let elapsed_ms = started.elapsed().as_millis() as u64;
    if let Some(metrics) = &state.metrics {
        metrics.record_request(reply.operation, &path, elapsed_ms);
    }

    if reply.operation == Operation::Rejected {
        tracing::warn!(%method, path = %path, status = reply.status.as_u16(), "request rejected");
    } else {
        tracing::debug!(
            %method,
            path = %path,
            status = reply.status.as_u16(),
            op = %reply.operation,
            elapsed_ms,
            "request"
        );
    }

    (reply.status, Json(reply.body)).into_response()
}
