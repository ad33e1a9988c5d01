//! Request metrics for the mock server
//!
//! Lightweight, thread-safe collection enabled with `--metrics`. Metrics are
//! server-wide and logged once on shutdown.
//!
//! # Design Decisions
//!
//! - **Atomics for counters**: recording never takes the store lock
//! - **Bounded memory**: fixed-size latency window and slow-request buffer
//! - **O(1) per request**: percentiles are computed only in `snapshot()`

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

/// Number of recent request latencies kept for percentiles
const LATENCY_WINDOW_SIZE: usize = 1000;

/// Number of recent slow requests kept
const MAX_SLOW_REQUESTS: usize = 10;

/// Requests at or above this duration are recorded as slow
pub const SLOW_REQUEST_THRESHOLD_MS: u64 = 100;

/// Kind of work a request performed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `GET /`
    Root,
    /// `GET /<collection>` through the query pipeline
    List,
    /// `GET /<collection>/<id>`
    GetItem,
    /// `POST /<collection>`
    Insert,
    /// Anything answered with 4xx/5xx before touching the store
    Rejected,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Root,
        Operation::List,
        Operation::GetItem,
        Operation::Insert,
        Operation::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Root => "Root",
            Operation::List => "List",
            Operation::GetItem => "GetItem",
            Operation::Insert => "Insert",
            Operation::Rejected => "Rejected",
        }
    }

    fn index(&self) -> usize {
        match self {
            Operation::Root => 0,
            Operation::List => 1,
            Operation::GetItem => 2,
            Operation::Insert => 3,
            Operation::Rejected => 4,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded slow request
#[derive(Clone, Debug, PartialEq)]
pub struct SlowRequest {
    pub operation: Operation,
    pub path: String,
    pub duration_ms: u64,
    /// ms since metrics started
    pub timestamp_ms: u64,
}

/// Per-operation totals
#[derive(Clone, Debug, PartialEq)]
pub struct OperationStat {
    pub operation: Operation,
    pub count: u64,
    pub avg_ms: u64,
}

/// Point-in-time copy of all metrics
#[derive(Clone, Debug, Default)]
pub struct MetricsSnapshot {
    pub request_count: u64,
    pub slow_request_count: u64,
    pub p50_ms: u64,
    pub p95_ms: u64,
    pub p99_ms: u64,
    pub avg_ms: u64,
    pub persist_count: u64,
    pub persist_failures: u64,
    pub persist_avg_ms: u64,
    pub slow_requests: Vec<SlowRequest>,
    pub op_stats: Vec<OperationStat>,
    pub uptime_secs: u64,
}

/// Thread-safe request metrics collector
pub struct Metrics {
    request_count: AtomicU64,
    slow_request_count: AtomicU64,

    /// Rolling window of recent latencies
    latencies_ms: Mutex<VecDeque<u64>>,

    op_counts: [AtomicU64; 5],
    op_latency_sums: [AtomicU64; 5],

    persist_count: AtomicU64,
    persist_failures: AtomicU64,
    persist_total_ms: AtomicU64,

    slow_requests: Mutex<VecDeque<SlowRequest>>,

    started_at: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            request_count: AtomicU64::new(0),
            slow_request_count: AtomicU64::new(0),
            latencies_ms: Mutex::new(VecDeque::with_capacity(LATENCY_WINDOW_SIZE)),
            op_counts: Default::default(),
            op_latency_sums: Default::default(),
            persist_count: AtomicU64::new(0),
            persist_failures: AtomicU64::new(0),
            persist_total_ms: AtomicU64::new(0),
            slow_requests: Mutex::new(VecDeque::with_capacity(MAX_SLOW_REQUESTS)),
            started_at: Instant::now(),
        }
    }

    /// Record a finished request
    pub fn record_request(&self, operation: Operation, path: &str, duration_ms: u64) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.op_counts[operation.index()].fetch_add(1, Ordering::Relaxed);
        self.op_latency_sums[operation.index()].fetch_add(duration_ms, Ordering::Relaxed);

        if let Ok(mut latencies) = self.latencies_ms.lock() {
            if latencies.len() >= LATENCY_WINDOW_SIZE {
                latencies.pop_front();
            }
            latencies.push_back(duration_ms);
        }

        if duration_ms >= SLOW_REQUEST_THRESHOLD_MS {
            self.slow_request_count.fetch_add(1, Ordering::Relaxed);

            let slow = SlowRequest {
                operation,
                path: path.to_string(),
                duration_ms,
                timestamp_ms: self.started_at.elapsed().as_millis() as u64,
            };

            if let Ok(mut slow_requests) = self.slow_requests.lock() {
                if slow_requests.len() >= MAX_SLOW_REQUESTS {
                    slow_requests.pop_front();
                }
                slow_requests.push_back(slow);
            }
        }
    }

    /// Record a snapshot write after an insert
    pub fn record_persist(&self, duration_ms: u64, ok: bool) {
        self.persist_count.fetch_add(1, Ordering::Relaxed);
        self.persist_total_ms.fetch_add(duration_ms, Ordering::Relaxed);
        if !ok {
            self.persist_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let (p50, p95, p99, avg) = match self.latencies_ms.lock() {
            Ok(latencies) if !latencies.is_empty() => {
                let mut sorted: Vec<u64> = latencies.iter().copied().collect();
                sorted.sort_unstable();

                let len = sorted.len();
                let sum: u64 = sorted.iter().sum();
                (
                    sorted[len * 50 / 100],
                    sorted[len * 95 / 100],
                    sorted[(len * 99 / 100).min(len - 1)],
                    sum / len as u64,
                )
            }
            _ => (0, 0, 0, 0),
        };

        let persist_count = self.persist_count.load(Ordering::Relaxed);
        let persist_avg_ms = if persist_count > 0 {
            self.persist_total_ms.load(Ordering::Relaxed) / persist_count
        } else {
            0
        };

        let slow_requests = self
            .slow_requests
            .lock()
            .map(|slow| slow.iter().cloned().collect())
            .unwrap_or_default();

        let op_stats = Operation::ALL
            .iter()
            .filter_map(|op| {
                let count = self.op_counts[op.index()].load(Ordering::Relaxed);
                (count > 0).then(|| OperationStat {
                    operation: *op,
                    count,
                    avg_ms: self.op_latency_sums[op.index()].load(Ordering::Relaxed) / count,
                })
            })
            .collect();

        MetricsSnapshot {
            request_count: self.request_count.load(Ordering::Relaxed),
            slow_request_count: self.slow_request_count.load(Ordering::Relaxed),
            p50_ms: p50,
            p95_ms: p95,
            p99_ms: p99,
            avg_ms: avg,
            persist_count,
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
            persist_avg_ms,
            slow_requests,
            op_stats,
            uptime_secs: self.started_at.elapsed().as_secs(),
        }
    }
}
