//! Connectivity check for both endpoints.

use std::future::Future;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Result of a health check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    /// Overall health status.
    pub healthy: bool,

    /// Source database connection status.
    pub source_connected: bool,

    /// Source connection latency in milliseconds.
    pub source_latency_ms: u64,

    /// Source error message if connection failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_error: Option<String>,

    /// Target database connection status.
    pub target_connected: bool,

    /// Target connection latency in milliseconds.
    pub target_latency_ms: u64,

    /// Target error message if connection failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_error: Option<String>,
}

/// Run both checks concurrently. Each check should connect and round-trip.
pub async fn health_check<S, T>(source: S, target: T) -> HealthCheckResult
where
    S: Future<Output = Result<()>>,
    T: Future<Output = Result<()>>,
{
    let ((source_ok, source_ms, source_error), (target_ok, target_ms, target_error)) =
        tokio::join!(timed(source), timed(target));

    HealthCheckResult {
        healthy: source_ok && target_ok,
        source_connected: source_ok,
        source_latency_ms: source_ms,
        source_error,
        target_connected: target_ok,
        target_latency_ms: target_ms,
        target_error,
    }
}

async fn timed<F: Future<Output = Result<()>>>(check: F) -> (bool, u64, Option<String>) {
    let start = Instant::now();
    let result = check.await;
    let ms = start.elapsed().as_millis() as u64;
    match result {
        Ok(()) => (true, ms, None),
        Err(e) => (false, ms, Some(e.to_string())),
    }
}
