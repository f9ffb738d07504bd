//! Telemetry Module
//!
//! Push-on-demand metrics sink. Nothing is emitted unless the owner calls
//! `flush_metrics`.

use std::fmt::Debug;

use serde_json::{Map, Value};
use tracing::info;

/// Receiver for cache metrics.
///
/// Called synchronously by `flush_metrics`; a slow sink slows the caller.
pub trait MetricsSink: Send + Sync + Debug {
    fn record_cache_metrics(&self, name: &str, hits: u64, misses: u64, extras: &Map<String, Value>);
}

// == Tracing Sink ==
/// Emits each flush as a structured `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl MetricsSink for TracingSink {
    fn record_cache_metrics(&self, name: &str, hits: u64, misses: u64, extras: &Map<String, Value>) {
        let extras = Value::Object(extras.clone());
        info!(
            target: "guarded_cache::metrics",
            cache = name,
            hits,
            misses,
            extras = %extras,
            "cache metrics"
        );
    }
}
