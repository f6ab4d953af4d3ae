//! Metrics sink interface.
//!
//! The reloading provider reports a few operational numbers (reload count,
//! file size, watcher count). Where they go is the embedder's business:
//! implement [`ConfigMetrics`] over your metrics pipeline, or keep the
//! default no-op. Sinks are fire-and-forget; nothing here may fail into the
//! read path.

use tracing::debug;

/// Fire-and-forget metrics sink.
pub trait ConfigMetrics: Send + Sync {
    /// Increments a counter.
    fn increment_counter(&self, name: &'static str, by: u64);

    /// Records a gauge value.
    fn record_gauge(&self, name: &'static str, value: u64);
}

/// Discards all metrics (the default).
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMetrics;

impl ConfigMetrics for NoopMetrics {
    fn increment_counter(&self, _name: &'static str, _by: u64) {}

    fn record_gauge(&self, _name: &'static str, _value: u64) {}
}

/// Emits metrics as `tracing` debug records.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingMetrics;

impl ConfigMetrics for TracingMetrics {
    fn increment_counter(&self, name: &'static str, by: u64) {
        debug!(metric = name, by, "counter");
    }

    fn record_gauge(&self, name: &'static str, value: u64) {
        debug!(metric = name, value, "gauge");
    }
}
