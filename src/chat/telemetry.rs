//! Fire-and-forget analytics sink.

/// Receives engagement events. Implementations must not block or fail.
pub trait TelemetrySink: Send + Sync {
    /// Record one event.
    fn track(&self, event: &str, category: &str, label: &str, value: Option<f64>);
}

/// Sink that emits events through `tracing` on the `telemetry` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn track(&self, event: &str, category: &str, label: &str, value: Option<f64>) {
        tracing::info!(target: "telemetry", event_name = event, category, label, value, "track");
    }
}
