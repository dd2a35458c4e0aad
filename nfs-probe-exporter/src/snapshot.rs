//! Per-scrape metrics.
//!
//! Every scrape builds its own [`Registry`]; nothing is shared or kept
//! between requests.

use std::sync::atomic::AtomicU64;
use std::time::{Duration, Instant};

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use tracing::debug;

use crate::probe::Prober;
use crate::runner::CommandRunner;
use crate::target::{NameFilter, Target};

/// Name of the success gauge.
pub const PROBE_SUCCESS: &str = "probe_success";

/// Name of the duration gauge.
pub const PROBE_DURATION: &str = "probe_duration_seconds";

/// Outcome of one probe run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSnapshot {
    success: bool,
    duration: Duration,
}

impl MetricsSnapshot {
    /// Probe `targets` and time the whole run.
    pub async fn collect<R: CommandRunner>(prober: &Prober<R>, targets: &[Target]) -> Self {
        let start = Instant::now();
        let success = prober.probe(targets).await;
        let duration = start.elapsed();

        debug!(
            targets = targets.len(),
            strategy = prober.strategy().as_str(),
            success,
            duration_ms = duration.as_millis() as u64,
            "Probe finished"
        );

        Self { success, duration }
    }

    /// Snapshot from known values.
    pub fn new(success: bool, duration: Duration) -> Self {
        Self { success, duration }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Build a fresh registry holding the families allowed by `names`.
    pub fn registry(&self, names: &NameFilter) -> Registry {
        let mut registry = Registry::default();

        if names.allows(PROBE_DURATION) {
            let duration = Gauge::<f64, AtomicU64>::default();
            duration.set(self.duration.as_secs_f64());
            registry.register(PROBE_DURATION, "Duration of NFS probing", duration);
        }

        if names.allows(PROBE_SUCCESS) {
            let success = Gauge::<f64, AtomicU64>::default();
            success.set(if self.success { 1.0 } else { 0.0 });
            registry.register(PROBE_SUCCESS, "Success of NFS probing", success);
        }

        registry
    }

    /// Render the allowed families in the OpenMetrics text format.
    pub fn render(&self, names: &NameFilter) -> Result<String, std::fmt::Error> {
        let registry = self.registry(names);
        let mut body = String::new();
        encode(&mut body, &registry)?;
        Ok(body)
    }
}
