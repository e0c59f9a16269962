use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::TelemetrySettings;

static RECORDER: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the global Prometheus recorder if enabled. Later calls are no-ops.
pub(crate) fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    if settings.prometheus_enabled && RECORDER.get().is_none() {
        let handle = PrometheusBuilder::new().install_recorder()?;
        RECORDER.get_or_init(|| handle);
    }
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    RECORDER.get().map(PrometheusHandle::render)
}

pub(crate) fn record_upstream_call(service: &'static str, outcome: &'static str, seconds: f64) {
    metrics::counter!("upstream_requests_total", "service" => service, "outcome" => outcome)
        .increment(1);
    metrics::histogram!("upstream_request_duration_seconds", "service" => service)
        .record(seconds);
}
