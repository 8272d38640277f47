use std::sync::OnceLock;

use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

fn describe_metrics() {
    describe_counter!("http_requests_total", "Handled HTTP requests, labeled by status");
    describe_histogram!("http_request_duration_seconds", Unit::Seconds, "HTTP request latency");
    describe_counter!("exam_sessions_started_total", "Exam sessions opened");
    describe_counter!(
        "exam_sessions_finished_total",
        "Exam sessions submitted, labeled by trigger (user or timer)"
    );
    describe_counter!(
        "exam_import_questions_total",
        "Questions imported from uploaded files, labeled by source format"
    );
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}
