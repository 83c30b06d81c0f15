//! Metrics collection and Prometheus export.
//!
//! HTTP request metrics come from the shared `metrics_middleware`; this module
//! adds the analysis pipeline counters and owns the recorder.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global handle to the Prometheus recorder.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Final state of one analysis request, submit or fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Success,
    ValidationError,
    NotFound,
    ModelError,
    StorageError,
}

impl AnalysisOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisOutcome::Success => "success",
            AnalysisOutcome::ValidationError => "validation_error",
            AnalysisOutcome::NotFound => "not_found",
            AnalysisOutcome::ModelError => "model_error",
            AnalysisOutcome::StorageError => "storage_error",
        }
    }
}

/// Install the Prometheus recorder. Safe to call more than once: later calls
/// reuse the first handle, and if another recorder is already installed a
/// detached handle is kept so `/metrics` still answers.
pub fn init_metrics() {
    METRICS_HANDLE.get_or_init(|| match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => handle,
        Err(e) => {
            tracing::warn!(error = %e, "Prometheus recorder not installed, using detached handle");
            PrometheusBuilder::new().build_recorder().handle()
        }
    });
}

/// Current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

pub fn record_analysis(outcome: AnalysisOutcome) {
    counter!("palm_analyses_total", "outcome" => outcome.as_str()).increment(1);
}

pub fn record_fetch(outcome: AnalysisOutcome) {
    counter!("palm_analysis_fetches_total", "outcome" => outcome.as_str()).increment(1);
}

pub fn record_model_latency(provider: &'static str, elapsed: Duration) {
    histogram!("palm_model_latency_seconds", "provider" => provider).record(elapsed.as_secs_f64());
}

pub fn record_provider_error(provider: &'static str, error_type: &'static str) {
    counter!(
        "palm_provider_errors_total",
        "provider" => provider,
        "error_type" => error_type
    )
    .increment(1);
}
