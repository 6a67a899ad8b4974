//! Observability infrastructure for the audit service
//!
//! Provides:
//! - Prometheus metrics (inference latency, narrative latency, audit counters, model version)
//! - Structured JSON logging with tracing

use crate::models::AuditReport;
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    GaugeVec, Histogram, IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Histogram buckets for model inference (in seconds)
const INFERENCE_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05,
];

/// Histogram buckets for the narrative call (in seconds)
const NARRATIVE_BUCKETS: &[f64] = &[0.25, 0.5, 1.0, 2.0, 4.0, 8.0, 15.0, 30.0, 60.0, 120.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<AuditMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct AuditMetricsInner {
    inference_latency_seconds: Histogram,
    narrative_latency_seconds: Histogram,
    audits_total: IntCounter,
    short_corbels_total: IntCounter,
    narrative_errors_total: IntCounterVec,
    rejected_requests_total: IntCounterVec,
    model_version_info: GaugeVec,
}

impl AuditMetricsInner {
    fn new() -> Self {
        Self {
            inference_latency_seconds: register_histogram!(
                "corbel_audit_inference_latency_seconds",
                "Time spent scaling inputs and running the load-capacity model",
                INFERENCE_BUCKETS.to_vec()
            )
            .expect("Failed to register inference_latency_seconds"),

            narrative_latency_seconds: register_histogram!(
                "corbel_audit_narrative_latency_seconds",
                "Time spent waiting for the language model narrative",
                NARRATIVE_BUCKETS.to_vec()
            )
            .expect("Failed to register narrative_latency_seconds"),

            audits_total: register_int_counter!(
                "corbel_audit_audits_total",
                "Total number of completed audits"
            )
            .expect("Failed to register audits_total"),

            short_corbels_total: register_int_counter!(
                "corbel_audit_short_corbels_total",
                "Total number of audits classified as short corbels"
            )
            .expect("Failed to register short_corbels_total"),

            narrative_errors_total: register_int_counter_vec!(
                "corbel_audit_narrative_errors_total",
                "Total number of failed narrative calls by failure kind",
                &["kind"]
            )
            .expect("Failed to register narrative_errors_total"),

            rejected_requests_total: register_int_counter_vec!(
                "corbel_audit_rejected_requests_total",
                "Total number of audit requests rejected without a report",
                &["reason"]
            )
            .expect("Failed to register rejected_requests_total"),

            model_version_info: register_gauge_vec!(
                "corbel_audit_model_version_info",
                "Information about the currently loaded regression model",
                &["version", "format"]
            )
            .expect("Failed to register model_version_info"),
        }
    }
}

/// Audit metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct AuditMetrics {
    _private: (),
}

impl Default for AuditMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AuditMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AuditMetricsInner {
        GLOBAL_METRICS.get_or_init(AuditMetricsInner::new)
    }

    pub fn observe_inference_latency(&self, duration_secs: f64) {
        self.inner().inference_latency_seconds.observe(duration_secs);
    }

    pub fn observe_narrative_latency(&self, duration_secs: f64) {
        self.inner().narrative_latency_seconds.observe(duration_secs);
    }

    pub fn inc_audits(&self) {
        self.inner().audits_total.inc();
    }

    pub fn inc_short_corbels(&self) {
        self.inner().short_corbels_total.inc();
    }

    pub fn inc_narrative_errors(&self, kind: &str) {
        self.inner()
            .narrative_errors_total
            .with_label_values(&[kind])
            .inc();
    }

    pub fn inc_rejected_requests(&self, reason: &str) {
        self.inner()
            .rejected_requests_total
            .with_label_values(&[reason])
            .inc();
    }

    /// Update model version info
    pub fn set_model_version(&self, version: &str, format: &str) {
        self.inner().model_version_info.reset();
        self.inner()
            .model_version_info
            .with_label_values(&[version, format])
            .set(1.0);
    }
}

/// Structured logger for audit events
///
/// Provides consistent JSON-formatted logging for audits, narrative
/// failures and service lifecycle. Credentials are never logged.
#[derive(Clone)]
pub struct StructuredLogger {
    service_name: String,
}

impl StructuredLogger {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, model_version: &str, listen_addr: &str) {
        info!(
            event = "service_started",
            service = %self.service_name,
            service_version = %version,
            model_version = %model_version,
            listen_addr = %listen_addr,
            "Corbel audit service started"
        );
    }

    /// Log a completed audit
    pub fn log_audit(&self, report: &AuditReport) {
        let p = &report.parameters;
        info!(
            event = "audit_completed",
            service = %self.service_name,
            fc_mpa = p.fc,
            b_mm = p.b,
            d_mm = p.d,
            a_mm = p.a,
            rho = p.rho,
            predicted_load_kn = report.predicted_load_kn,
            ad_ratio = report.ad_ratio,
            short_corbel = report.classification.is_some(),
            narrative_generated = !report.narrative.is_failed(),
            model_version = %report.model_version,
            "Corbel audit completed"
        );
    }

    /// Log a failed narrative call
    pub fn log_narrative_failure(&self, model: &str, kind: &str, details: &str) {
        warn!(
            event = "narrative_failed",
            service = %self.service_name,
            model = %model,
            kind = %kind,
            details = %details,
            "Narrative generation failed"
        );
    }

    /// Log a successful artifact load
    pub fn log_artifacts_loaded(&self, model_version: &str, format: &str) {
        info!(
            event = "artifacts_loaded",
            service = %self.service_name,
            model_version = %model_version,
            format = %format,
            "Trained artifacts loaded"
        );
    }

    /// Log an artifact loading failure
    pub fn log_artifact_failure(&self, details: &str) {
        error!(
            event = "artifacts_failed",
            service = %self.service_name,
            details = %details,
            "Trained artifacts could not be loaded"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service_name,
            reason = %reason,
            "Corbel audit service shutting down"
        );
    }
}
