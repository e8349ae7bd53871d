//! Observability infrastructure
//!
//! Provides:
//! - Prometheus metrics (cycle latency, decision and error counters)
//! - Structured JSON logging with tracing

use std::sync::OnceLock;

use prometheus::{register_histogram, register_int_gauge, Histogram, IntGauge};
use tracing::{error, info, warn};

use crate::models::{CycleReport, ScaleDecision};

/// Histogram buckets for cycle latency in seconds. Cycles shell out to the
/// docker CLI per service, so the range is wide.
const CYCLE_LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Global metrics instance (registered once).
static GLOBAL_METRICS: OnceLock<MetricsInner> = OnceLock::new();

struct MetricsInner {
    cycle_latency_seconds: Histogram,
    cycles: IntGauge,
    cycle_errors: IntGauge,
    services_monitored: IntGauge,
    scale_ups: IntGauge,
    scale_downs: IntGauge,
    bounds_corrections: IntGauge,
    inspect_errors: IntGauge,
    scale_errors: IntGauge,
}

impl MetricsInner {
    fn new() -> Self {
        Self {
            cycle_latency_seconds: register_histogram!(
                "swarm_autoscaler_cycle_latency_seconds",
                "Wall time of one full evaluation cycle",
                CYCLE_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register cycle_latency_seconds"),

            cycles: register_int_gauge!(
                "swarm_autoscaler_cycles_total",
                "Total number of completed evaluation cycles"
            )
            .expect("Failed to register cycles_total"),

            cycle_errors: register_int_gauge!(
                "swarm_autoscaler_cycle_errors_total",
                "Total number of cycles aborted by a metrics query failure"
            )
            .expect("Failed to register cycle_errors_total"),

            services_monitored: register_int_gauge!(
                "swarm_autoscaler_services_monitored",
                "Distinct services observed in the latest metrics query"
            )
            .expect("Failed to register services_monitored"),

            scale_ups: register_int_gauge!(
                "swarm_autoscaler_scale_ups_total",
                "Total number of scale-up actions issued"
            )
            .expect("Failed to register scale_ups_total"),

            scale_downs: register_int_gauge!(
                "swarm_autoscaler_scale_downs_total",
                "Total number of scale-down actions issued"
            )
            .expect("Failed to register scale_downs_total"),

            bounds_corrections: register_int_gauge!(
                "swarm_autoscaler_bounds_corrections_total",
                "Total number of minimum/maximum bounds enforcement actions issued"
            )
            .expect("Failed to register bounds_corrections_total"),

            inspect_errors: register_int_gauge!(
                "swarm_autoscaler_inspect_errors_total",
                "Total number of per-service inspection failures"
            )
            .expect("Failed to register inspect_errors_total"),

            scale_errors: register_int_gauge!(
                "swarm_autoscaler_scale_errors_total",
                "Total number of failed scale commands"
            )
            .expect("Failed to register scale_errors_total"),
        }
    }
}

/// Lightweight handle to the global Prometheus metrics.
///
/// Clones share the same underlying metrics.
#[derive(Clone)]
pub struct AutoscalerMetrics {
    _private: (),
}

impl Default for AutoscalerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AutoscalerMetrics {
    /// Create a handle, initializing the global metrics on first call.
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(MetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &MetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_cycle_latency(&self, duration_secs: f64) {
        self.inner().cycle_latency_seconds.observe(duration_secs);
    }

    pub fn inc_cycles(&self) {
        self.inner().cycles.inc();
    }

    pub fn inc_cycle_errors(&self) {
        self.inner().cycle_errors.inc();
    }

    pub fn set_services_monitored(&self, count: i64) {
        self.inner().services_monitored.set(count);
    }

    /// Count an issued action by decision kind.
    pub fn record_decision(&self, decision: &ScaleDecision) {
        match decision {
            ScaleDecision::NoAction => {}
            ScaleDecision::ScaleUp(_) => self.inner().scale_ups.inc(),
            ScaleDecision::ScaleDown(_) => self.inner().scale_downs.inc(),
            ScaleDecision::EnforceMinimum(_) | ScaleDecision::EnforceMaximum(_) => {
                self.inner().bounds_corrections.inc()
            }
        }
    }

    pub fn inc_inspect_errors(&self) {
        self.inner().inspect_errors.inc();
    }

    pub fn inc_scale_errors(&self) {
        self.inner().scale_errors.inc();
    }
}

/// Structured logger for autoscaler events.
///
/// Emits consistent `event`-tagged JSON lines for lifecycle and decision
/// events; the log output is the system's only user-facing channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredLogger;

impl StructuredLogger {
    pub fn new() -> Self {
        Self
    }

    pub fn log_startup(&self, version: &str, prometheus_url: &str, loop_enabled: bool) {
        info!(
            event = "autoscaler_started",
            version = %version,
            prometheus_url = %prometheus_url,
            loop_enabled = loop_enabled,
            "Swarm autoscaler started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "autoscaler_shutdown",
            reason = %reason,
            "Swarm autoscaler shutting down"
        );
    }

    /// Log one issued (or refused) scaling decision.
    pub fn log_decision(
        &self,
        service: &str,
        replicas: u64,
        cpu_percent: Option<f64>,
        decision: &ScaleDecision,
    ) {
        match decision {
            ScaleDecision::NoAction => {
                info!(
                    event = "scale_decision",
                    service = %service,
                    replicas = replicas,
                    cpu_percent = ?cpu_percent,
                    action = "no_action",
                    "No action for service"
                );
            }
            other => {
                info!(
                    event = "scale_decision",
                    service = %service,
                    replicas = replicas,
                    cpu_percent = ?cpu_percent,
                    action = ?other,
                    target = other.target(),
                    "Scaling service"
                );
            }
        }
    }

    /// Log a service skipped because its autoscale label is not "true".
    pub fn log_skipped(&self, service: &str) {
        warn!(
            event = "service_skipped",
            service = %service,
            "Autoscaler label is not \"true\", skipping service"
        );
    }

    pub fn log_cycle(&self, report: &CycleReport) {
        info!(
            event = "cycle_complete",
            services = report.services,
            errors = report.errors,
            "Evaluation cycle complete"
        );
    }

    pub fn log_cycle_failed(&self, error: &anyhow::Error) {
        error!(
            event = "cycle_failed",
            error = %error,
            "Metrics query failed, cycle aborted"
        );
    }
}
