//! Evaluation cycle controller
//!
//! Runs one full cycle (one metrics query, then a strictly sequential
//! per-service classify/actuate pass) and owns the repeat schedule.
//! Cycles never overlap: the next sleep starts only after every actuator
//! call of the previous cycle has finished.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::engine::DecisionEngine;
use crate::health::{components, HealthRegistry};
use crate::metrics::MetricsSource;
use crate::models::{CycleReport, ScaleDecision, ServiceDecision, ServiceOutcome};
use crate::observability::{AutoscalerMetrics, StructuredLogger};
use crate::swarm::{Actuator, ServiceDirectory};

/// Shared handle to the most recently completed cycle's report.
pub type StatusHandle = Arc<RwLock<Option<CycleReport>>>;

/// The controller wires the metrics source, directory, engine, and
/// actuator into the periodic control loop.
pub struct Controller {
    metrics_source: Arc<dyn MetricsSource>,
    directory: Arc<dyn ServiceDirectory>,
    actuator: Arc<dyn Actuator>,
    engine: DecisionEngine,
    health: HealthRegistry,
    metrics: AutoscalerMetrics,
    logger: StructuredLogger,
    last_report: StatusHandle,
}

impl Controller {
    pub fn builder() -> ControllerBuilder {
        ControllerBuilder::new()
    }

    /// Handle for the status API; filled in after each completed cycle.
    pub fn status_handle(&self) -> StatusHandle {
        Arc::clone(&self.last_report)
    }

    /// Run exactly one evaluation cycle.
    ///
    /// Fails only when the metrics query fails; in that case no service
    /// has been touched. Per-service failures are contained inside the
    /// report's error count.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let started_at = Utc::now();

        let samples = self
            .metrics_source
            .fetch()
            .await
            .context("utilization query failed")?;

        let mut decisions = Vec::with_capacity(samples.len());
        let mut errors = 0usize;

        // The distinct services of the sample set are this cycle's
        // known-service universe, evaluated in source order.
        for sample in &samples {
            let state = match self.directory.inspect(&sample.service).await {
                Ok(state) => state,
                Err(e) => {
                    warn!(
                        service = %sample.service,
                        error = %e,
                        "Failed to inspect service, no action this cycle"
                    );
                    self.metrics.inc_inspect_errors();
                    errors += 1;
                    decisions.push(ServiceDecision {
                        service: sample.service.clone(),
                        replicas: None,
                        cpu_percent: Some(sample.cpu_percent),
                        decision: ScaleDecision::NoAction,
                        outcome: ServiceOutcome::InspectFailed,
                    });
                    continue;
                }
            };

            if !state.autoscale {
                self.logger.log_skipped(&state.service);
                decisions.push(ServiceDecision {
                    service: state.service,
                    replicas: Some(state.replicas),
                    cpu_percent: Some(sample.cpu_percent),
                    decision: ScaleDecision::NoAction,
                    outcome: ServiceOutcome::Disabled,
                });
                continue;
            }

            let decision = self.engine.decide(&state, Some(sample.cpu_percent));
            self.logger
                .log_decision(&state.service, state.replicas, Some(sample.cpu_percent), &decision);

            let outcome = match decision.target() {
                None => ServiceOutcome::Idle,
                Some(target) => match self.actuator.scale(&state.service, target).await {
                    Ok(()) => {
                        self.metrics.record_decision(&decision);
                        ServiceOutcome::Applied
                    }
                    Err(e) => {
                        error!(
                            service = %state.service,
                            target = target,
                            error = %e,
                            "Scale command failed"
                        );
                        self.metrics.inc_scale_errors();
                        errors += 1;
                        ServiceOutcome::ActuationFailed
                    }
                },
            };

            decisions.push(ServiceDecision {
                service: state.service,
                replicas: Some(state.replicas),
                cpu_percent: Some(sample.cpu_percent),
                decision,
                outcome,
            });
        }

        Ok(CycleReport {
            started_at,
            finished_at: Utc::now(),
            services: samples.len(),
            decisions,
            errors,
        })
    }

    /// Run one cycle and fold its outcome into health, metrics, and the
    /// published status.
    pub async fn run_once(&self) {
        let started = Instant::now();

        match self.run_cycle().await {
            Ok(report) => {
                self.metrics
                    .observe_cycle_latency(started.elapsed().as_secs_f64());
                self.metrics.inc_cycles();
                self.metrics.set_services_monitored(report.services as i64);

                self.health.set_healthy(components::METRICS_SOURCE).await;
                if report.errors > 0 {
                    self.health
                        .set_degraded(
                            components::ORCHESTRATOR,
                            format!("{} per-service failures last cycle", report.errors),
                        )
                        .await;
                } else {
                    self.health.set_healthy(components::ORCHESTRATOR).await;
                }
                self.health.set_healthy(components::CONTROLLER).await;

                self.logger.log_cycle(&report);
                *self.last_report.write().await = Some(report);
            }
            Err(e) => {
                self.metrics.inc_cycle_errors();
                self.health
                    .set_unhealthy(components::METRICS_SOURCE, e.to_string())
                    .await;
                self.logger.log_cycle_failed(&e);
            }
        }
    }

    /// Run the control loop: cycle, sleep, repeat, until shutdown.
    pub async fn run(self, interval: Duration, mut shutdown: tokio::sync::broadcast::Receiver<()>) {
        info!(
            interval_secs = interval.as_secs(),
            "Starting evaluation loop"
        );

        loop {
            self.run_once().await;

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.recv() => {
                    info!("Shutting down evaluation loop");
                    break;
                }
            }
        }
    }
}

/// Builder for wiring up a [`Controller`].
pub struct ControllerBuilder {
    metrics_source: Option<Arc<dyn MetricsSource>>,
    directory: Option<Arc<dyn ServiceDirectory>>,
    actuator: Option<Arc<dyn Actuator>>,
    engine: DecisionEngine,
    health: HealthRegistry,
    metrics: Option<AutoscalerMetrics>,
}

impl ControllerBuilder {
    pub fn new() -> Self {
        Self {
            metrics_source: None,
            directory: None,
            actuator: None,
            engine: DecisionEngine::default(),
            health: HealthRegistry::new(),
            metrics: None,
        }
    }

    pub fn metrics_source(mut self, source: Arc<dyn MetricsSource>) -> Self {
        self.metrics_source = Some(source);
        self
    }

    pub fn directory(mut self, directory: Arc<dyn ServiceDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn actuator(mut self, actuator: Arc<dyn Actuator>) -> Self {
        self.actuator = Some(actuator);
        self
    }

    pub fn engine(mut self, engine: DecisionEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = health;
        self
    }

    pub fn metrics(mut self, metrics: AutoscalerMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Result<Controller> {
        let metrics_source = self
            .metrics_source
            .ok_or_else(|| anyhow::anyhow!("Metrics source is required"))?;
        let directory = self
            .directory
            .ok_or_else(|| anyhow::anyhow!("Service directory is required"))?;
        let actuator = self
            .actuator
            .ok_or_else(|| anyhow::anyhow!("Actuator is required"))?;

        Ok(Controller {
            metrics_source,
            directory,
            actuator,
            engine: self.engine,
            health: self.health,
            metrics: self.metrics.unwrap_or_default(),
            logger: StructuredLogger::new(),
            last_report: Arc::new(RwLock::new(None)),
        })
    }
}

impl Default for ControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
