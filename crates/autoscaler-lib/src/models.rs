//! Core data models for the autoscaler

use serde::{Deserialize, Serialize};

/// One CPU utilization sample for a Swarm service.
///
/// Produced fresh each cycle from the Prometheus query result; when the
/// query returns one row per (service, instance) the rows are averaged
/// into a single sample per service. No history is kept across cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilizationSample {
    pub service: String,
    pub cpu_percent: f64,
}

/// Declared autoscaling configuration and live replica count of a service,
/// parsed from the orchestrator's service spec.
///
/// Absent or non-numeric labels become `None`: no bound is enforceable in
/// that direction, and thresholds fall back to the engine defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceState {
    pub service: String,
    /// Only the literal label value "true" enables autoscaling.
    pub autoscale: bool,
    pub min_replicas: Option<u64>,
    pub max_replicas: Option<u64>,
    pub upper_threshold: Option<f64>,
    pub lower_threshold: Option<f64>,
    /// Current replicated-mode replica count.
    pub replicas: u64,
}

/// The engine's classification of one service for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "target", rename_all = "snake_case")]
pub enum ScaleDecision {
    /// Nothing to do this cycle.
    NoAction,
    /// Replica count drifted below the declared minimum.
    EnforceMinimum(u64),
    /// Replica count drifted above the declared maximum.
    EnforceMaximum(u64),
    /// High utilization, grow to the given count.
    ScaleUp(u64),
    /// Low utilization, shrink to the given count.
    ScaleDown(u64),
}

impl ScaleDecision {
    /// The replica target this decision wants applied, if any.
    pub fn target(&self) -> Option<u64> {
        match *self {
            ScaleDecision::NoAction => None,
            ScaleDecision::EnforceMinimum(n)
            | ScaleDecision::EnforceMaximum(n)
            | ScaleDecision::ScaleUp(n)
            | ScaleDecision::ScaleDown(n) => Some(n),
        }
    }
}

/// What happened to a single service during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceOutcome {
    /// The decision required no actuation.
    Idle,
    /// The scale command was issued.
    Applied,
    /// The scale command failed; re-evaluated next cycle.
    ActuationFailed,
    /// The autoscaler label is not "true"; never evaluated.
    Disabled,
    /// Service inspection failed or its spec could not be parsed.
    InspectFailed,
}

/// Per-service record within a [`CycleReport`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDecision {
    pub service: String,
    /// Replica count observed at inspection time, when known.
    pub replicas: Option<u64>,
    pub cpu_percent: Option<f64>,
    pub decision: ScaleDecision,
    pub outcome: ServiceOutcome,
}

/// Summary of one completed evaluation cycle, published for the status API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
    /// Distinct services observed in the metrics query.
    pub services: usize,
    pub decisions: Vec<ServiceDecision>,
    /// Per-service inspect and actuation failures this cycle.
    pub errors: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_target_extraction() {
        assert_eq!(ScaleDecision::NoAction.target(), None);
        assert_eq!(ScaleDecision::EnforceMinimum(2).target(), Some(2));
        assert_eq!(ScaleDecision::ScaleUp(7).target(), Some(7));
        assert_eq!(ScaleDecision::ScaleDown(2).target(), Some(2));
    }

    #[test]
    fn decision_serializes_with_action_tag() {
        let json = serde_json::to_value(ScaleDecision::ScaleUp(7)).unwrap();
        assert_eq!(json["action"], "scale_up");
        assert_eq!(json["target"], 7);

        let json = serde_json::to_value(ScaleDecision::NoAction).unwrap();
        assert_eq!(json["action"], "no_action");
    }
}
