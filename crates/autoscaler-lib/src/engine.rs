//! Decision engine
//!
//! Classifies each known service into exactly one [`ScaleDecision`] per
//! cycle. Bounds enforcement always runs first and is independent of
//! utilization; threshold-driven scaling only applies when a sample is
//! present. The engine is a pure function of its inputs; all side effects
//! (logging, actuation) live in the controller.

use crate::models::{ScaleDecision, ServiceState};

/// Default upper CPU threshold in percent, used when the service carries no
/// `swarm.autoscaler.maximum.cpu.percentage` label.
pub const DEFAULT_UPPER_THRESHOLD: f64 = 85.0;

/// Default lower CPU threshold in percent, used when the service carries no
/// `swarm.autoscaler.minimum.cpu.percentage` label.
pub const DEFAULT_LOWER_THRESHOLD: f64 = 25.0;

/// Replicas added on a scale-up step.
pub const SCALE_UP_STEP: u64 = 2;

/// Replicas removed on a scale-down step.
pub const SCALE_DOWN_STEP: u64 = 1;

/// Engine configuration: the global threshold defaults.
///
/// Held as plain values so tests inject their own rather than mutating
/// process state.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub upper_threshold: f64,
    pub lower_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            upper_threshold: DEFAULT_UPPER_THRESHOLD,
            lower_threshold: DEFAULT_LOWER_THRESHOLD,
        }
    }
}

/// The decision engine. Stateless between calls.
#[derive(Debug, Clone, Default)]
pub struct DecisionEngine {
    config: EngineConfig,
}

impl DecisionEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Classify one service for this cycle.
    ///
    /// `cpu_percent` is the service's latest utilization sample, or `None`
    /// when the service was not present in the latest sample set. In that
    /// case only bounds enforcement applies.
    ///
    /// Disabled services (label other than the literal "true") are skipped
    /// entirely: neither bounds enforcement nor threshold scaling runs.
    pub fn decide(&self, state: &ServiceState, cpu_percent: Option<f64>) -> ScaleDecision {
        if !state.autoscale {
            return ScaleDecision::NoAction;
        }

        // Bounds enforcement runs first, regardless of utilization.
        if let Some(min) = state.min_replicas {
            if state.replicas < min {
                return ScaleDecision::EnforceMinimum(min);
            }
        }
        if let Some(max) = state.max_replicas {
            if state.replicas > max {
                return ScaleDecision::EnforceMaximum(max);
            }
        }

        let cpu = match cpu_percent {
            Some(cpu) => cpu,
            None => return ScaleDecision::NoAction,
        };

        let upper = state.upper_threshold.unwrap_or(self.config.upper_threshold);
        let lower = state.lower_threshold.unwrap_or(self.config.lower_threshold);

        if cpu > upper {
            self.decide_up(state)
        } else if cpu < lower {
            self.decide_down(state)
        } else {
            ScaleDecision::NoAction
        }
    }

    fn decide_up(&self, state: &ServiceState) -> ScaleDecision {
        let proposed = state.replicas + SCALE_UP_STEP;

        if let Some(max) = state.max_replicas {
            // Already saturated.
            if state.replicas == max {
                return ScaleDecision::NoAction;
            }
            // A step that would overshoot the maximum is refused whole,
            // not clamped. The service stays put until it saturates via
            // a smaller gap or the operator raises the maximum.
            if proposed > max {
                return ScaleDecision::NoAction;
            }
        }

        ScaleDecision::ScaleUp(proposed)
    }

    fn decide_down(&self, state: &ServiceState) -> ScaleDecision {
        // With no declared minimum the floor is 1: a zero-replica target
        // must be explicit, never arithmetic fallout.
        let floor = state.min_replicas.unwrap_or(1).max(1);

        if state.replicas <= floor {
            return ScaleDecision::NoAction;
        }

        let proposed = state.replicas - SCALE_DOWN_STEP;
        if proposed >= floor {
            ScaleDecision::ScaleDown(proposed)
        } else {
            ScaleDecision::NoAction
        }
    }
}
