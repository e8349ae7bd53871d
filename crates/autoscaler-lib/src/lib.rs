//! Library for the Swarm CPU autoscaler
//!
//! This crate provides the core functionality for:
//! - Utilization sampling from Prometheus
//! - The scaling decision engine
//! - The evaluation cycle controller
//! - Docker Swarm inspection and scaling shims
//! - Health checks and observability

pub mod controller;
pub mod engine;
pub mod health;
pub mod metrics;
pub mod models;
pub mod observability;
pub mod swarm;

pub use controller::{Controller, ControllerBuilder, StatusHandle};
pub use engine::{DecisionEngine, EngineConfig};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use metrics::{MetricsSource, PrometheusSource};
pub use models::*;
pub use observability::{AutoscalerMetrics, StructuredLogger};
pub use swarm::{Actuator, ServiceDirectory, SwarmCli};
