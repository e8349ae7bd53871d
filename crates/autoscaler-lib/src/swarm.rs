//! Docker Swarm shims
//!
//! Thin wrappers over the docker CLI: `service inspect` backs the service
//! directory, `service scale --detach` backs the actuator. Scaling is
//! fire-and-forget; convergence is the orchestrator's job.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::models::ServiceState;

/// Enables autoscaling when set to the literal "true".
pub const AUTOSCALE_LABEL: &str = "swarm.autoscaler";
/// Lower replica bound.
pub const MIN_REPLICAS_LABEL: &str = "swarm.autoscaler.minimum";
/// Upper replica bound.
pub const MAX_REPLICAS_LABEL: &str = "swarm.autoscaler.maximum";
/// Per-service upper CPU threshold override.
pub const UPPER_THRESHOLD_LABEL: &str = "swarm.autoscaler.maximum.cpu.percentage";
/// Per-service lower CPU threshold override.
pub const LOWER_THRESHOLD_LABEL: &str = "swarm.autoscaler.minimum.cpu.percentage";

/// Failures of the docker CLI shim. All of these are isolated to the
/// service that produced them.
#[derive(Debug, Error)]
pub enum SwarmError {
    #[error("failed to run docker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("`docker {command}` exited with {code}: {stderr}")]
    Command {
        command: String,
        code: String,
        stderr: String,
    },

    #[error("service {0} is not in replicated mode")]
    NotReplicated(String),

    #[error("unparseable service spec: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Read access to a service's declared configuration and live replica count.
#[async_trait]
pub trait ServiceDirectory: Send + Sync {
    /// Fetch the current state of one service. Called fresh per service per
    /// cycle; results must never be cached across cycles.
    async fn inspect(&self, service: &str) -> Result<ServiceState>;
}

/// Write access to a service's replica count.
#[async_trait]
pub trait Actuator: Send + Sync {
    /// Request convergence to the given replica count.
    async fn scale(&self, service: &str, replicas: u64) -> Result<()>;
}

/// `Spec` document emitted by `docker service inspect --format '{{json .Spec}}'`.
#[derive(Debug, Deserialize)]
struct SpecDoc {
    #[serde(rename = "Labels", default)]
    labels: HashMap<String, String>,
    #[serde(rename = "Mode", default)]
    mode: ModeDoc,
}

#[derive(Debug, Default, Deserialize)]
struct ModeDoc {
    #[serde(rename = "Replicated")]
    replicated: Option<ReplicatedDoc>,
}

#[derive(Debug, Deserialize)]
struct ReplicatedDoc {
    #[serde(rename = "Replicas")]
    replicas: Option<u64>,
}

/// Directory and actuator backed by the docker CLI against a Swarm manager.
pub struct SwarmCli {
    docker_bin: String,
}

impl SwarmCli {
    pub fn new(docker_bin: impl Into<String>) -> Self {
        Self {
            docker_bin: docker_bin.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<String, SwarmError> {
        let output = Command::new(&self.docker_bin).args(args).output().await?;

        if !output.status.success() {
            return Err(SwarmError::Command {
                command: args.join(" "),
                code: output
                    .status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string()),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Parse a service `Spec` document into a [`ServiceState`].
///
/// Missing or non-numeric bound labels become `None`; any autoscale label
/// value other than the literal "true" counts as disabled.
fn parse_service_spec(service: &str, spec_json: &str) -> Result<ServiceState, SwarmError> {
    let spec: SpecDoc = serde_json::from_str(spec_json)?;

    let replicas = spec
        .mode
        .replicated
        .ok_or_else(|| SwarmError::NotReplicated(service.to_string()))?
        .replicas
        .unwrap_or(0);

    let labels = &spec.labels;
    let autoscale = labels.get(AUTOSCALE_LABEL).map(String::as_str) == Some("true");

    Ok(ServiceState {
        service: service.to_string(),
        autoscale,
        min_replicas: parse_label(labels, MIN_REPLICAS_LABEL),
        max_replicas: parse_label(labels, MAX_REPLICAS_LABEL),
        upper_threshold: parse_label(labels, UPPER_THRESHOLD_LABEL),
        lower_threshold: parse_label(labels, LOWER_THRESHOLD_LABEL),
        replicas,
    })
}

fn parse_label<T: std::str::FromStr>(labels: &HashMap<String, String>, key: &str) -> Option<T> {
    labels.get(key).and_then(|v| v.trim().parse().ok())
}

#[async_trait]
impl ServiceDirectory for SwarmCli {
    async fn inspect(&self, service: &str) -> Result<ServiceState> {
        let stdout = self
            .run(&["service", "inspect", service, "--format", "{{json .Spec}}"])
            .await?;

        Ok(parse_service_spec(service, stdout.trim())?)
    }
}

#[async_trait]
impl Actuator for SwarmCli {
    async fn scale(&self, service: &str, replicas: u64) -> Result<()> {
        let target = format!("{}={}", service, replicas);
        self.run(&["service", "scale", "--detach", &target]).await?;

        debug!(service = %service, replicas = replicas, "scale command issued");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_json(labels: &[(&str, &str)], replicas: Option<u64>) -> String {
        let labels: HashMap<&str, &str> = labels.iter().copied().collect();
        let mode = match replicas {
            Some(n) => format!(r#"{{"Replicated": {{"Replicas": {}}}}}"#, n),
            None => r#"{"Global": {}}"#.to_string(),
        };
        format!(
            r#"{{"Name": "web", "Labels": {}, "Mode": {}}}"#,
            serde_json::to_string(&labels).unwrap(),
            mode
        )
    }

    #[test]
    fn parses_fully_labeled_service() {
        let json = spec_json(
            &[
                ("swarm.autoscaler", "true"),
                ("swarm.autoscaler.minimum", "2"),
                ("swarm.autoscaler.maximum", "10"),
                ("swarm.autoscaler.maximum.cpu.percentage", "80"),
                ("swarm.autoscaler.minimum.cpu.percentage", "20"),
            ],
            Some(5),
        );

        let state = parse_service_spec("web", &json).unwrap();
        assert!(state.autoscale);
        assert_eq!(state.min_replicas, Some(2));
        assert_eq!(state.max_replicas, Some(10));
        assert_eq!(state.upper_threshold, Some(80.0));
        assert_eq!(state.lower_threshold, Some(20.0));
        assert_eq!(state.replicas, 5);
    }

    #[test]
    fn autoscale_label_fails_closed() {
        for value in ["True", "TRUE", "yes", "1", ""] {
            let json = spec_json(&[("swarm.autoscaler", value)], Some(3));
            let state = parse_service_spec("web", &json).unwrap();
            assert!(!state.autoscale, "value {:?} must not enable", value);
        }

        // Absent label is disabled too.
        let json = spec_json(&[], Some(3));
        assert!(!parse_service_spec("web", &json).unwrap().autoscale);
    }

    #[test]
    fn non_numeric_bounds_are_unenforceable() {
        let json = spec_json(
            &[
                ("swarm.autoscaler", "true"),
                ("swarm.autoscaler.minimum", "two"),
                ("swarm.autoscaler.maximum", ""),
            ],
            Some(3),
        );

        let state = parse_service_spec("web", &json).unwrap();
        assert_eq!(state.min_replicas, None);
        assert_eq!(state.max_replicas, None);
        assert_eq!(state.upper_threshold, None);
        assert_eq!(state.lower_threshold, None);
    }

    #[test]
    fn global_mode_service_is_an_error() {
        let json = spec_json(&[("swarm.autoscaler", "true")], None);
        let err = parse_service_spec("web", &json).unwrap_err();
        assert!(matches!(err, SwarmError::NotReplicated(_)));
    }

    #[test]
    fn missing_labels_object_parses() {
        // Docker omits Labels entirely when none are set.
        let json = r#"{"Name": "web", "Mode": {"Replicated": {"Replicas": 1}}}"#;
        let state = parse_service_spec("web", json).unwrap();
        assert!(!state.autoscale);
        assert_eq!(state.replicas, 1);
    }

    #[test]
    fn garbage_spec_is_a_parse_error() {
        let err = parse_service_spec("web", "[]").unwrap_err();
        assert!(matches!(err, SwarmError::Parse(_)));
    }
}
