//! Daemon configuration
//!
//! Read once at startup from the process environment, prefix `AUTOSCALER`
//! (e.g. `AUTOSCALER_PROMETHEUS_URL`, `AUTOSCALER_INTERVAL_SECS`).

use anyhow::Result;
use serde::Deserialize;

/// Autoscaler configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AutoscalerConfig {
    /// Prometheus base URL
    #[serde(default = "default_prometheus_url")]
    pub prometheus_url: String,

    /// Seconds to sleep between evaluation cycles
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Continuous mode; false runs a single cycle and exits
    #[serde(default = "default_loop_enabled")]
    pub loop_enabled: bool,

    /// API server port for health/metrics/status
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Docker CLI binary used for service inspect/scale
    #[serde(default = "default_docker_bin")]
    pub docker_bin: String,
}

fn default_prometheus_url() -> String {
    "http://prometheus:9090".to_string()
}

fn default_interval_secs() -> u64 {
    60
}

fn default_loop_enabled() -> bool {
    true
}

fn default_api_port() -> u16 {
    8080
}

fn default_docker_bin() -> String {
    "docker".to_string()
}

impl Default for AutoscalerConfig {
    fn default() -> Self {
        Self {
            prometheus_url: default_prometheus_url(),
            interval_secs: default_interval_secs(),
            loop_enabled: default_loop_enabled(),
            api_port: default_api_port(),
            docker_bin: default_docker_bin(),
        }
    }
}

impl AutoscalerConfig {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("AUTOSCALER"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_default())
    }
}
