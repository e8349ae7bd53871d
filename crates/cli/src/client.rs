//! API client for the autoscaler daemon

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use std::collections::HashMap;
use url::Url;

/// HTTP client for the daemon's status and health endpoints.
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        self.get("healthz").await
    }

    pub async fn readiness(&self) -> Result<ReadinessResponse> {
        self.get("readyz").await
    }

    pub async fn status(&self) -> Result<CycleReport> {
        self.get("api/v1/status").await
    }
}

// API response types, mirroring the daemon's wire format.

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub components: HashMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    pub message: Option<String>,
    pub checked_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CycleReport {
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
    pub services: usize,
    pub decisions: Vec<ServiceDecision>,
    pub errors: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceDecision {
    pub service: String,
    pub replicas: Option<u64>,
    pub cpu_percent: Option<f64>,
    pub decision: ScaleDecision,
    pub outcome: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScaleDecision {
    pub action: String,
    pub target: Option<u64>,
}
