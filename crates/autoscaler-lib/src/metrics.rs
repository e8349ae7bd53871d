//! Utilization sampling from Prometheus
//!
//! One instant query per cycle computes the per-service, per-instance CPU
//! rate over a five-minute window, expressed as a percentage of one core.
//! Rows are folded into one [`UtilizationSample`] per distinct Swarm
//! service label.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::models::UtilizationSample;

/// Prometheus label carrying the Swarm service name on cAdvisor series.
pub const SERVICE_LABEL: &str = "container_label_com_docker_swarm_service_name";

/// The fixed CPU utilization query.
pub const CPU_QUERY: &str = "sum(rate(container_cpu_usage_seconds_total{container_label_com_docker_swarm_service_name=~\".+\"}[5m])) BY (container_label_com_docker_swarm_service_name, instance) * 100";

/// Failures of the metrics query. Any of these aborts the current cycle.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("invalid metrics base URL: {0}")]
    BaseUrl(#[from] url::ParseError),

    #[error("metrics backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("metrics backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("metrics backend reported query status {0:?}")]
    Query(String),

    #[error("malformed query response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Trait for utilization sample sources.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Fetch the latest sample set, one entry per distinct service.
    async fn fetch(&self) -> Result<Vec<UtilizationSample>>;
}

/// Prometheus instant-query API response.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: QueryData,
}

#[derive(Debug, Default, Deserialize)]
struct QueryData {
    #[serde(default)]
    result: Vec<QueryRow>,
}

#[derive(Debug, Deserialize)]
struct QueryRow {
    #[serde(default)]
    metric: HashMap<String, String>,
    /// `[timestamp, "value"]` per the Prometheus API.
    value: (f64, String),
}

/// [`MetricsSource`] backed by a Prometheus HTTP endpoint.
pub struct PrometheusSource {
    client: reqwest::Client,
    endpoint: Url,
}

impl PrometheusSource {
    /// Create a source for the given Prometheus base URL.
    pub fn new(base_url: &str) -> Result<Self, MetricsError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        let endpoint = Url::parse(base_url)?.join("api/v1/query")?;

        Ok(Self { client, endpoint })
    }

    async fn query(&self) -> Result<Vec<UtilizationSample>, MetricsError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("query", CPU_QUERY)])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(MetricsError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: QueryResponse = serde_json::from_str(&body)?;
        if parsed.status != "success" {
            return Err(MetricsError::Query(parsed.status));
        }

        Ok(aggregate(parsed.data.result))
    }
}

#[async_trait]
impl MetricsSource for PrometheusSource {
    async fn fetch(&self) -> Result<Vec<UtilizationSample>> {
        Ok(self.query().await?)
    }
}

/// Fold per-(service, instance) rows into one averaged sample per service,
/// preserving the order services first appear in the query result.
fn aggregate(rows: Vec<QueryRow>) -> Vec<UtilizationSample> {
    let mut order: Vec<String> = Vec::new();
    let mut sums: HashMap<String, (f64, u32)> = HashMap::new();

    for row in rows {
        let service = match row.metric.get(SERVICE_LABEL) {
            Some(s) if !s.is_empty() => s.clone(),
            _ => {
                warn!("query row without a service label, skipping");
                continue;
            }
        };

        let value: f64 = match row.value.1.parse() {
            Ok(v) => v,
            Err(_) => {
                warn!(service = %service, raw = %row.value.1, "unparseable sample value, skipping");
                continue;
            }
        };

        let entry = sums.entry(service.clone()).or_insert_with(|| {
            order.push(service.clone());
            (0.0, 0)
        });
        entry.0 += value;
        entry.1 += 1;
    }

    order
        .into_iter()
        .map(|service| {
            let (sum, count) = sums[&service];
            UtilizationSample {
                service,
                cpu_percent: sum / f64::from(count),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(service: Option<&str>, instance: &str, value: &str) -> QueryRow {
        let mut metric = HashMap::new();
        if let Some(s) = service {
            metric.insert(SERVICE_LABEL.to_string(), s.to_string());
        }
        metric.insert("instance".to_string(), instance.to_string());
        QueryRow {
            metric,
            value: (1_700_000_000.0, value.to_string()),
        }
    }

    #[test]
    fn aggregate_averages_instances_per_service() {
        let samples = aggregate(vec![
            row(Some("web"), "node1", "80"),
            row(Some("web"), "node2", "100"),
            row(Some("db"), "node1", "10"),
        ]);

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].service, "web");
        assert!((samples[0].cpu_percent - 90.0).abs() < f64::EPSILON);
        assert_eq!(samples[1].service, "db");
        assert!((samples[1].cpu_percent - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn aggregate_preserves_source_order() {
        let samples = aggregate(vec![
            row(Some("c"), "n1", "1"),
            row(Some("a"), "n1", "1"),
            row(Some("b"), "n1", "1"),
            row(Some("a"), "n2", "3"),
        ]);

        let names: Vec<&str> = samples.iter().map(|s| s.service.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn aggregate_skips_unlabeled_and_unparseable_rows() {
        let samples = aggregate(vec![
            row(None, "n1", "50"),
            row(Some("web"), "n1", "NaN-ish"),
            row(Some("web"), "n2", "42"),
        ]);

        assert_eq!(samples.len(), 1);
        assert!((samples[0].cpu_percent - 42.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parses_instant_query_response() {
        let body = r#"{
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [
                    {
                        "metric": {
                            "container_label_com_docker_swarm_service_name": "web",
                            "instance": "10.0.0.5:8080"
                        },
                        "value": [1700000000.123, "91.5"]
                    }
                ]
            }
        }"#;

        let parsed: QueryResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.status, "success");

        let samples = aggregate(parsed.data.result);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].service, "web");
        assert!((samples[0].cpu_percent - 91.5).abs() < f64::EPSILON);
    }

    #[test]
    fn error_status_is_rejected() {
        let body = r#"{"status": "error", "errorType": "bad_data", "error": "boom"}"#;
        let parsed: QueryResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.status, "error");
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(PrometheusSource::new("not a url").is_err());
        assert!(PrometheusSource::new("http://prometheus:9090").is_ok());
    }
}
