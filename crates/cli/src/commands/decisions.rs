//! Last-cycle decision listing

use anyhow::Result;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use crate::client::ApiClient;
use crate::output::{color_action, color_outcome, format_cpu, print_warning, OutputFormat};

/// Row for the decisions table
#[derive(Tabled)]
struct DecisionRow {
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "Replicas")]
    replicas: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Outcome")]
    outcome: String,
}

/// Show the per-service decisions of the last completed cycle
pub async fn show_decisions(client: &ApiClient, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            // The report is already the wire format; fetch untyped so
            // unknown fields survive.
            let raw: serde_json::Value = client.get("api/v1/status").await?;
            println!("{}", serde_json::to_string_pretty(&raw)?);
        }
        OutputFormat::Table => {
            let report = client.status().await?;
            println!("{}", "Last Evaluation Cycle".bold());
            println!("{}", "=".repeat(40));
            println!("Started:  {}", report.started_at.to_rfc3339());
            println!("Finished: {}", report.finished_at.to_rfc3339());
            println!("Services: {}", report.services);
            if report.errors > 0 {
                print_warning(&format!("{} per-service failures", report.errors));
            }
            println!();

            if report.decisions.is_empty() {
                print_warning("No services observed in the last cycle");
                return Ok(());
            }

            let rows: Vec<DecisionRow> = report
                .decisions
                .iter()
                .map(|d| DecisionRow {
                    service: d.service.clone(),
                    replicas: d
                        .replicas
                        .map(|r| r.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    cpu: format_cpu(d.cpu_percent),
                    action: color_action(&d.decision.action),
                    target: d
                        .decision
                        .target
                        .map(|t| t.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    outcome: color_outcome(&d.outcome),
                })
                .collect();

            let table = Table::new(rows).with(Style::rounded()).to_string();
            println!("{}", table);
        }
    }

    Ok(())
}
