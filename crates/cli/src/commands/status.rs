//! Daemon health and readiness summary

use anyhow::Result;
use colored::Colorize;

use crate::client::ApiClient;
use crate::output::{color_status, OutputFormat};

/// Show daemon health, readiness, and per-component detail
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;
    let readiness = client.readiness().await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "status": health.status,
                "ready": readiness.ready,
                "reason": readiness.reason,
                "components": health.components.keys().collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Table => {
            println!("{}", "Swarm Autoscaler".bold());
            println!("{}", "=".repeat(40));
            println!("Status: {}", color_status(&health.status));
            println!(
                "Ready:  {}",
                if readiness.ready {
                    color_status("ready")
                } else {
                    color_status("not ready")
                }
            );
            if let Some(reason) = &readiness.reason {
                println!("Reason: {}", reason.yellow());
            }
            println!();

            let mut components: Vec<_> = health.components.iter().collect();
            components.sort_by_key(|(name, _)| name.as_str());

            for (name, component) in components {
                match &component.message {
                    Some(message) => println!(
                        "  {:<16} {}  ({})",
                        name,
                        color_status(&component.status),
                        message
                    ),
                    None => println!("  {:<16} {}", name, color_status(&component.status)),
                }
            }
        }
    }

    Ok(())
}
