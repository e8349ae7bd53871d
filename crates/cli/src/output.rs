//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Format a utilization percentage, or a dash when no sample was seen
pub fn format_cpu(cpu_percent: Option<f64>) -> String {
    match cpu_percent {
        Some(p) => format!("{:.1}%", p),
        None => "-".to_string(),
    }
}

/// Color a health/readiness status keyword
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "ready" => status.green().to_string(),
        "degraded" => status.yellow().to_string(),
        "unhealthy" | "not ready" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Color a decision action keyword
pub fn color_action(action: &str) -> String {
    match action {
        "scale_up" => action.green().to_string(),
        "scale_down" => action.blue().to_string(),
        "enforce_minimum" | "enforce_maximum" => action.yellow().to_string(),
        "no_action" => action.dimmed().to_string(),
        _ => action.to_string(),
    }
}

/// Color a per-service outcome keyword
pub fn color_outcome(outcome: &str) -> String {
    match outcome {
        "applied" => outcome.green().to_string(),
        "idle" => outcome.dimmed().to_string(),
        "disabled" => outcome.yellow().to_string(),
        "actuation_failed" | "inspect_failed" => outcome.red().to_string(),
        _ => outcome.to_string(),
    }
}
