use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::cli::OutputFormat;
use crate::payload::PayloadSchema;
use crate::plugins::{ExecutionResult, Plugin, ERROR_KEY};

/// Render a result envelope in the requested format
pub fn format_result(result: &ExecutionResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(format_as_text(result)),
        OutputFormat::Json => {
            serde_json::to_string_pretty(result).context("Failed to serialize result")
        }
    }
}

/// `name: value` lines, or `Error: message` lines for a failed envelope
pub fn format_as_text(result: &ExecutionResult) -> String {
    let mut lines: Vec<String> = result
        .outputs
        .iter()
        .filter(|(key, _)| key.as_str() != ERROR_KEY)
        .map(|(key, value)| format!("{}: {}", key, value))
        .collect();

    if let Some(message) = result.error() {
        lines.push(format!("Error: {}", message));
    }

    lines.join("\n")
}

/// Print a result: successful text goes to stdout, failures to stderr.
/// JSON always goes to stdout so it stays machine-readable.
pub fn print_result(result: &ExecutionResult, format: OutputFormat) -> Result<()> {
    let content = format_result(result, format)?;

    match format {
        OutputFormat::Json => println!("{}", content),
        OutputFormat::Text if result.success => {
            if content.is_empty() {
                println!("{}", style("Nothing to do: no recognized actions").dim());
            } else {
                println!("{}", content);
            }
        }
        OutputFormat::Text => {
            for line in content.lines() {
                match line.strip_prefix("Error: ") {
                    Some(message) => eprintln!("{} {}", style("Error:").red().bold(), message),
                    None => println!("{}", line),
                }
            }
        }
    }

    Ok(())
}

/// Describe one plugin's payload fields and actions
pub fn format_schema(schema: &PayloadSchema) -> String {
    let optional: Vec<String> = schema
        .optional
        .iter()
        .map(|(name, default)| match default {
            Some(value) => format!("{}={}", name, value),
            None => name.to_string(),
        })
        .collect();

    format!(
        "required: {}\n    optional: {}\n    actions: {}",
        schema.required.join(", "),
        if optional.is_empty() { "-".to_string() } else { optional.join(", ") },
        schema.actions.join(", ")
    )
}

/// Print the registered plugins
pub fn print_plugins(plugins: &[std::sync::Arc<dyn Plugin>], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let schemas: Vec<&PayloadSchema> = plugins.iter().map(|p| p.schema()).collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&schemas).context("Failed to serialize plugin list")?
            );
        }
        OutputFormat::Text => {
            println!("Registered plugins:");
            for plugin in plugins {
                println!("  • {} - {}", style(plugin.name()).bold(), plugin.description());
                println!("    {}", format_schema(plugin.schema()));
            }
        }
    }
    Ok(())
}

/// Spinner shown while a plugin runs
pub fn spinner(message: String) -> ProgressBar {
    let progress = ProgressBar::new_spinner();
    let template = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    progress.set_style(template);
    progress.set_message(message);
    progress.enable_steady_tick(Duration::from_millis(120));
    progress
}
