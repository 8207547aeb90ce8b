//! Report writers: colored console summary, JSON, and markdown.

use crate::scenarios::ScenarioResult;
use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use serde_json::json;
use std::io::Write;
use std::time::Duration;

pub fn generate_console_report(results: &[ScenarioResult], total_duration: Duration) {
    println!();
    println!("{}", "Skysweep acceptance report".bold());
    println!("{}", "=".repeat(40));
    for result in results {
        let verdict = if result.passed {
            "PASS".green().bold()
        } else {
            "FAIL".red().bold()
        };
        println!(
            "{verdict}  {:<20} {:>8} iterations  {:>6} ms",
            result.name, result.iterations, result.duration_ms
        );
        for detail in &result.details {
            println!("      {}", detail.yellow());
        }
    }
    let failed = results.iter().filter(|result| !result.passed).count();
    println!("{}", "-".repeat(40));
    let summary = format!(
        "{} scenarios, {} failed, {:.1}s",
        results.len(),
        failed,
        total_duration.as_secs_f64()
    );
    if failed == 0 {
        println!("{}", summary.green());
    } else {
        println!("{}", summary.red());
    }
}

/// Write the machine-readable report.
///
/// # Errors
///
/// Returns an error when serialization or the write fails.
pub fn generate_json_report(results: &[ScenarioResult], out: &mut dyn Write) -> Result<()> {
    let report = json!({
        "generated_at": Utc::now().to_rfc3339(),
        "failed": results.iter().filter(|result| !result.passed).count(),
        "results": results,
    });
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}

/// Write the markdown report.
///
/// # Errors
///
/// Returns an error when the write fails.
pub fn generate_markdown_report(results: &[ScenarioResult], out: &mut dyn Write) -> Result<()> {
    writeln!(out, "# Skysweep acceptance report")?;
    writeln!(out)?;
    writeln!(out, "Generated: {}", Utc::now().to_rfc3339())?;
    writeln!(out)?;
    writeln!(out, "| Scenario | Result | Iterations | Duration (ms) |")?;
    writeln!(out, "|----------|--------|------------|---------------|")?;
    for result in results {
        writeln!(
            out,
            "| {} | {} | {} | {} |",
            result.name,
            if result.passed { "✅ pass" } else { "❌ fail" },
            result.iterations,
            result.duration_ms
        )?;
    }
    for result in results.iter().filter(|result| !result.details.is_empty()) {
        writeln!(out)?;
        writeln!(out, "## {}", result.name)?;
        writeln!(out)?;
        for detail in &result.details {
            writeln!(out, "- {detail}")?;
        }
    }
    Ok(())
}
