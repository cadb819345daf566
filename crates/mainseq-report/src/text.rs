use colored::Colorize;

use mainseq_core::graph::EdgePolicy;
use mainseq_core::result::MetricsResult;

/// Format a full analysis report for terminal output.
pub fn format_report(result: &MetricsResult) -> String {
    let mut out = String::new();

    // Header
    out.push_str(&format!(
        "\n{}\n",
        "Mainseq - Main Sequence Analysis".bold()
    ));
    out.push_str(&format!("{}\n\n", "=".repeat(48)));

    // Summary
    let avg_str = format!("{:.3}", result.average_distance);
    let avg_colored = if result.average_distance <= 0.1 {
        avg_str.green()
    } else if result.average_distance <= 0.3 {
        avg_str.yellow()
    } else {
        avg_str.red()
    };
    out.push_str(&format!(
        "{}: {} components, {} dependency references\n",
        "Summary".bold(),
        result.component_count,
        result.dependency_count,
    ));
    out.push_str(&format!(
        "Average distance from main sequence: {avg_colored}\n"
    ));
    let policy = match result.edge_policy {
        EdgePolicy::MultiEdge => "one edge per reference",
        EdgePolicy::Collapsed => "repeated references collapsed",
    };
    out.push_str(&format!("Edge policy: {policy}\n"));

    // Per-component table
    if !result.components.is_empty() {
        out.push_str(&format!("\n{}\n{}\n", "Components".bold(), "-".repeat(48)));
        let width = result
            .components
            .iter()
            .map(|m| m.identifier.as_str().len())
            .max()
            .unwrap_or(0)
            .max("component".len());
        out.push_str(&format!(
            "  {:<width$}      A      I      D\n",
            "component"
        ));
        for m in &result.components {
            let d_str = format!("{:.3}", m.distance);
            let d_colored = if m.exceeds_threshold {
                d_str.red().to_string()
            } else {
                d_str.green().to_string()
            };
            let cycle_mark = if m.in_cycle { " (cycle)" } else { "" };
            out.push_str(&format!(
                "  {:<width$}  {:.3}  {:.3}  {}{}\n",
                m.identifier.as_str(),
                m.abstractness,
                m.instability,
                d_colored,
                cycle_mark,
            ));
        }
    }

    // Cycles
    if result.cycles.is_empty() {
        out.push_str(&format!("\n{}\n", "No dependency cycles found.".green()));
    } else {
        out.push_str(&format!(
            "\n{} ({} found)\n{}\n",
            "Cycles".red().bold(),
            result.cycles.len(),
            "-".repeat(48),
        ));
        for cycle in &result.cycles {
            let walk = cycle
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join(" -> ");
            let back = cycle.first().map(|c| c.as_str()).unwrap_or("");
            out.push_str(&format!("  {walk} -> {back}\n"));
        }
    }

    // Worst offenders
    if !result.worst_offenders.is_empty() {
        out.push_str(&format!("\n{}\n", "Worst offenders".bold()));
        for id in result.worst_offenders.iter().take(10) {
            out.push_str(&format!("  {id}\n"));
        }
    }

    // Warnings
    if !result.warnings.is_empty() {
        out.push_str(&format!(
            "\n{} ({} found)\n",
            "Warnings".yellow().bold(),
            result.warnings.len()
        ));
        for warning in &result.warnings {
            out.push_str(&format!("  {warning}\n"));
        }
    }

    out.push('\n');
    out
}

/// Format a check result for CI use. Returns (text, passed).
///
/// With a distance limit, the gate is the average distance; without one,
/// any component over the configured threshold fails the check.
pub fn format_check(result: &MetricsResult, max_distance: Option<f64>) -> (String, bool) {
    let passed = check_passes(result, max_distance);

    let mut out = format_report(result);
    if passed {
        out.push_str(&format!("{}\n", "CHECK PASSED".green().bold()));
    } else {
        match max_distance {
            Some(max) => out.push_str(&format!(
                "{}: average distance {:.3} exceeds limit {max:.3}\n",
                "CHECK FAILED".red().bold(),
                result.average_distance,
            )),
            None => {
                let offenders = result
                    .components
                    .iter()
                    .filter(|m| m.exceeds_threshold)
                    .count();
                out.push_str(&format!(
                    "{}: {offenders} component(s) exceed the distance threshold\n",
                    "CHECK FAILED".red().bold(),
                ));
            }
        }
    }
    (out, passed)
}

pub(crate) fn check_passes(result: &MetricsResult, max_distance: Option<f64>) -> bool {
    match max_distance {
        Some(max) => result.average_distance <= max,
        None => result.components.iter().all(|m| !m.exceeds_threshold),
    }
}
