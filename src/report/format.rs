//! Formatted terminal output for a run.
//!
//! We keep formatting code in one place so:
//! - the math/accumulation code stays clean and testable
//! - output changes are localized

use crate::app::pipeline::{IngestSummary, RunOutput};
use crate::domain::Coefficients;
use crate::error::AppError;
use crate::io::ingest::RowError;

/// Skipped rows listed individually before the list is cut short.
const MAX_ROW_ERRORS: usize = 10;

/// Format the full run summary (inputs + merge + damping + coefficients).
pub fn format_run_summary(run: &RunOutput) -> String {
    let mut out = String::new();

    out.push_str("=== ols - least squares via normal equations ===\n");
    out.push_str(&format!(
        "Shape: dimension={} bias={} (n={})\n",
        run.regression.dimension,
        run.regression.bias,
        run.regression.effective_dimension()
    ));
    out.push_str(&format!("Regularization: {:e}\n", run.regression.regularization));

    match &run.ingest {
        Some(ingest) => out.push_str(&format_ingest(ingest)),
        None => out.push_str(&format!("Partials merged: {}\n", run.partials)),
    }
    out.push_str(&format!("Observations: {}\n", run.global.observation_count()));
    out.push_str(&format!("Execution time: {:.2} seconds\n", run.elapsed.as_secs_f64()));

    out.push_str("\nCoefficients:\n");
    out.push_str(&format_coefficient_table(
        &run.regression.coefficient_names(),
        &run.coefficients,
    ));

    out
}

fn format_ingest(ingest: &IngestSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!("Inputs: {}\n", ingest.inputs.join(", ")));
    out.push_str(&format!("Partitions: {}\n", ingest.partitions));
    out.push_str(&format!(
        "Rows: read={} used={} skipped={}\n",
        ingest.rows_read,
        ingest.rows_used,
        ingest.row_errors.len()
    ));
    if !ingest.row_errors.is_empty() {
        out.push_str(&format_row_errors(&ingest.row_errors));
    }
    out
}

fn format_row_errors(errors: &[RowError]) -> String {
    let mut out = String::new();
    for e in errors.iter().take(MAX_ROW_ERRORS) {
        out.push_str(&format!("  {}:{}: {}\n", e.source, e.line, e.message));
    }
    if errors.len() > MAX_ROW_ERRORS {
        out.push_str(&format!("  ... and {} more\n", errors.len() - MAX_ROW_ERRORS));
    }
    out
}

/// Two-column `name  value` table.
pub fn format_coefficient_table(names: &[String], coefficients: &Coefficients) -> String {
    let mut out = String::new();
    out.push_str(format!("{:<12} {:>20}", "name", "value").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<12} {:-<20}", "", "").trim_end());
    out.push('\n');
    for (name, value) in names.iter().zip(coefficients.values()) {
        out.push_str(format!("{:<12} {:>20.10}", name, value).trim_end());
        out.push('\n');
    }
    out
}

/// The bare JSON array of coefficients.
pub fn format_coefficients_json(coefficients: &Coefficients) -> Result<String, AppError> {
    serde_json::to_string(coefficients.values())
        .map_err(|e| AppError::new(2, format!("Failed to encode coefficients: {e}")))
}
