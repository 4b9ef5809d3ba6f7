//! Terminal rendering of export summaries.

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};
use std::io::{self, IsTerminal};

use crate::models::SummaryReport;

/// Check if stdout is a terminal.
#[inline]
pub fn is_terminal() -> bool {
    io::stdout().is_terminal()
}

/// Render a summary report as a two-column table
pub fn render_summary_table(report: &SummaryReport) -> String {
    let summary = &report.data_quality_summary;
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![Cell::new("Metric"), Cell::new("Value")]);

    let rows = [
        ("Total customers", report.total_customers.to_string()),
        ("High quality (>= 90)", summary.high_quality.to_string()),
        ("Medium quality (70-89)", summary.medium_quality.to_string()),
        ("Low quality (< 70)", summary.low_quality.to_string()),
        ("Exported at", report.export_timestamp.to_rfc3339()),
    ];
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }

    table.to_string()
}
