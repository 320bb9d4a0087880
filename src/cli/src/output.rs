//! Table formatting helpers for CLI output.

use acm_mirror_runtime::RunReport;
use comfy_table::{ContentArrangement, Table};

/// Create a styled table with the given headers.
pub fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.load_preset(comfy_table::presets::NOTHING);
    table.set_header(headers);
    table
}

/// Build the end-of-run summary table.
pub fn summary_table(report: &RunReport) -> Table {
    let mut table = new_table(&["RESULT", "COUNT", "DETAIL"]);
    table.add_row(vec![
        "synced".to_string(),
        report.succeeded.to_string(),
        String::new(),
    ]);
    table.add_row(vec![
        "failed".to_string(),
        report.failed.len().to_string(),
        report.failed.join("\n"),
    ]);
    table.add_row(vec![
        "skipped".to_string(),
        report.skipped.len().to_string(),
        report.skipped.join("\n"),
    ]);
    if let Some(ref catalogs) = report.catalogs {
        table.add_row(vec![
            "catalogs synced".to_string(),
            catalogs.synced.len().to_string(),
            catalogs.synced.join(", "),
        ]);
        table.add_row(vec![
            "catalogs failed".to_string(),
            catalogs.failed.len().to_string(),
            catalogs.failed.join(", "),
        ]);
    }
    table.add_row(vec![
        "policy entries".to_string(),
        report.entries.to_string(),
        report.output.display().to_string(),
    ]);
    table
}

/// Print the run summary to stdout.
pub fn print_summary(report: &RunReport) {
    println!();
    println!("{}", summary_table(report));
}
