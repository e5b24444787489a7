//! Check command - lint the migration catalog

use std::process::ExitCode;

use anyhow::Result;
use comfy_table::{Cell, Color};
use serpwatch_core::services::Severity;

use super::{get_context, GlobalArgs};
use crate::output;

pub fn run(global: &GlobalArgs, json: bool) -> Result<ExitCode> {
    let ctx = get_context(global)?;
    let report = ctx.check();
    let code = if report.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(code);
    }

    if report.issues.is_empty() {
        output::success(&format!("{} migrations checked, no issues", report.checked));
        return Ok(code);
    }

    let mut table = output::create_table();
    table.set_header(vec!["Severity", "Migration", "Issue"]);
    for issue in &report.issues {
        let severity = match issue.severity {
            Severity::Error => Cell::new("error").fg(Color::Red),
            Severity::Warning => Cell::new("warning").fg(Color::Yellow),
        };
        table.add_row(vec![
            severity,
            Cell::new(&issue.migration),
            Cell::new(&issue.message),
        ]);
    }
    println!("{}", table);

    let summary = format!("{} migrations checked, {} issue(s)", report.checked, report.issues.len());
    if report.has_errors() {
        output::error(&summary);
    } else {
        output::warning(&summary);
    }

    Ok(code)
}
