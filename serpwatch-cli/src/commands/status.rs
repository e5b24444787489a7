//! Status command - show applied and pending migrations

use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;

use super::{get_context, GlobalArgs};
use crate::output;

pub fn run(global: &GlobalArgs, json: bool) -> Result<ExitCode> {
    let ctx = get_context(global)?;
    let status = ctx.status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("{}", "Migration Status".bold());
    println!("History table: {}", status.history_table);
    println!();

    if !status.initialized {
        output::warning("History table does not exist yet; every migration is pending");
    } else if status.applied.is_empty() {
        println!("No migrations applied");
    } else {
        let mut table = output::create_table();
        table.set_header(vec!["#", "Migration", "Applied at"]);
        for (i, record) in status.applied.iter().enumerate() {
            let applied_at = record
                .applied_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string());
            table.add_row(vec![(i + 1).to_string(), record.name.clone(), applied_at]);
        }
        println!("{}", table);
    }
    println!();

    if status.pending.is_empty() {
        output::success("No pending migrations");
    } else {
        println!("{} ({})", "Pending".bold(), status.pending.len());
        for name in &status.pending {
            println!("  • {}", name);
        }
    }

    if !status.unknown.is_empty() {
        println!();
        output::warning(&format!(
            "{} recorded migration(s) are not in the catalog:",
            status.unknown.len()
        ));
        for name in &status.unknown {
            println!("  • {}", name);
        }
    }

    Ok(ExitCode::SUCCESS)
}
