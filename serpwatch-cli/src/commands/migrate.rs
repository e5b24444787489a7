//! Migrate command - apply pending migrations

use std::collections::HashMap;
use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::json;
use serpwatch_core::{OperationResult, RunOutcome, RunReport};

use super::{get_context, GlobalArgs};
use crate::output;

pub fn run(global: &GlobalArgs, transactional: bool, no_lock: bool, json: bool) -> Result<ExitCode> {
    let mut ctx = get_context(global)?;
    if transactional {
        ctx.config.transactional = true;
    }
    if no_lock {
        ctx.config.lock = false;
    }

    if !json {
        output::info("Running migrations...");
    }
    let progress = |name: &str| {
        if !json {
            println!("{} {}", "Migrating:".green(), name);
        }
    };
    let outcome = ctx
        .migrate_with_progress(&progress)
        .context("Failed to start migration run")?;

    if json {
        let result: OperationResult<RunReport> = match &outcome {
            RunOutcome::Done(report) => OperationResult::ok(report.clone()),
            RunOutcome::Failed(failure) => {
                let context = HashMap::from([
                    ("run_id".to_string(), json!(outcome.run_id())),
                    ("migration".to_string(), json!(failure.migration)),
                    ("stage".to_string(), json!(failure.stage)),
                    ("applied".to_string(), json!(failure.applied)),
                ]);
                OperationResult::fail_with_context(failure.error.message(), context)
            }
        };
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(exit_code(&outcome));
    }

    match &outcome {
        RunOutcome::Done(report) if report.applied.is_empty() => {
            output::info(&format!(
                "Database is up to date ({} migrations applied)",
                report.already_applied()
            ));
        }
        RunOutcome::Done(report) => {
            output::success(&format!("Applied {} migration(s)", report.applied.len()));
        }
        RunOutcome::Failed(failure) => {
            output::error(&failure.to_string());
        }
    }

    Ok(exit_code(&outcome))
}

fn exit_code(outcome: &RunOutcome) -> ExitCode {
    if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
