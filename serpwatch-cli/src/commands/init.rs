//! Init command - write the settings file

use std::process::ExitCode;

use anyhow::{Context, Result};
use serpwatch_core::config::Config;

use super::{get_config, get_serpwatch_dir, GlobalArgs};
use crate::output;

pub fn run(global: &GlobalArgs, force: bool) -> Result<ExitCode> {
    let serpwatch_dir = get_serpwatch_dir()?;
    let settings_path = Config::settings_path(&serpwatch_dir);

    if settings_path.exists() && !force {
        output::warning(&format!(
            "{} already exists (use --force to overwrite)",
            settings_path.display()
        ));
        return Ok(ExitCode::FAILURE);
    }

    std::fs::create_dir_all(&serpwatch_dir)
        .with_context(|| format!("Failed to create serpwatch directory: {:?}", serpwatch_dir))?;

    let config = get_config(global)?;
    config.save(&serpwatch_dir)?;

    output::success(&format!("Wrote {}", settings_path.display()));
    println!("Database: {}", config.database_url);
    println!("History table: {}", config.history_table);
    Ok(ExitCode::SUCCESS)
}
