//! CLI command implementations

pub mod check;
pub mod init;
pub mod migrate;
pub mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};
use serpwatch_core::config::Config;
use serpwatch_core::MigrateContext;

/// Options shared by every command
pub struct GlobalArgs {
    pub database: Option<String>,
}

/// Get the serpwatch directory from environment or default
pub fn get_serpwatch_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("SERPWATCH_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".serpwatch"))
        .context("Could not find home directory; set SERPWATCH_DIR")
}

/// Resolve config: settings file, then environment, then CLI flags
pub fn get_config(global: &GlobalArgs) -> Result<Config> {
    let serpwatch_dir = get_serpwatch_dir()?;
    let mut config = Config::load(&serpwatch_dir)
        .with_context(|| format!("Failed to load config from {:?}", serpwatch_dir))?;

    if let Some(url) = &global.database {
        config.database_url = url.clone();
    }
    Ok(config)
}

/// Build a context with the bundled catalog
pub fn get_context(global: &GlobalArgs) -> Result<MigrateContext> {
    let config = get_config(global)?;
    tracing::debug!(database = %config.database_url, table = %config.history_table, "resolved config");
    Ok(MigrateContext::new(config, serpwatch_core::migrations::catalog()))
}
