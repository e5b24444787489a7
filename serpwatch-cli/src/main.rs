//! serpwatch CLI - database migrations for the ranking crawler

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{check, init, migrate, status, GlobalArgs};

/// serpwatch - schema migrations for the ranking database
#[derive(Parser)]
#[command(name = "serpwatch", version, about, long_about = None)]
struct Cli {
    /// Database connection string (`:memory:`, `duckdb://<path>` or a path)
    #[arg(long, global = true, env = "DB_CONN_URL")]
    database: Option<String>,

    /// Log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply all pending migrations
    Migrate {
        /// Wrap each migration and its history record in one transaction
        #[arg(long)]
        transactional: bool,
        /// Skip the advisory run lock
        #[arg(long)]
        no_lock: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show applied and pending migrations
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Lint the migration catalog
    Check {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a settings file with the current configuration
    Init {
        /// Overwrite an existing settings file
        #[arg(long, short)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let global = GlobalArgs {
        database: cli.database,
    };

    match cli.command {
        Commands::Migrate {
            transactional,
            no_lock,
            json,
        } => migrate::run(&global, transactional, no_lock, json),
        Commands::Status { json } => status::run(&global, json),
        Commands::Check { json } => check::run(&global, json),
        Commands::Init { force } => init::run(&global, force),
    }
}
