// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Application Catalog CLI
//!
//! The `appcatalog` binary manages applications, releases and their
//! lifecycle in a tenant-scoped catalog backed by SQLite.
//!
//! ## Commands
//!
//! - `appcatalog app create|list|show|exists|edit|delete|latest` - Application operations
//! - `appcatalog release list|create|state|history|owner` - Release operations
//! - `appcatalog config show|validate|generate` - Configuration management
//! - `appcatalog update` - Apply schema migrations
//!
//! Every catalog command acts as the caller given by `--tenant` and `--user`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::debug;

use appcatalog::bootstrap::{CallerArgs, Catalog};
use appcatalog::commands::{self, AppCommand, ConfigCommand, ReleaseCommand};

/// Application catalog - tenant-scoped applications, releases and visibility
#[derive(Parser)]
#[command(name = "appcatalog")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "APPCATALOG_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Tenant the caller belongs to
    #[arg(long, global = true, env = "APPCATALOG_TENANT_ID", default_value_t = 1)]
    tenant: i64,

    /// Username the caller acts as
    #[arg(long, global = true, env = "APPCATALOG_USER", default_value = "admin")]
    user: String,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "APPCATALOG_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Application operations
    #[command(name = "app")]
    App {
        #[command(subcommand)]
        command: AppCommand,
    },

    /// Release operations
    #[command(name = "release")]
    Release {
        #[command(subcommand)]
        command: ReleaseCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Update the catalog database schema
    #[command(name = "update")]
    Update {
        #[command(flatten)]
        command: commands::UpdateCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let identity = CallerArgs {
        tenant_id: cli.tenant,
        username: cli.user.clone(),
    };
    debug!(tenant_id = identity.tenant_id, username = %identity.username, "Resolved caller");

    match cli.command {
        Some(Commands::App { command }) => {
            let catalog = Catalog::open(cli.config).await?;
            let result = commands::app::handle_command(&catalog, &identity, command, cli.json).await;
            catalog.close().await;
            result
        }
        Some(Commands::Release { command }) => {
            let catalog = Catalog::open(cli.config).await?;
            let result =
                commands::release::handle_command(&catalog, &identity, command, cli.json).await;
            catalog.close().await;
            result
        }
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        Some(Commands::Update { command }) => commands::update::execute(command, cli.config).await,
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    Ok(())
}
