// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Database Update Command
//!
//! Implements `appcatalog update`, which applies the catalog schema
//! migrations embedded in `appcatalog-core`.
//!
//! # Architecture
//!
//! - **Layer:** CLI/Presentation
//! - **Purpose:** Database schema migration management
//! - **Integration:** CLI → SQLx Migrator → SQLite
//!
//! # Usage
//!
//! ```bash
//! # Apply all pending migrations
//! appcatalog update
//!
//! # Preview migrations without applying
//! appcatalog update --dry-run
//! ```
//!
//! The database URL comes from the configuration manifest, or from
//! `APPCATALOG_DATABASE_URL` when set.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::collections::HashSet;
use std::path::PathBuf;

use appcatalog_core::domain::catalog_config::CatalogConfigManifest;
use appcatalog_core::infrastructure::db::{Database, MIGRATOR};

#[derive(Args)]
pub struct UpdateCommand {
    /// Perform a dry run without applying changes
    #[arg(long)]
    dry_run: bool,
}

pub async fn execute(cmd: UpdateCommand, config_path: Option<PathBuf>) -> Result<()> {
    println!("{}", "Application Catalog Update".bold().green());

    let config = CatalogConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    println!("Connecting to {}...", config.spec.database.url);
    let database = Database::connect(&config.spec.database)
        .await
        .context("Failed to connect to database")?;

    // The bookkeeping table does not exist before the first run
    let applied: HashSet<i64> = sqlx::query_scalar::<_, i64>("SELECT version FROM _sqlx_migrations")
        .fetch_all(database.get_pool())
        .await
        .map(|versions| versions.into_iter().collect())
        .unwrap_or_default();

    let pending: Vec<_> = MIGRATOR
        .iter()
        .filter(|migration| !applied.contains(&migration.version))
        .collect();
    let total = MIGRATOR.iter().count();

    println!(
        "Migration status: {} applied, {} total available.",
        total - pending.len(),
        total
    );

    if pending.is_empty() {
        println!("{}", "✓ Database is up to date.".green());
        database.close().await;
        return Ok(());
    }

    if cmd.dry_run {
        println!("Pending migrations found (Dry Run):");
        for migration in &pending {
            println!(" - {} {}", migration.version, migration.description);
        }
        println!("Skipping application due to --dry-run");
        database.close().await;
        return Ok(());
    }

    println!("Applying pending migrations...");
    database.migrate().await?;
    println!("{}", "✓ Database updated successfully.".green());
    database.close().await;

    Ok(())
}
