// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use appcatalog_core::domain::catalog_config::CatalogConfigManifest;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./appcatalog-config.yaml)
        #[arg(short, long, default_value = "./appcatalog-config.yaml")]
        output: PathBuf,

        /// Include a sample tenant with users and device types
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = CatalogConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        println!(
            "  2. APPCATALOG_CONFIG_PATH: {}",
            std::env::var("APPCATALOG_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./appcatalog-config.yaml");
        println!("  4. ~/.appcatalog/config.yaml");
        println!("  5. /etc/appcatalog/config.yaml");
        println!();
    }

    println!("{} {}", "Catalog:".bold(), config.metadata.name);
    println!();

    let database = &config.spec.database;
    println!("{}", "Database:".bold());
    println!("  URL: {}", database.url);
    println!("  Max connections: {}", database.max_connections);
    println!("  Busy timeout: {}ms", database.busy_timeout_ms);
    println!("  Run migrations: {}", database.run_migrations);
    println!();

    println!("{}", "Listing:".bold());
    println!("  Default limit: {}", config.spec.listing.default_limit);
    println!("  Max limit: {}", config.spec.listing.max_limit);
    println!();

    let identity = &config.spec.identity;
    println!("{}", "Identity:".bold());
    println!("  Admin permission: {}", identity.admin_permission);
    for tenant in &identity.tenants {
        println!(
            "  Tenant {} {}",
            tenant.id.to_string().bold(),
            tenant.domain.as_deref().unwrap_or("").dimmed()
        );
        println!("    Users: {}", tenant.users.len());
        let device_types: Vec<&str> = tenant
            .device_types
            .iter()
            .map(|device_type| device_type.name.as_str())
            .collect();
        println!("    Device types: {}", device_types.join(", "));
    }
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = CatalogConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    if with_examples {
        std::fs::write(&output, include_str!("../../templates/config-with-examples.yaml"))
            .with_context(|| format!("Failed to write config to {:?}", output))?;
    } else {
        CatalogConfigManifest::default()
            .to_yaml_file(&output)
            .with_context(|| format!("Failed to write config to {:?}", output))?;
    }

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}
