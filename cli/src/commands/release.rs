// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Release commands
//!
//! Commands: list, create, state, history, owner

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;
use uuid::Uuid;

use appcatalog_core::application::ApplicationManager;
use appcatalog_core::domain::application::ApplicationId;
use appcatalog_core::domain::release::{ApplicationRelease, LifecycleState, NewRelease};

use super::print_json;
use crate::bootstrap::{CallerArgs, Catalog};

#[derive(Subcommand)]
pub enum ReleaseCommand {
    /// List active releases of an application
    List {
        #[arg(value_name = "NAME")]
        name: String,

        #[arg(value_name = "TYPE")]
        app_type: String,
    },

    /// Add a release to an application from a YAML file
    Create {
        #[arg(value_name = "APP_ID")]
        application_id: i64,

        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Move a release to another lifecycle state
    State {
        #[arg(value_name = "RELEASE_UUID")]
        uuid: Uuid,

        /// CREATED, PUBLISHED or REMOVED
        #[arg(value_name = "STATE")]
        state: LifecycleState,
    },

    /// Show the lifecycle history of a release
    History {
        #[arg(value_name = "RELEASE_UUID")]
        uuid: Uuid,
    },

    /// Show the application a release belongs to
    Owner {
        #[arg(value_name = "RELEASE_UUID")]
        uuid: Uuid,
    },
}

pub async fn handle_command(
    catalog: &Catalog,
    identity: &CallerArgs,
    command: ReleaseCommand,
    json: bool,
) -> Result<()> {
    let caller = identity.caller();
    let manager = &catalog.manager;

    match command {
        ReleaseCommand::List { name, app_type } => {
            let releases = manager.get_releases(&caller, &name, &app_type).await?;
            if json {
                return print_json(&releases);
            }
            if releases.is_empty() {
                println!("{}", "No active releases".yellow());
            }
            for release in &releases {
                print_release(release);
            }
        }
        ReleaseCommand::Create {
            application_id,
            file,
        } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {:?}", file))?;
            let release: NewRelease = serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse release in {:?}", file))?;
            let stored = manager
                .create_release(&caller, ApplicationId(application_id), release)
                .await?;
            if json {
                return print_json(&stored);
            }
            println!("{}", format!("✓ Created release {}", stored.uuid).green());
            print_release(&stored);
        }
        ReleaseCommand::State { uuid, state } => {
            let record = manager.change_lifecycle_state(&caller, uuid, state).await?;
            if json {
                return print_json(&record);
            }
            println!(
                "{}",
                format!("✓ Release {} is now {}", uuid, record.state).green()
            );
        }
        ReleaseCommand::History { uuid } => {
            let history = manager.get_lifecycle_history(&caller, uuid).await?;
            if json {
                return print_json(&history);
            }
            for record in &history {
                println!(
                    "  {}  {:<9}  {}",
                    record.changed_at.to_rfc3339().dimmed(),
                    record.state.as_str(),
                    record.changed_by
                );
            }
        }
        ReleaseCommand::Owner { uuid } => {
            match manager.get_application_by_release(&caller, uuid).await? {
                Some(application) if json => print_json(&application)?,
                Some(application) => println!(
                    "{} ({}, id {})",
                    application.name.bold(),
                    application.app_type,
                    application.id
                ),
                None => println!("{}", format!("Release {} not found", uuid).yellow()),
            }
        }
    }

    Ok(())
}

fn print_release(release: &ApplicationRelease) {
    println!(
        "{} {} [{}]",
        release.version.bold(),
        release.uuid.to_string().dimmed(),
        release.effective_state()
    );
    println!("  Type: {}", release.release_type);
    println!("  Price: {}", release.price);
    println!("  Created: {} by {}", release.created_at.to_rfc3339(), release.created_by);
    if let (Some(by), Some(at)) = (&release.published_by, release.published_at) {
        println!("  Published: {} by {}", at.to_rfc3339(), by);
    }
}
