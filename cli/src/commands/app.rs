// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Application commands
//!
//! Commands: create, list, show, exists, edit, delete, latest

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use appcatalog_core::application::ApplicationManager;
use appcatalog_core::domain::application::{
    Application, ApplicationEdit, ApplicationId, NewApplication, Tag, UnrestrictedRole,
};
use appcatalog_core::domain::filter::Filter;

use super::print_json;
use crate::bootstrap::{CallerArgs, Catalog};

#[derive(Subcommand)]
pub enum AppCommand {
    /// Create an application and its initial release from a YAML file
    Create {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// List applications visible to the caller
    List {
        /// Name to search for
        #[arg(short, long)]
        search: Option<String>,

        /// Match the whole name instead of a substring
        #[arg(long, requires = "search")]
        exact: bool,

        /// Page size (default: spec.listing.default_limit)
        #[arg(long)]
        limit: Option<u32>,

        #[arg(long, default_value_t = 0)]
        offset: u32,
    },

    /// Show one application with its active releases
    Show {
        #[arg(value_name = "NAME")]
        name: String,

        #[arg(value_name = "TYPE")]
        app_type: String,
    },

    /// Check whether an application exists
    Exists {
        #[arg(value_name = "NAME")]
        name: String,

        #[arg(value_name = "TYPE")]
        app_type: String,
    },

    /// Edit an application; omitted options keep their stored value
    Edit {
        #[arg(value_name = "NAME")]
        name: String,

        #[arg(value_name = "TYPE")]
        app_type: String,

        #[arg(long)]
        rename: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        free: Option<bool>,

        #[arg(long, conflicts_with = "clear_currency")]
        currency: Option<String>,

        #[arg(long)]
        clear_currency: bool,

        #[arg(long)]
        restricted: Option<bool>,

        /// Replace tags (comma separated)
        #[arg(long, value_delimiter = ',')]
        tags: Option<Vec<String>>,

        /// Replace unrestricted roles (comma separated)
        #[arg(long, value_delimiter = ',')]
        roles: Option<Vec<String>>,
    },

    /// Delete an application with its releases and history
    Delete {
        #[arg(value_name = "APP_ID")]
        id: i64,
    },

    /// Print the UUID of the newest published release
    Latest {
        #[arg(value_name = "APP_ID")]
        id: i64,
    },
}

pub async fn handle_command(
    catalog: &Catalog,
    identity: &CallerArgs,
    command: AppCommand,
    json: bool,
) -> Result<()> {
    let caller = identity.caller();
    let manager = &catalog.manager;

    match command {
        AppCommand::Create { file } => {
            let request = read_request(&file)?;
            let application = manager.create_application(&caller, request).await?;
            if json {
                return print_json(&application);
            }
            println!(
                "{}",
                format!("✓ Created application {} (id {})", application.name, application.id).green()
            );
            print_application(&application);
        }
        AppCommand::List {
            search,
            exact,
            limit,
            offset,
        } => {
            let limit = limit.unwrap_or(catalog.config.spec.listing.default_limit);
            let mut filter = Filter::new(limit, offset);
            if let Some(search) = search {
                filter = filter.with_search(search, exact);
            }
            let page = manager.get_applications(&caller, filter).await?;
            if json {
                return print_json(&page);
            }
            if page.applications.is_empty() {
                println!("{}", "No applications found".yellow());
            }
            for application in &page.applications {
                println!(
                    "{:>6}  {}  {}  {}",
                    application.id.to_string().dimmed(),
                    application.name.bold(),
                    application.app_type,
                    application.category.dimmed()
                );
            }
            println!();
            println!(
                "Showing {} of {} (offset {})",
                page.pagination.size, page.pagination.count, page.pagination.offset
            );
        }
        AppCommand::Show { name, app_type } => {
            match manager.get_application(&caller, &name, &app_type).await? {
                Some(application) if json => print_json(&application)?,
                Some(application) => print_application(&application),
                None => println!("{}", format!("Application {}/{} not found", name, app_type).yellow()),
            }
        }
        AppCommand::Exists { name, app_type } => {
            let exists = manager.application_exists(&caller, &name, &app_type).await?;
            if json {
                return print_json(&serde_json::json!({ "exists": exists }));
            }
            println!("{}", exists);
        }
        AppCommand::Edit {
            name,
            app_type,
            rename,
            category,
            free,
            currency,
            clear_currency,
            restricted,
            tags,
            roles,
        } => {
            let mut edit = ApplicationEdit::for_application(name, app_type);
            edit.new_name = rename;
            edit.category = category;
            edit.is_free = free;
            edit.payment_currency = if clear_currency {
                Some(None)
            } else {
                currency.map(Some)
            };
            edit.is_restricted = restricted;
            edit.tags = tags.map(|names| names.into_iter().map(Tag::new).collect());
            edit.unrestricted_roles =
                roles.map(|names| names.into_iter().map(UnrestrictedRole::new).collect());

            let application = manager.edit_application(&caller, edit).await?;
            if json {
                return print_json(&application);
            }
            println!("{}", format!("✓ Updated application {}", application.name).green());
            print_application(&application);
        }
        AppCommand::Delete { id } => {
            manager.delete_application(&caller, ApplicationId(id)).await?;
            if json {
                return print_json(&serde_json::json!({ "deleted": id }));
            }
            println!("{}", format!("✓ Deleted application {}", id).green());
        }
        AppCommand::Latest { id } => {
            let uuid = manager
                .get_uuid_of_latest_release(&caller, ApplicationId(id))
                .await?;
            if json {
                return print_json(&serde_json::json!({ "uuid": uuid }));
            }
            match uuid {
                Some(uuid) => println!("{}", uuid),
                None => println!("{}", "No published release".yellow()),
            }
        }
    }

    Ok(())
}

fn read_request(path: &Path) -> Result<NewApplication> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse application in {:?}", path))
}

fn print_application(application: &Application) {
    println!("{}", application.name.bold());
    println!("  ID: {}", application.id);
    println!("  Type: {}", application.app_type);
    println!("  Category: {}", application.category);
    println!("  Owner: {}", application.owner);
    if application.is_free {
        println!("  Price: free");
    } else {
        println!(
            "  Price: paid ({})",
            application.payment_currency.as_deref().unwrap_or("no currency")
        );
    }
    if !application.tags.is_empty() {
        let tags: Vec<&str> = application.tags.iter().map(Tag::name).collect();
        println!("  Tags: {}", tags.join(", "));
    }
    if application.is_restricted {
        let roles: Vec<&str> = application
            .unrestricted_roles
            .iter()
            .map(UnrestrictedRole::role)
            .collect();
        println!("  Restricted to: {}", roles.join(", "));
    }
    if !application.releases.is_empty() {
        println!("  Releases:");
        for release in &application.releases {
            println!(
                "    {} {} [{}]",
                release.version,
                release.uuid.to_string().dimmed(),
                release.effective_state()
            );
        }
    }
}
