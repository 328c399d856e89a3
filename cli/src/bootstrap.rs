// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Catalog bootstrap
//!
//! Builds a ready-to-use [`StandardApplicationManager`] from the catalog
//! configuration manifest: database pool, schema migrations, identity store
//! and repositories.
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** Composition root shared by every CLI command

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use appcatalog_core::application::{CatalogRepositories, StandardApplicationManager};
use appcatalog_core::domain::application::TenantId;
use appcatalog_core::domain::catalog_config::CatalogConfigManifest;
use appcatalog_core::domain::identity::Caller;
use appcatalog_core::infrastructure::db::Database;
use appcatalog_core::infrastructure::identity::StaticIdentityStore;

pub struct Catalog {
    pub config: CatalogConfigManifest,
    pub database: Database,
    pub manager: StandardApplicationManager,
}

impl Catalog {
    /// Load, validate and connect. Migrations run when the config asks for it.
    pub async fn open(config_path: Option<PathBuf>) -> Result<Self> {
        let config = CatalogConfigManifest::load_or_default(config_path)
            .context("Failed to load configuration")?;
        Self::from_config(config).await
    }

    pub async fn from_config(config: CatalogConfigManifest) -> Result<Self> {
        config
            .validate()
            .context("Configuration validation failed")?;

        let database = Database::connect(&config.spec.database).await?;
        if config.spec.database.run_migrations {
            database.migrate().await?;
        }

        let identity = Arc::new(StaticIdentityStore::from_config(&config.spec.identity));
        let manager = StandardApplicationManager::new(
            database.clone(),
            CatalogRepositories::sqlite(&config.spec.listing),
            identity.clone(),
            identity,
            config.spec.identity.admin_permission.clone(),
        );
        info!(name = %config.metadata.name, "Catalog ready");

        Ok(Self {
            config,
            database,
            manager,
        })
    }

    pub async fn close(self) {
        self.database.close().await;
    }
}

/// Identity every command acts as
#[derive(Debug, Clone)]
pub struct CallerArgs {
    pub tenant_id: i64,
    pub username: String,
}

impl CallerArgs {
    pub fn caller(&self) -> Caller {
        Caller::new(TenantId(self.tenant_id), self.username.clone())
    }
}
