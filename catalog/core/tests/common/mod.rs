// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use appcatalog_core::application::{CatalogRepositories, StandardApplicationManager};
use appcatalog_core::domain::application::{DeviceType, NewApplication, Tag, TenantId, UnrestrictedRole};
use appcatalog_core::domain::catalog_config::{DatabaseConfig, ListingConfig};
use appcatalog_core::domain::identity::{
    Caller, DeviceTypeLookup, IdentityError, RoleResolver, DEFAULT_ADMIN_PERMISSION,
};
use appcatalog_core::domain::release::NewRelease;
use appcatalog_core::infrastructure::db::Database;
use async_trait::async_trait;
use tempfile::TempDir;

pub const TENANT: TenantId = TenantId(1);
pub const OTHER_TENANT: TenantId = TenantId(2);

/// Role store with fixed roles and an outage switch
#[derive(Default)]
pub struct MockIdentityStore {
    roles: HashMap<String, HashSet<String>>,
    admins: HashSet<String>,
    unavailable: AtomicBool,
}

impl MockIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roles(mut self, username: &str, roles: &[&str]) -> Self {
        self.roles.insert(
            username.to_string(),
            roles.iter().map(|role| role.to_string()).collect(),
        );
        self
    }

    pub fn with_admin(mut self, username: &str) -> Self {
        self.admins.insert(username.to_string());
        self
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), IdentityError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(IdentityError::Unavailable("identity store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RoleResolver for MockIdentityStore {
    async fn roles_of(
        &self,
        _tenant_id: TenantId,
        username: &str,
    ) -> Result<HashSet<String>, IdentityError> {
        self.check()?;
        Ok(self.roles.get(username).cloned().unwrap_or_default())
    }

    async fn is_authorized(
        &self,
        _tenant_id: TenantId,
        username: &str,
        permission: &str,
    ) -> Result<bool, IdentityError> {
        self.check()?;
        Ok(permission == DEFAULT_ADMIN_PERMISSION && self.admins.contains(username))
    }
}

/// Knows `android` and `ios` in every tenant
pub struct MockDeviceTypes;

#[async_trait]
impl DeviceTypeLookup for MockDeviceTypes {
    async fn device_type_for(
        &self,
        type_name: &str,
        _tenant_id: TenantId,
    ) -> Result<Option<DeviceType>, IdentityError> {
        Ok(match type_name {
            "android" => Some(DeviceType { id: 1, name: "android".to_string() }),
            "ios" => Some(DeviceType { id: 2, name: "ios".to_string() }),
            _ => None,
        })
    }
}

/// Migrated SQLite database in a temporary directory
pub async fn test_database() -> (TempDir, Database) {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("catalog.db");
    let config = DatabaseConfig {
        url: format!("sqlite://{}", path.display()),
        max_connections: 5,
        busy_timeout_ms: 5_000,
        run_migrations: true,
    };
    let database = Database::connect(&config).await.expect("connect");
    database.migrate().await.expect("migrate");
    (dir, database)
}

pub struct TestCatalog {
    _dir: TempDir,
    pub database: Database,
    pub identity: Arc<MockIdentityStore>,
    pub manager: StandardApplicationManager,
}

pub async fn test_catalog(identity: MockIdentityStore) -> TestCatalog {
    let (dir, database) = test_database().await;
    let identity = Arc::new(identity);
    let manager = StandardApplicationManager::new(
        database.clone(),
        CatalogRepositories::sqlite(&ListingConfig::default()),
        identity.clone(),
        Arc::new(MockDeviceTypes),
        DEFAULT_ADMIN_PERMISSION,
    );
    TestCatalog {
        _dir: dir,
        database,
        identity,
        manager,
    }
}

pub fn caller(username: &str) -> Caller {
    Caller::new(TENANT, username)
}

pub fn new_application(name: &str) -> NewApplication {
    NewApplication {
        name: name.to_string(),
        app_type: "android".to_string(),
        category: "tools".to_string(),
        is_free: true,
        payment_currency: None,
        is_restricted: false,
        tags: vec![Tag::new("utility")],
        unrestricted_roles: vec![],
        releases: vec![NewRelease::with_version("1.0.0")],
    }
}

pub fn restricted_application(name: &str, roles: &[&str]) -> NewApplication {
    NewApplication {
        is_restricted: true,
        unrestricted_roles: roles.iter().map(|role| UnrestrictedRole::new(*role)).collect(),
        ..new_application(name)
    }
}
