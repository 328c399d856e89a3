// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Catalog Configuration Types
//
// Defines the configuration schema for an application catalog deployment:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Database connection and migration settings
// - Listing page-size limits
// - Static identity data (tenants, users, roles, device types)

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::domain::filter::{DEFAULT_LIMIT, DEFAULT_MAX_LIMIT};
use crate::domain::identity::DEFAULT_ADMIN_PERMISSION;

pub const API_VERSION: &str = "appcatalog/v1";
pub const KIND: &str = "CatalogConfig";

/// Top-level Kubernetes-style catalog configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfigManifest {
    /// API version (must be "appcatalog/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "CatalogConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: CatalogConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// Content under `spec:`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfigSpec {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub listing: ListingConfig,

    #[serde(default)]
    pub identity: IdentityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL, e.g. `sqlite://appcatalog.db`
    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a writer waits on a locked database before failing
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Apply pending migrations when the catalog starts
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout_ms(),
            run_migrations: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    #[serde(default = "default_max_limit")]
    pub max_limit: u32,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: DEFAULT_MAX_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Permission checked by `is_admin_user`
    #[serde(default = "default_admin_permission")]
    pub admin_permission: String,

    #[serde(default)]
    pub tenants: Vec<TenantConfig>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            admin_permission: default_admin_permission(),
            tenants: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    pub id: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    #[serde(default)]
    pub users: Vec<UserConfig>,

    #[serde(default)]
    pub device_types: Vec<DeviceTypeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    pub username: String,

    #[serde(default)]
    pub roles: Vec<String>,

    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceTypeConfig {
    pub id: i64,
    pub name: String,
}

fn default_true() -> bool {
    true
}

fn default_database_url() -> String {
    "sqlite://appcatalog.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

fn default_max_limit() -> u32 {
    DEFAULT_MAX_LIMIT
}

fn default_admin_permission() -> String {
    DEFAULT_ADMIN_PERMISSION.to_string()
}

impl Default for CatalogConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "appcatalog".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: CatalogConfigSpec::default(),
        }
    }
}

impl CatalogConfigManifest {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. APPCATALOG_CONFIG_PATH environment variable
    /// 2. ./appcatalog-config.yaml (working directory)
    /// 3. ~/.appcatalog/config.yaml (user home)
    /// 4. /etc/appcatalog/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("APPCATALOG_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./appcatalog-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".appcatalog").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/appcatalog/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("APPCATALOG_DATABASE_URL") {
            tracing::info!("Environment override: APPCATALOG_DATABASE_URL");
            self.spec.database.url = url;
        }

        if let Ok(val) = std::env::var("APPCATALOG_MAX_LIMIT") {
            match val.parse::<u32>() {
                Ok(max_limit) => {
                    tracing::info!("Environment override: APPCATALOG_MAX_LIMIT={}", max_limit);
                    self.spec.listing.max_limit = max_limit;
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for APPCATALOG_MAX_LIMIT: '{}'. Expected a positive integer. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let database = &self.spec.database;
        if database.url.trim().is_empty() {
            anyhow::bail!("spec.database.url cannot be empty");
        }
        if database.max_connections == 0 {
            anyhow::bail!("spec.database.max_connections must be greater than zero");
        }

        let listing = &self.spec.listing;
        if listing.max_limit == 0 {
            anyhow::bail!("spec.listing.max_limit must be greater than zero");
        }
        if listing.default_limit == 0 || listing.default_limit > listing.max_limit {
            anyhow::bail!(
                "spec.listing.default_limit must be between 1 and max_limit ({})",
                listing.max_limit
            );
        }

        if self.spec.identity.admin_permission.trim().is_empty() {
            anyhow::bail!("spec.identity.admin_permission cannot be empty");
        }

        let mut tenant_ids = HashSet::new();
        for tenant in &self.spec.identity.tenants {
            if tenant.id <= 0 {
                anyhow::bail!("Tenant id must be positive, got {}", tenant.id);
            }
            if !tenant_ids.insert(tenant.id) {
                anyhow::bail!("Duplicate tenant id: {}", tenant.id);
            }
            for user in &tenant.users {
                if user.username.trim().is_empty() {
                    anyhow::bail!("Username cannot be empty in tenant {}", tenant.id);
                }
            }
            for device_type in &tenant.device_types {
                if device_type.name.trim().is_empty() {
                    anyhow::bail!("Device type name cannot be empty in tenant {}", tenant.id);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest() {
        let manifest = CatalogConfigManifest::default();
        assert_eq!(manifest.api_version, API_VERSION);
        assert_eq!(manifest.kind, KIND);
        assert_eq!(manifest.spec.listing.max_limit, DEFAULT_MAX_LIMIT);
        assert!(manifest.spec.database.run_migrations);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_parse_manifest() {
        let yaml = r#"
apiVersion: appcatalog/v1
kind: CatalogConfig
metadata:
  name: store
spec:
  database:
    url: "sqlite://store.db"
  listing:
    default_limit: 10
    max_limit: 50
  identity:
    tenants:
      - id: 1
        domain: carbon.super
        users:
          - username: admin
            permissions: ["/permission/admin/manage"]
          - username: alice
            roles: ["manager"]
        device_types:
          - id: 1
            name: android
"#;
        let manifest = CatalogConfigManifest::from_yaml_str(yaml).unwrap();
        assert_eq!(manifest.metadata.name, "store");
        assert_eq!(manifest.spec.database.url, "sqlite://store.db");
        assert_eq!(manifest.spec.database.max_connections, 5);
        assert_eq!(manifest.spec.listing.max_limit, 50);
        assert_eq!(manifest.spec.identity.admin_permission, DEFAULT_ADMIN_PERMISSION);
        assert_eq!(manifest.spec.identity.tenants[0].users.len(), 2);
        assert_eq!(manifest.spec.identity.tenants[0].device_types[0].name, "android");
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut manifest = CatalogConfigManifest::default();

        manifest.api_version = "wrong/v1".to_string();
        assert!(manifest.validate().is_err());
        manifest.api_version = API_VERSION.to_string();

        manifest.kind = "NodeConfig".to_string();
        assert!(manifest.validate().is_err());
        manifest.kind = KIND.to_string();

        manifest.spec.database.max_connections = 0;
        assert!(manifest.validate().is_err());
        manifest.spec.database.max_connections = 5;

        manifest.spec.listing.default_limit = manifest.spec.listing.max_limit + 1;
        assert!(manifest.validate().is_err());
        manifest.spec.listing.default_limit = DEFAULT_LIMIT;

        let tenant = TenantConfig {
            id: 1,
            domain: None,
            users: vec![],
            device_types: vec![],
        };
        manifest.spec.identity.tenants = vec![tenant.clone(), tenant];
        assert!(manifest.validate().is_err());
    }
}
