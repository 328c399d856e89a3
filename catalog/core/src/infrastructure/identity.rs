// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Static Identity Store
//!
//! Role resolution and device-type lookup backed by the `spec.identity`
//! section of the catalog configuration. Used by the CLI and for local
//! deployments without an external identity provider.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tracing::debug;

use crate::domain::application::{DeviceType, TenantId};
use crate::domain::catalog_config::{IdentityConfig, TenantConfig, UserConfig};
use crate::domain::identity::{DeviceTypeLookup, IdentityError, RoleResolver};

#[derive(Debug, Clone, Default)]
struct TenantDirectory {
    users: HashMap<String, UserConfig>,
    device_types: Vec<DeviceType>,
}

impl From<&TenantConfig> for TenantDirectory {
    fn from(tenant: &TenantConfig) -> Self {
        Self {
            users: tenant
                .users
                .iter()
                .map(|user| (user.username.clone(), user.clone()))
                .collect(),
            device_types: tenant
                .device_types
                .iter()
                .map(|device_type| DeviceType {
                    id: device_type.id,
                    name: device_type.name.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticIdentityStore {
    tenants: HashMap<i64, TenantDirectory>,
}

impl StaticIdentityStore {
    pub fn from_config(config: &IdentityConfig) -> Self {
        Self {
            tenants: config
                .tenants
                .iter()
                .map(|tenant| (tenant.id, TenantDirectory::from(tenant)))
                .collect(),
        }
    }

    fn user(&self, tenant_id: TenantId, username: &str) -> Option<&UserConfig> {
        self.tenants.get(&tenant_id.0)?.users.get(username)
    }
}

#[async_trait]
impl RoleResolver for StaticIdentityStore {
    async fn roles_of(
        &self,
        tenant_id: TenantId,
        username: &str,
    ) -> Result<HashSet<String>, IdentityError> {
        let roles: HashSet<String> = self
            .user(tenant_id, username)
            .map(|user| user.roles.iter().cloned().collect())
            .unwrap_or_default();
        debug!(%tenant_id, username, roles = roles.len(), "Resolved roles");
        Ok(roles)
    }

    async fn is_authorized(
        &self,
        tenant_id: TenantId,
        username: &str,
        permission: &str,
    ) -> Result<bool, IdentityError> {
        Ok(self
            .user(tenant_id, username)
            .is_some_and(|user| user.permissions.iter().any(|p| p == permission)))
    }
}

#[async_trait]
impl DeviceTypeLookup for StaticIdentityStore {
    async fn device_type_for(
        &self,
        type_name: &str,
        tenant_id: TenantId,
    ) -> Result<Option<DeviceType>, IdentityError> {
        Ok(self.tenants.get(&tenant_id.0).and_then(|tenant| {
            tenant
                .device_types
                .iter()
                .find(|device_type| device_type.name.eq_ignore_ascii_case(type_name.trim()))
                .cloned()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog_config::DeviceTypeConfig;
    use crate::domain::identity::DEFAULT_ADMIN_PERMISSION;

    fn store() -> StaticIdentityStore {
        StaticIdentityStore::from_config(&IdentityConfig {
            admin_permission: DEFAULT_ADMIN_PERMISSION.to_string(),
            tenants: vec![TenantConfig {
                id: 1,
                domain: None,
                users: vec![
                    UserConfig {
                        username: "admin".to_string(),
                        roles: vec![],
                        permissions: vec![DEFAULT_ADMIN_PERMISSION.to_string()],
                    },
                    UserConfig {
                        username: "alice".to_string(),
                        roles: vec!["manager".to_string()],
                        permissions: vec![],
                    },
                ],
                device_types: vec![DeviceTypeConfig {
                    id: 4,
                    name: "android".to_string(),
                }],
            }],
        })
    }

    #[tokio::test]
    async fn test_roles_and_permissions() {
        let store = store();
        let roles = store.roles_of(TenantId(1), "alice").await.unwrap();
        assert!(roles.contains("manager"));
        assert!(store.roles_of(TenantId(2), "alice").await.unwrap().is_empty());

        assert!(store
            .is_authorized(TenantId(1), "admin", DEFAULT_ADMIN_PERMISSION)
            .await
            .unwrap());
        assert!(!store
            .is_authorized(TenantId(1), "alice", DEFAULT_ADMIN_PERMISSION)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_device_type_lookup() {
        let store = store();
        let device_type = store.device_type_for("Android", TenantId(1)).await.unwrap();
        assert_eq!(device_type.map(|d| d.id), Some(4));
        assert!(store.device_type_for("ios", TenantId(1)).await.unwrap().is_none());
    }
}
