// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Identity Collaborators
//!
//! The catalog never owns users or roles. It consumes an identity store
//! through [`RoleResolver`] and the tenant's device registry through
//! [`DeviceTypeLookup`]; both are injected into the application manager at
//! construction time.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::application::{DeviceType, TenantId};

/// Permission whose holders administer a tenant's catalog
pub const DEFAULT_ADMIN_PERMISSION: &str = "/permission/admin/manage";

/// Tenant and user an operation is performed on behalf of
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Caller {
    pub tenant_id: TenantId,
    pub username: String,
}

impl Caller {
    pub fn new(tenant_id: TenantId, username: impl Into<String>) -> Self {
        Self {
            tenant_id,
            username: username.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Identity store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait RoleResolver: Send + Sync {
    /// Role names the user currently holds in the tenant
    async fn roles_of(
        &self,
        tenant_id: TenantId,
        username: &str,
    ) -> Result<HashSet<String>, IdentityError>;

    /// Authorization decision for `permission`; not a role-name comparison
    async fn is_authorized(
        &self,
        tenant_id: TenantId,
        username: &str,
        permission: &str,
    ) -> Result<bool, IdentityError>;
}

#[async_trait]
pub trait DeviceTypeLookup: Send + Sync {
    async fn device_type_for(
        &self,
        type_name: &str,
        tenant_id: TenantId,
    ) -> Result<Option<DeviceType>, IdentityError>;
}
