// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Application Aggregate
//!
//! Catalog entries: the application row itself plus the tags and
//! unrestricted roles that hang off it. Releases live in
//! [`crate::domain::release`] and are attached by the application manager.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Application entity, identifiers, create/edit requests

use serde::{Deserialize, Serialize};

use crate::domain::release::{ApplicationRelease, NewRelease};

// ============================================================================
// Value Objects
// ============================================================================

/// Database-generated application identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub i64);

impl std::fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tenant isolation boundary. Every catalog row is scoped by one.
///
/// Tenant `0` is never a valid caller tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub i64);

impl TenantId {
    pub fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Free-text label attached to one application
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(pub String);

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Role whose holders may see an otherwise restricted application
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnrestrictedRole(pub String);

impl UnrestrictedRole {
    pub fn new(role: impl Into<String>) -> Self {
        Self(role.into())
    }

    pub fn role(&self) -> &str {
        &self.0
    }
}

/// Device type an application is bound to, resolved per tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceType {
    pub id: i64,
    pub name: String,
}

// ============================================================================
// Aggregate
// ============================================================================

/// A catalog application.
///
/// Identity is `(name, app_type, tenant_id)`. `unrestricted_roles` is the
/// complete allow-list for non-admin viewers; an empty list means everyone
/// in the tenant may see the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub name: String,
    #[serde(rename = "type")]
    pub app_type: String,
    pub category: String,
    pub is_free: bool,
    pub payment_currency: Option<String>,
    pub is_restricted: bool,
    pub tenant_id: TenantId,
    pub owner: String,
    pub device_type_id: i64,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub unrestricted_roles: Vec<UnrestrictedRole>,
    #[serde(default)]
    pub releases: Vec<ApplicationRelease>,
}

impl Application {
    /// True when any of `roles` appears in the allow-list, or the list is empty
    pub fn is_visible_to_roles<'a, I>(&self, roles: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        if self.unrestricted_roles.is_empty() {
            return true;
        }
        roles
            .into_iter()
            .any(|role| self.unrestricted_roles.iter().any(|allowed| allowed.role() == role))
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Input of the create flow. The owner and tenant come from the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewApplication {
    pub name: String,
    #[serde(rename = "type")]
    pub app_type: String,
    pub category: String,
    #[serde(default = "default_is_free")]
    pub is_free: bool,
    pub payment_currency: Option<String>,
    #[serde(default)]
    pub is_restricted: bool,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub unrestricted_roles: Vec<UnrestrictedRole>,
    /// Exactly one release is accepted
    #[serde(default)]
    pub releases: Vec<NewRelease>,
}

fn default_is_free() -> bool {
    true
}

/// Partial edit of a stored application.
///
/// `name` and `app_type` locate the row; every `Some` field is compared with
/// the stored value and written only when it differs. `tags` and
/// `unrestricted_roles`, when present, replace the stored sets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationEdit {
    pub name: String,
    #[serde(rename = "type")]
    pub app_type: String,
    pub new_name: Option<String>,
    pub new_type: Option<String>,
    pub category: Option<String>,
    pub is_free: Option<bool>,
    /// `Some(None)` clears the currency
    pub payment_currency: Option<Option<String>>,
    pub is_restricted: Option<bool>,
    pub tags: Option<Vec<Tag>>,
    pub unrestricted_roles: Option<Vec<UnrestrictedRole>>,
    /// Device type of `new_type`, resolved by the manager
    #[serde(skip)]
    pub device_type_id: Option<i64>,
}

impl ApplicationEdit {
    pub fn for_application(name: impl Into<String>, app_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            app_type: app_type.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn application(roles: &[&str]) -> Application {
        Application {
            id: ApplicationId(1),
            name: "Foo".to_string(),
            app_type: "android".to_string(),
            category: "tools".to_string(),
            is_free: true,
            payment_currency: None,
            is_restricted: !roles.is_empty(),
            tenant_id: TenantId(1),
            owner: "alice".to_string(),
            device_type_id: 1,
            tags: vec![],
            unrestricted_roles: roles.iter().map(|r| UnrestrictedRole::new(*r)).collect(),
            releases: vec![],
        }
    }

    #[test]
    fn test_unrestricted_application_visible_to_everyone() {
        let app = application(&[]);
        let none: Vec<String> = vec![];
        assert!(app.is_visible_to_roles(&none));
    }

    #[test]
    fn test_role_intersection_grants_visibility() {
        let app = application(&["manager", "sales"]);
        let roles = vec!["manager".to_string()];
        assert!(app.is_visible_to_roles(&roles));

        let app = application(&["sales"]);
        assert!(!app.is_visible_to_roles(&roles));
    }

    #[test]
    fn test_tenant_zero_is_invalid() {
        assert!(!TenantId(0).is_valid());
        assert!(TenantId(7).is_valid());
    }
}
