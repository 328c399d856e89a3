// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! SQLite implementations of the repository traits defined in
//! `crate::domain::repository`.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve catalog rows
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! Joined reads decode into flat row structs and are reduced afterwards by
//! [`fold_application_rows`], keyed by application id.

pub mod sqlite_application;
pub mod sqlite_lifecycle;
pub mod sqlite_release;
pub mod sqlite_visibility;

pub use sqlite_application::SqliteApplicationRepository;
pub use sqlite_lifecycle::SqliteLifecycleStateRepository;
pub use sqlite_release::SqliteApplicationReleaseRepository;
pub use sqlite_visibility::SqliteVisibilityRepository;

use std::collections::{HashMap, HashSet};

use sqlx::FromRow;

use crate::domain::application::{
    Application, ApplicationId, Tag, TenantId, UnrestrictedRole,
};

/// Select list of the application join; `a`, `t` and `r` alias the
/// application, tag and unrestricted-role tables
pub(crate) const APPLICATION_COLUMNS: &str = "a.id, a.name, a.type AS app_type, a.category, \
     a.is_free, a.payment_currency, a.is_restricted, a.tenant_id, a.owner, a.device_type_id, \
     t.id AS tag_id, t.tag AS tag, r.id AS role_id, r.role AS role";

pub(crate) const CHILD_JOINS: &str = " LEFT JOIN application_tags t ON t.application_id = a.id \
     LEFT JOIN unrestricted_roles r ON r.application_id = a.id";

pub(crate) const JOIN_ORDER: &str = " ORDER BY a.id DESC, t.id, r.id";

/// One row of the application/tag/role join
#[derive(Debug, Clone, FromRow)]
pub(crate) struct ApplicationJoinRow {
    pub id: i64,
    pub name: String,
    pub app_type: String,
    pub category: String,
    pub is_free: bool,
    pub payment_currency: Option<String>,
    pub is_restricted: bool,
    pub tenant_id: i64,
    pub owner: String,
    pub device_type_id: i64,
    pub tag_id: Option<i64>,
    pub tag: Option<String>,
    pub role_id: Option<i64>,
    pub role: Option<String>,
}

impl ApplicationJoinRow {
    fn to_application(&self) -> Application {
        Application {
            id: ApplicationId(self.id),
            name: self.name.clone(),
            app_type: self.app_type.clone(),
            category: self.category.clone(),
            is_free: self.is_free,
            payment_currency: self.payment_currency.clone(),
            is_restricted: self.is_restricted,
            tenant_id: TenantId(self.tenant_id),
            owner: self.owner.clone(),
            device_type_id: self.device_type_id,
            tags: Vec::new(),
            unrestricted_roles: Vec::new(),
            releases: Vec::new(),
        }
    }
}

/// Collapse joined rows into one application per id, in first-seen order.
///
/// The tag and role joins multiply each other, so every tag and role is
/// kept once by its row id.
pub(crate) fn fold_application_rows(rows: Vec<ApplicationJoinRow>) -> Vec<Application> {
    let mut applications: Vec<Application> = Vec::new();
    let mut positions: HashMap<i64, usize> = HashMap::new();
    let mut seen_tags: HashSet<i64> = HashSet::new();
    let mut seen_roles: HashSet<i64> = HashSet::new();

    for row in rows {
        let position = match positions.get(&row.id) {
            Some(position) => *position,
            None => {
                applications.push(row.to_application());
                positions.insert(row.id, applications.len() - 1);
                applications.len() - 1
            }
        };
        let application = &mut applications[position];

        if let (Some(tag_id), Some(tag)) = (row.tag_id, row.tag) {
            if seen_tags.insert(tag_id) {
                application.tags.push(Tag(tag));
            }
        }
        if let (Some(role_id), Some(role)) = (row.role_id, row.role) {
            if seen_roles.insert(role_id) {
                application.unrestricted_roles.push(UnrestrictedRole(role));
            }
        }
    }

    applications
}
