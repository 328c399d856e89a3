// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for the catalog. Implementations live in
//! `crate::infrastructure::repositories`.
//!
//! | Trait | Rows | Implementation |
//! |-------|------|----------------|
//! | `ApplicationRepository` | `applications`, `application_tags` | `SqliteApplicationRepository` |
//! | `ApplicationReleaseRepository` | `application_releases` | `SqliteApplicationReleaseRepository` |
//! | `LifecycleStateRepository` | `lifecycle_states` | `SqliteLifecycleStateRepository` |
//! | `VisibilityRepository` | `unrestricted_roles` | `SqliteVisibilityRepository` |
//!
//! Repositories hold no connection of their own. Every call borrows the
//! connection of the caller's [`ConnectionScope`], so several calls can share
//! one transaction.
//!
//! [`ConnectionScope`]: crate::infrastructure::db::ConnectionScope

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::application::{
    Application, ApplicationEdit, ApplicationId, Tag, TenantId, UnrestrictedRole,
};
use crate::domain::filter::{ApplicationList, Filter};
use crate::domain::release::{
    ApplicationRelease, LifecycleState, LifecycleStateRecord, NewRelease, ReleaseId,
};

/// Connection type every repository call runs on
pub type DbConnection = sqlx::SqliteConnection;

/// Application rows plus their tags
#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    /// Insert the application row and return its generated id
    async fn create_application(
        &self,
        conn: &mut DbConnection,
        application: &Application,
    ) -> Result<ApplicationId, RepositoryError>;

    async fn application_exists(
        &self,
        conn: &mut DbConnection,
        name: &str,
        app_type: &str,
        tenant_id: TenantId,
    ) -> Result<bool, RepositoryError>;

    /// One page of the tenant's applications with tags and unrestricted roles
    async fn list_applications(
        &self,
        conn: &mut DbConnection,
        filter: &Filter,
        tenant_id: TenantId,
    ) -> Result<ApplicationList, RepositoryError>;

    /// Number of applications matching the filter's search predicate
    async fn get_application_count(
        &self,
        conn: &mut DbConnection,
        filter: &Filter,
        tenant_id: TenantId,
    ) -> Result<i64, RepositoryError>;

    async fn get_application(
        &self,
        conn: &mut DbConnection,
        name: &str,
        app_type: &str,
        tenant_id: TenantId,
    ) -> Result<Option<Application>, RepositoryError>;

    async fn get_application_by_id(
        &self,
        conn: &mut DbConnection,
        id: ApplicationId,
        tenant_id: TenantId,
    ) -> Result<Option<Application>, RepositoryError>;

    /// Application owning the release with `release_uuid`
    async fn get_application_by_release(
        &self,
        conn: &mut DbConnection,
        release_uuid: Uuid,
        tenant_id: TenantId,
    ) -> Result<Option<Application>, RepositoryError>;

    async fn get_application_id(
        &self,
        conn: &mut DbConnection,
        name: &str,
        app_type: &str,
        tenant_id: TenantId,
    ) -> Result<Option<ApplicationId>, RepositoryError>;

    async fn application_exists_by_id(
        &self,
        conn: &mut DbConnection,
        id: ApplicationId,
        tenant_id: TenantId,
    ) -> Result<bool, RepositoryError>;

    /// Apply only the fields of `edit` that differ from the stored row and
    /// return the stored application afterwards
    async fn edit_application(
        &self,
        conn: &mut DbConnection,
        edit: &ApplicationEdit,
        tenant_id: TenantId,
    ) -> Result<Application, RepositoryError>;

    async fn delete_application(
        &self,
        conn: &mut DbConnection,
        id: ApplicationId,
        tenant_id: TenantId,
    ) -> Result<(), RepositoryError>;

    /// Insert all tags in one statement
    async fn add_tags(
        &self,
        conn: &mut DbConnection,
        tags: &[Tag],
        application_id: ApplicationId,
        tenant_id: TenantId,
    ) -> Result<(), RepositoryError>;

    async fn delete_tags(
        &self,
        conn: &mut DbConnection,
        application_id: ApplicationId,
        tenant_id: TenantId,
    ) -> Result<(), RepositoryError>;

    /// UUID of the newest release whose current lifecycle state is PUBLISHED
    async fn get_uuid_of_latest_release(
        &self,
        conn: &mut DbConnection,
        application_id: ApplicationId,
        tenant_id: TenantId,
    ) -> Result<Option<Uuid>, RepositoryError>;
}

/// Release rows; each returned release carries its current lifecycle state
#[async_trait]
pub trait ApplicationReleaseRepository: Send + Sync {
    async fn create_release(
        &self,
        conn: &mut DbConnection,
        release: &NewRelease,
        uuid: Uuid,
        application_id: ApplicationId,
        created_by: &str,
        created_at: DateTime<Utc>,
    ) -> Result<ApplicationRelease, RepositoryError>;

    async fn get_releases(
        &self,
        conn: &mut DbConnection,
        name: &str,
        app_type: &str,
        tenant_id: TenantId,
    ) -> Result<Vec<ApplicationRelease>, RepositoryError>;

    async fn get_releases_by_application(
        &self,
        conn: &mut DbConnection,
        application_id: ApplicationId,
    ) -> Result<Vec<ApplicationRelease>, RepositoryError>;

    async fn get_release(
        &self,
        conn: &mut DbConnection,
        uuid: Uuid,
        tenant_id: TenantId,
    ) -> Result<Option<ApplicationRelease>, RepositoryError>;

    async fn mark_published(
        &self,
        conn: &mut DbConnection,
        release_id: ReleaseId,
        published_by: &str,
        published_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    async fn delete_releases(
        &self,
        conn: &mut DbConnection,
        application_id: ApplicationId,
    ) -> Result<(), RepositoryError>;
}

/// Append-only lifecycle history
#[async_trait]
pub trait LifecycleStateRepository: Send + Sync {
    async fn add_lifecycle_state(
        &self,
        conn: &mut DbConnection,
        release_id: ReleaseId,
        state: LifecycleState,
        changed_by: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<LifecycleStateRecord, RepositoryError>;

    async fn get_latest_lifecycle_state(
        &self,
        conn: &mut DbConnection,
        release_id: ReleaseId,
    ) -> Result<Option<LifecycleStateRecord>, RepositoryError>;

    /// Oldest first
    async fn get_lifecycle_history(
        &self,
        conn: &mut DbConnection,
        release_id: ReleaseId,
    ) -> Result<Vec<LifecycleStateRecord>, RepositoryError>;

    /// Drop the history of every release of an application
    async fn delete_lifecycle_states(
        &self,
        conn: &mut DbConnection,
        application_id: ApplicationId,
    ) -> Result<(), RepositoryError>;
}

/// Unrestricted-role allow-lists
#[async_trait]
pub trait VisibilityRepository: Send + Sync {
    async fn add_unrestricted_roles(
        &self,
        conn: &mut DbConnection,
        roles: &[UnrestrictedRole],
        application_id: ApplicationId,
        tenant_id: TenantId,
    ) -> Result<(), RepositoryError>;

    async fn get_unrestricted_roles(
        &self,
        conn: &mut DbConnection,
        application_id: ApplicationId,
        tenant_id: TenantId,
    ) -> Result<Vec<UnrestrictedRole>, RepositoryError>;

    async fn delete_unrestricted_roles(
        &self,
        conn: &mut DbConnection,
        application_id: ApplicationId,
        tenant_id: TenantId,
    ) -> Result<(), RepositoryError>;
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint rejected the write
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                RepositoryError::Conflict(db_err.message().to_string())
            }
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: RepositoryError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[test]
    fn test_other_sqlx_errors_map_to_database() {
        let err: RepositoryError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, RepositoryError::Database(_)));
    }
}
