// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! SQLite Applications
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements `ApplicationRepository`
//!
//! Reads join the tag and unrestricted-role tables and fold the fan-out with
//! [`fold_application_rows`]. Listing pages are cut in a subquery before the
//! join so `LIMIT`/`OFFSET` count applications, not joined rows.

use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info};
use uuid::Uuid;

use super::sqlite_release::fetch_release_by_uuid;
use super::{fold_application_rows, ApplicationJoinRow, APPLICATION_COLUMNS, CHILD_JOINS, JOIN_ORDER};
use crate::domain::application::{Application, ApplicationEdit, ApplicationId, Tag, TenantId};
use crate::domain::filter::{ApplicationList, Filter, Pagination, DEFAULT_MAX_LIMIT};
use crate::domain::repository::{ApplicationRepository, DbConnection, RepositoryError};
use crate::infrastructure::query::push_name_predicate;

pub struct SqliteApplicationRepository {
    max_limit: u32,
}

impl SqliteApplicationRepository {
    pub fn new(max_limit: u32) -> Self {
        Self { max_limit }
    }

    fn check_filter(&self, filter: &Filter) -> Result<(), RepositoryError> {
        filter
            .validate(self.max_limit)
            .map_err(RepositoryError::InvalidFilter)
    }
}

impl Default for SqliteApplicationRepository {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LIMIT)
    }
}

/// Joined read of the applications matching `predicate`, folded
async fn fetch_applications(
    conn: &mut DbConnection,
    mut query: QueryBuilder<'_, Sqlite>,
) -> Result<Vec<Application>, RepositoryError> {
    query.push(JOIN_ORDER);
    let rows: Vec<ApplicationJoinRow> = query.build_query_as().fetch_all(&mut *conn).await?;
    Ok(fold_application_rows(rows))
}

fn joined_select<'args>() -> QueryBuilder<'args, Sqlite> {
    let mut query = QueryBuilder::new("SELECT ");
    query
        .push(APPLICATION_COLUMNS)
        .push(" FROM applications a")
        .push(CHILD_JOINS)
        .push(" WHERE ");
    query
}

// ============================================================================
// Edit diffing
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ColumnValue {
    Text(String),
    NullableText(Option<String>),
    Flag(bool),
    Integer(i64),
}

/// One `column = value` pair of a partial update
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ColumnChange {
    pub column: &'static str,
    pub value: ColumnValue,
}

impl ColumnChange {
    fn new(column: &'static str, value: ColumnValue) -> Self {
        Self { column, value }
    }
}

/// Columns whose requested value differs from the stored one
pub(crate) fn diff_edit(existing: &Application, edit: &ApplicationEdit) -> Vec<ColumnChange> {
    let mut changes = Vec::new();

    if let Some(name) = edit.new_name.as_deref().map(str::trim) {
        if !name.is_empty() && name != existing.name {
            changes.push(ColumnChange::new("name", ColumnValue::Text(name.to_string())));
        }
    }
    if let Some(app_type) = edit.new_type.as_deref().map(str::trim) {
        if !app_type.is_empty() && app_type != existing.app_type {
            changes.push(ColumnChange::new("type", ColumnValue::Text(app_type.to_string())));
        }
    }
    if let Some(device_type_id) = edit.device_type_id {
        if device_type_id != existing.device_type_id {
            changes.push(ColumnChange::new(
                "device_type_id",
                ColumnValue::Integer(device_type_id),
            ));
        }
    }
    if let Some(category) = edit.category.as_deref().map(str::trim) {
        if !category.is_empty() && category != existing.category {
            changes.push(ColumnChange::new("category", ColumnValue::Text(category.to_string())));
        }
    }
    if let Some(is_free) = edit.is_free {
        if is_free != existing.is_free {
            changes.push(ColumnChange::new("is_free", ColumnValue::Flag(is_free)));
        }
    }
    if let Some(currency) = &edit.payment_currency {
        if *currency != existing.payment_currency {
            changes.push(ColumnChange::new(
                "payment_currency",
                ColumnValue::NullableText(currency.clone()),
            ));
        }
    }
    if let Some(is_restricted) = edit.is_restricted {
        if is_restricted != existing.is_restricted {
            changes.push(ColumnChange::new("is_restricted", ColumnValue::Flag(is_restricted)));
        }
    }

    changes
}

fn build_update<'args>(
    changes: Vec<ColumnChange>,
    id: ApplicationId,
    tenant_id: TenantId,
) -> QueryBuilder<'args, Sqlite> {
    let mut query = QueryBuilder::new("UPDATE applications SET ");
    {
        let mut columns = query.separated(", ");
        for change in changes {
            columns.push(change.column);
            columns.push_unseparated(" = ");
            match change.value {
                ColumnValue::Text(value) => columns.push_bind_unseparated(value),
                ColumnValue::NullableText(value) => columns.push_bind_unseparated(value),
                ColumnValue::Flag(value) => columns.push_bind_unseparated(value),
                ColumnValue::Integer(value) => columns.push_bind_unseparated(value),
            };
        }
    }
    query
        .push(" WHERE id = ")
        .push_bind(id.0)
        .push(" AND tenant_id = ")
        .push_bind(tenant_id.0);
    query
}

#[async_trait]
impl ApplicationRepository for SqliteApplicationRepository {
    #[tracing::instrument(skip(self, conn, application), fields(name = %application.name, tenant_id = %application.tenant_id))]
    async fn create_application(
        &self,
        conn: &mut DbConnection,
        application: &Application,
    ) -> Result<ApplicationId, RepositoryError> {
        let result = sqlx::query(
            r#"
            INSERT INTO applications (
                name, type, category, is_free, payment_currency,
                is_restricted, tenant_id, owner, device_type_id
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&application.name)
        .bind(&application.app_type)
        .bind(&application.category)
        .bind(application.is_free)
        .bind(&application.payment_currency)
        .bind(application.is_restricted)
        .bind(application.tenant_id.0)
        .bind(&application.owner)
        .bind(application.device_type_id)
        .execute(&mut *conn)
        .await?;

        let id = ApplicationId(result.last_insert_rowid());
        info!(application_id = %id, "Inserted application row");
        Ok(id)
    }

    #[tracing::instrument(skip(self, conn))]
    async fn application_exists(
        &self,
        conn: &mut DbConnection,
        name: &str,
        app_type: &str,
        tenant_id: TenantId,
    ) -> Result<bool, RepositoryError> {
        Ok(self
            .get_application_id(conn, name, app_type, tenant_id)
            .await?
            .is_some())
    }

    #[tracing::instrument(skip(self, conn))]
    async fn list_applications(
        &self,
        conn: &mut DbConnection,
        filter: &Filter,
        tenant_id: TenantId,
    ) -> Result<ApplicationList, RepositoryError> {
        self.check_filter(filter)?;
        debug!("Listing applications");

        let mut query = QueryBuilder::new("SELECT ");
        query
            .push(APPLICATION_COLUMNS)
            .push(" FROM (SELECT * FROM applications WHERE tenant_id = ")
            .push_bind(tenant_id.0);
        push_name_predicate(&mut query, filter, "name");
        query
            .push(" ORDER BY id DESC LIMIT ")
            .push_bind(i64::from(filter.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(filter.offset))
            .push(") a")
            .push(CHILD_JOINS);
        let applications = fetch_applications(conn, query).await?;

        let count = self.get_application_count(conn, filter, tenant_id).await?;
        let size = applications.len();

        Ok(ApplicationList {
            applications,
            pagination: Pagination {
                limit: filter.limit,
                offset: filter.offset,
                count,
                size,
            },
        })
    }

    #[tracing::instrument(skip(self, conn))]
    async fn get_application_count(
        &self,
        conn: &mut DbConnection,
        filter: &Filter,
        tenant_id: TenantId,
    ) -> Result<i64, RepositoryError> {
        self.check_filter(filter)?;

        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM applications WHERE tenant_id = ");
        query.push_bind(tenant_id.0);
        push_name_predicate(&mut query, filter, "name");

        let count: i64 = query.build_query_scalar().fetch_one(&mut *conn).await?;
        Ok(count)
    }

    #[tracing::instrument(skip(self, conn))]
    async fn get_application(
        &self,
        conn: &mut DbConnection,
        name: &str,
        app_type: &str,
        tenant_id: TenantId,
    ) -> Result<Option<Application>, RepositoryError> {
        let mut query = joined_select();
        query
            .push("a.name = ")
            .push_bind(name.to_string())
            .push(" AND a.type = ")
            .push_bind(app_type.to_string())
            .push(" AND a.tenant_id = ")
            .push_bind(tenant_id.0);
        Ok(fetch_applications(conn, query).await?.into_iter().next())
    }

    #[tracing::instrument(skip(self, conn))]
    async fn get_application_by_id(
        &self,
        conn: &mut DbConnection,
        id: ApplicationId,
        tenant_id: TenantId,
    ) -> Result<Option<Application>, RepositoryError> {
        let mut query = joined_select();
        query
            .push("a.id = ")
            .push_bind(id.0)
            .push(" AND a.tenant_id = ")
            .push_bind(tenant_id.0);
        Ok(fetch_applications(conn, query).await?.into_iter().next())
    }

    #[tracing::instrument(skip(self, conn))]
    async fn get_application_by_release(
        &self,
        conn: &mut DbConnection,
        release_uuid: Uuid,
        tenant_id: TenantId,
    ) -> Result<Option<Application>, RepositoryError> {
        let Some(release) = fetch_release_by_uuid(conn, release_uuid, tenant_id).await? else {
            return Ok(None);
        };
        let application = self
            .get_application_by_id(conn, release.application_id, tenant_id)
            .await?;
        Ok(application.map(|mut application| {
            application.releases = vec![release];
            application
        }))
    }

    #[tracing::instrument(skip(self, conn))]
    async fn get_application_id(
        &self,
        conn: &mut DbConnection,
        name: &str,
        app_type: &str,
        tenant_id: TenantId,
    ) -> Result<Option<ApplicationId>, RepositoryError> {
        let id: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM applications WHERE name = ? AND type = ? AND tenant_id = ?",
        )
        .bind(name)
        .bind(app_type)
        .bind(tenant_id.0)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(id.map(ApplicationId))
    }

    #[tracing::instrument(skip(self, conn))]
    async fn application_exists_by_id(
        &self,
        conn: &mut DbConnection,
        id: ApplicationId,
        tenant_id: TenantId,
    ) -> Result<bool, RepositoryError> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT id FROM applications WHERE id = ? AND tenant_id = ?")
                .bind(id.0)
                .bind(tenant_id.0)
                .fetch_optional(&mut *conn)
                .await?;
        Ok(found.is_some())
    }

    #[tracing::instrument(skip(self, conn, edit), fields(name = %edit.name, app_type = %edit.app_type))]
    async fn edit_application(
        &self,
        conn: &mut DbConnection,
        edit: &ApplicationEdit,
        tenant_id: TenantId,
    ) -> Result<Application, RepositoryError> {
        let existing = self
            .get_application(conn, &edit.name, &edit.app_type, tenant_id)
            .await?
            .ok_or_else(|| {
                RepositoryError::NotFound(format!("Application {}/{}", edit.name, edit.app_type))
            })?;

        let changes = diff_edit(&existing, edit);
        if changes.is_empty() {
            debug!("No column differs from the stored application");
            return Ok(existing);
        }

        let columns: Vec<&str> = changes.iter().map(|change| change.column).collect();
        build_update(changes, existing.id, tenant_id)
            .build()
            .execute(&mut *conn)
            .await?;
        info!(application_id = %existing.id, ?columns, "Updated application");

        self.get_application_by_id(conn, existing.id, tenant_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("Application {}", existing.id)))
    }

    #[tracing::instrument(skip(self, conn))]
    async fn delete_application(
        &self,
        conn: &mut DbConnection,
        id: ApplicationId,
        tenant_id: TenantId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM applications WHERE id = ? AND tenant_id = ?")
            .bind(id.0)
            .bind(tenant_id.0)
            .execute(&mut *conn)
            .await?;
        debug!(deleted = result.rows_affected(), "Deleted application row");
        Ok(())
    }

    #[tracing::instrument(skip(self, conn, tags), fields(count = tags.len()))]
    async fn add_tags(
        &self,
        conn: &mut DbConnection,
        tags: &[Tag],
        application_id: ApplicationId,
        tenant_id: TenantId,
    ) -> Result<(), RepositoryError> {
        if tags.is_empty() {
            return Ok(());
        }

        let mut query: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("INSERT INTO application_tags (tag, tenant_id, application_id) ");
        query.push_values(tags, |mut row, tag| {
            row.push_bind(tag.name().to_string())
                .push_bind(tenant_id.0)
                .push_bind(application_id.0);
        });
        query.build().execute(&mut *conn).await?;
        debug!("Stored tags");
        Ok(())
    }

    #[tracing::instrument(skip(self, conn))]
    async fn delete_tags(
        &self,
        conn: &mut DbConnection,
        application_id: ApplicationId,
        tenant_id: TenantId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM application_tags WHERE application_id = ? AND tenant_id = ?")
            .bind(application_id.0)
            .bind(tenant_id.0)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, conn))]
    async fn get_uuid_of_latest_release(
        &self,
        conn: &mut DbConnection,
        application_id: ApplicationId,
        tenant_id: TenantId,
    ) -> Result<Option<Uuid>, RepositoryError> {
        let uuid: Option<String> = sqlx::query_scalar(
            r#"
            SELECT r.uuid
            FROM application_releases r
            JOIN applications a ON a.id = r.application_id
            WHERE r.application_id = ?
              AND a.tenant_id = ?
              AND (
                SELECT ls.current_state FROM lifecycle_states ls
                WHERE ls.release_id = r.id
                ORDER BY ls.id DESC LIMIT 1
              ) = 'PUBLISHED'
            ORDER BY r.id DESC
            LIMIT 1
            "#,
        )
        .bind(application_id.0)
        .bind(tenant_id.0)
        .fetch_optional(&mut *conn)
        .await?;

        uuid.map(|value| {
            Uuid::parse_str(&value).map_err(|e| {
                RepositoryError::Serialization(format!("Invalid release uuid '{}': {}", value, e))
            })
        })
        .transpose()
    }
}
