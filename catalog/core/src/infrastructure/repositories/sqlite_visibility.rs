// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! SQLite Unrestricted Roles
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements `VisibilityRepository`

use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite};
use tracing::debug;

use crate::domain::application::{ApplicationId, TenantId, UnrestrictedRole};
use crate::domain::repository::{DbConnection, RepositoryError, VisibilityRepository};

#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteVisibilityRepository;

impl SqliteVisibilityRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl VisibilityRepository for SqliteVisibilityRepository {
    #[tracing::instrument(skip(self, conn, roles), fields(count = roles.len()))]
    async fn add_unrestricted_roles(
        &self,
        conn: &mut DbConnection,
        roles: &[UnrestrictedRole],
        application_id: ApplicationId,
        tenant_id: TenantId,
    ) -> Result<(), RepositoryError> {
        if roles.is_empty() {
            return Ok(());
        }

        let mut query: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("INSERT INTO unrestricted_roles (role, tenant_id, application_id) ");
        query.push_values(roles, |mut row, role| {
            row.push_bind(role.role().to_string())
                .push_bind(tenant_id.0)
                .push_bind(application_id.0);
        });
        query.build().execute(&mut *conn).await?;
        debug!("Stored unrestricted roles");
        Ok(())
    }

    #[tracing::instrument(skip(self, conn))]
    async fn get_unrestricted_roles(
        &self,
        conn: &mut DbConnection,
        application_id: ApplicationId,
        tenant_id: TenantId,
    ) -> Result<Vec<UnrestrictedRole>, RepositoryError> {
        let roles: Vec<String> = sqlx::query_scalar(
            "SELECT role FROM unrestricted_roles \
             WHERE application_id = ? AND tenant_id = ? ORDER BY id",
        )
        .bind(application_id.0)
        .bind(tenant_id.0)
        .fetch_all(&mut *conn)
        .await?;
        Ok(roles.into_iter().map(UnrestrictedRole).collect())
    }

    #[tracing::instrument(skip(self, conn))]
    async fn delete_unrestricted_roles(
        &self,
        conn: &mut DbConnection,
        application_id: ApplicationId,
        tenant_id: TenantId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM unrestricted_roles WHERE application_id = ? AND tenant_id = ?")
            .bind(application_id.0)
            .bind(tenant_id.0)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
