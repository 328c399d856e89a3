// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! SQLite Application Releases
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements `ApplicationReleaseRepository`
//!
//! Every query attaches the release's current lifecycle state, read from its
//! latest `lifecycle_states` row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::application::{ApplicationId, TenantId};
use crate::domain::release::{ApplicationRelease, LifecycleState, NewRelease, ReleaseId};
use crate::domain::repository::{ApplicationReleaseRepository, DbConnection, RepositoryError};

const RELEASE_COLUMNS: &str = "r.id, r.application_id, r.version, r.uuid, r.release_type, r.price, \
     r.stored_location, r.banner_location, r.screenshot_1, r.screenshot_2, r.screenshot_3, \
     r.hash, r.shared_with_all_tenants, r.meta_info, r.created_by, r.created_at, \
     r.published_by, r.published_at, r.stars, \
     (SELECT ls.current_state FROM lifecycle_states ls \
      WHERE ls.release_id = r.id ORDER BY ls.id DESC LIMIT 1) AS current_state";

#[derive(Debug, FromRow)]
struct ReleaseRow {
    id: i64,
    application_id: i64,
    version: String,
    uuid: String,
    release_type: String,
    price: f64,
    stored_location: Option<String>,
    banner_location: Option<String>,
    screenshot_1: Option<String>,
    screenshot_2: Option<String>,
    screenshot_3: Option<String>,
    hash: Option<String>,
    shared_with_all_tenants: bool,
    meta_info: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
    published_by: Option<String>,
    published_at: Option<DateTime<Utc>>,
    stars: i64,
    current_state: Option<String>,
}

impl TryFrom<ReleaseRow> for ApplicationRelease {
    type Error = RepositoryError;

    fn try_from(row: ReleaseRow) -> Result<Self, Self::Error> {
        let uuid = Uuid::parse_str(&row.uuid).map_err(|e| {
            RepositoryError::Serialization(format!("Invalid release uuid '{}': {}", row.uuid, e))
        })?;
        let stars = i32::try_from(row.stars).map_err(|_| {
            RepositoryError::Serialization(format!("Star count {} out of range", row.stars))
        })?;
        let meta_info = row
            .meta_info
            .as_deref()
            .map(serde_json::from_str::<serde_json::Value>)
            .transpose()?;
        let current_state = row
            .current_state
            .as_deref()
            .map(LifecycleState::parse)
            .transpose()
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        let screenshots = [row.screenshot_1, row.screenshot_2, row.screenshot_3]
            .into_iter()
            .flatten()
            .collect();

        Ok(ApplicationRelease {
            id: ReleaseId(row.id),
            application_id: ApplicationId(row.application_id),
            version: row.version,
            uuid,
            release_type: row.release_type,
            price: row.price,
            stored_location: row.stored_location,
            banner_location: row.banner_location,
            screenshots,
            hash: row.hash,
            shared_with_all_tenants: row.shared_with_all_tenants,
            meta_info,
            created_by: row.created_by,
            created_at: row.created_at,
            published_by: row.published_by,
            published_at: row.published_at,
            stars,
            current_state,
        })
    }
}

fn into_releases(rows: Vec<ReleaseRow>) -> Result<Vec<ApplicationRelease>, RepositoryError> {
    rows.into_iter().map(ApplicationRelease::try_from).collect()
}

/// Release with `uuid`, provided its application belongs to `tenant_id`
pub(crate) async fn fetch_release_by_uuid(
    conn: &mut DbConnection,
    uuid: Uuid,
    tenant_id: TenantId,
) -> Result<Option<ApplicationRelease>, RepositoryError> {
    let sql = format!(
        "SELECT {RELEASE_COLUMNS} FROM application_releases r \
         JOIN applications a ON a.id = r.application_id \
         WHERE r.uuid = ? AND a.tenant_id = ?"
    );
    let row: Option<ReleaseRow> = sqlx::query_as(&sql)
        .bind(uuid.to_string())
        .bind(tenant_id.0)
        .fetch_optional(&mut *conn)
        .await?;
    row.map(ApplicationRelease::try_from).transpose()
}

async fn fetch_release_by_id(
    conn: &mut DbConnection,
    id: ReleaseId,
) -> Result<ApplicationRelease, RepositoryError> {
    let sql = format!("SELECT {RELEASE_COLUMNS} FROM application_releases r WHERE r.id = ?");
    let row: ReleaseRow = sqlx::query_as(&sql)
        .bind(id.0)
        .fetch_one(&mut *conn)
        .await?;
    row.try_into()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteApplicationReleaseRepository;

impl SqliteApplicationReleaseRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ApplicationReleaseRepository for SqliteApplicationReleaseRepository {
    #[tracing::instrument(skip(self, conn, release), fields(version = %release.version))]
    async fn create_release(
        &self,
        conn: &mut DbConnection,
        release: &NewRelease,
        uuid: Uuid,
        application_id: ApplicationId,
        created_by: &str,
        created_at: DateTime<Utc>,
    ) -> Result<ApplicationRelease, RepositoryError> {
        let meta_info = release
            .meta_info
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let screenshot = |index: usize| release.screenshots.get(index).cloned();

        let result = sqlx::query(
            r#"
            INSERT INTO application_releases (
                application_id, version, uuid, release_type, price,
                stored_location, banner_location, screenshot_1, screenshot_2, screenshot_3,
                hash, shared_with_all_tenants, meta_info, created_by, created_at, stars
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(application_id.0)
        .bind(release.version.trim())
        .bind(uuid.to_string())
        .bind(&release.release_type)
        .bind(release.price)
        .bind(&release.stored_location)
        .bind(&release.banner_location)
        .bind(screenshot(0))
        .bind(screenshot(1))
        .bind(screenshot(2))
        .bind(&release.hash)
        .bind(release.shared_with_all_tenants)
        .bind(meta_info)
        .bind(created_by)
        .bind(created_at)
        .execute(&mut *conn)
        .await?;

        let id = ReleaseId(result.last_insert_rowid());
        info!(release_id = %id, %uuid, "Created release");
        fetch_release_by_id(conn, id).await
    }

    #[tracing::instrument(skip(self, conn))]
    async fn get_releases(
        &self,
        conn: &mut DbConnection,
        name: &str,
        app_type: &str,
        tenant_id: TenantId,
    ) -> Result<Vec<ApplicationRelease>, RepositoryError> {
        debug!("Fetching releases");
        let sql = format!(
            "SELECT {RELEASE_COLUMNS} FROM application_releases r \
             JOIN applications a ON a.id = r.application_id \
             WHERE a.name = ? AND a.type = ? AND a.tenant_id = ? \
             ORDER BY r.id"
        );
        let rows: Vec<ReleaseRow> = sqlx::query_as(&sql)
            .bind(name)
            .bind(app_type)
            .bind(tenant_id.0)
            .fetch_all(&mut *conn)
            .await?;
        into_releases(rows)
    }

    #[tracing::instrument(skip(self, conn))]
    async fn get_releases_by_application(
        &self,
        conn: &mut DbConnection,
        application_id: ApplicationId,
    ) -> Result<Vec<ApplicationRelease>, RepositoryError> {
        let sql = format!(
            "SELECT {RELEASE_COLUMNS} FROM application_releases r \
             WHERE r.application_id = ? ORDER BY r.id"
        );
        let rows: Vec<ReleaseRow> = sqlx::query_as(&sql)
            .bind(application_id.0)
            .fetch_all(&mut *conn)
            .await?;
        into_releases(rows)
    }

    #[tracing::instrument(skip(self, conn))]
    async fn get_release(
        &self,
        conn: &mut DbConnection,
        uuid: Uuid,
        tenant_id: TenantId,
    ) -> Result<Option<ApplicationRelease>, RepositoryError> {
        fetch_release_by_uuid(conn, uuid, tenant_id).await
    }

    #[tracing::instrument(skip(self, conn))]
    async fn mark_published(
        &self,
        conn: &mut DbConnection,
        release_id: ReleaseId,
        published_by: &str,
        published_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE application_releases SET published_by = ?, published_at = ? WHERE id = ?",
        )
        .bind(published_by)
        .bind(published_at)
        .bind(release_id.0)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("Release {}", release_id)));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, conn))]
    async fn delete_releases(
        &self,
        conn: &mut DbConnection,
        application_id: ApplicationId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM application_releases WHERE application_id = ?")
            .bind(application_id.0)
            .execute(&mut *conn)
            .await?;
        debug!(deleted = result.rows_affected(), "Deleted releases");
        Ok(())
    }
}
