// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! SQLite Lifecycle States
//!
//! Append-only history; the row with the highest id is the current state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::debug;

use crate::domain::application::ApplicationId;
use crate::domain::release::{LifecycleState, LifecycleStateRecord, ReleaseId};
use crate::domain::repository::{DbConnection, LifecycleStateRepository, RepositoryError};

#[derive(Debug, FromRow)]
struct LifecycleRow {
    id: i64,
    release_id: i64,
    current_state: String,
    changed_by: String,
    changed_at: DateTime<Utc>,
}

impl TryFrom<LifecycleRow> for LifecycleStateRecord {
    type Error = RepositoryError;

    fn try_from(row: LifecycleRow) -> Result<Self, Self::Error> {
        let state = LifecycleState::parse(&row.current_state)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        Ok(LifecycleStateRecord {
            id: row.id,
            release_id: ReleaseId(row.release_id),
            state,
            changed_by: row.changed_by,
            changed_at: row.changed_at,
        })
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteLifecycleStateRepository;

impl SqliteLifecycleStateRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LifecycleStateRepository for SqliteLifecycleStateRepository {
    #[tracing::instrument(skip(self, conn))]
    async fn add_lifecycle_state(
        &self,
        conn: &mut DbConnection,
        release_id: ReleaseId,
        state: LifecycleState,
        changed_by: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<LifecycleStateRecord, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO lifecycle_states (release_id, current_state, changed_by, changed_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(release_id.0)
        .bind(state.as_str())
        .bind(changed_by)
        .bind(changed_at)
        .execute(&mut *conn)
        .await?;

        debug!("Recorded lifecycle state");
        Ok(LifecycleStateRecord {
            id: result.last_insert_rowid(),
            release_id,
            state,
            changed_by: changed_by.to_string(),
            changed_at,
        })
    }

    #[tracing::instrument(skip(self, conn))]
    async fn get_latest_lifecycle_state(
        &self,
        conn: &mut DbConnection,
        release_id: ReleaseId,
    ) -> Result<Option<LifecycleStateRecord>, RepositoryError> {
        let row: Option<LifecycleRow> = sqlx::query_as(
            "SELECT id, release_id, current_state, changed_by, changed_at \
             FROM lifecycle_states WHERE release_id = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(release_id.0)
        .fetch_optional(&mut *conn)
        .await?;
        row.map(LifecycleStateRecord::try_from).transpose()
    }

    #[tracing::instrument(skip(self, conn))]
    async fn get_lifecycle_history(
        &self,
        conn: &mut DbConnection,
        release_id: ReleaseId,
    ) -> Result<Vec<LifecycleStateRecord>, RepositoryError> {
        let rows: Vec<LifecycleRow> = sqlx::query_as(
            "SELECT id, release_id, current_state, changed_by, changed_at \
             FROM lifecycle_states WHERE release_id = ? ORDER BY id",
        )
        .bind(release_id.0)
        .fetch_all(&mut *conn)
        .await?;
        rows.into_iter().map(LifecycleStateRecord::try_from).collect()
    }

    #[tracing::instrument(skip(self, conn))]
    async fn delete_lifecycle_states(
        &self,
        conn: &mut DbConnection,
        application_id: ApplicationId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM lifecycle_states WHERE release_id IN \
             (SELECT id FROM application_releases WHERE application_id = ?)",
        )
        .bind(application_id.0)
        .execute(&mut *conn)
        .await?;
        debug!(deleted = result.rows_affected(), "Deleted lifecycle history");
        Ok(())
    }
}
