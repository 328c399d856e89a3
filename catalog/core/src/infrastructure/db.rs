// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # SQLite Connection Pool and Transaction Scopes
//!
//! Wraps `sqlx::sqlite::SqlitePool` in a thin `Database` newtype that hands
//! out [`ConnectionScope`]s. A scope owns at most one pooled connection or
//! one open transaction at a time and is never shared between operations.
//!
//! ```text
//! open ──► connection() ──► begin ──► connection() ──► commit | rollback ──► close
//! ```
//!
//! Dropping a scope with an open transaction rolls the transaction back.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::migrate::Migrator;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use tracing::{debug, info, warn};

use crate::domain::catalog_config::DatabaseConfig;
use crate::domain::repository::{DbConnection, RepositoryError};

/// Embedded schema migrations
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .with_context(|| format!("Invalid database url: {}", config.url))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to {}", config.url))?;

        info!(url = %config.url, max_connections = config.max_connections, "Connected to catalog database");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply every pending migration
    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .context("Failed to apply catalog migrations")?;
        debug!("Catalog schema is up to date");
        Ok(())
    }

    /// Scope holding one pooled connection, no transaction
    pub async fn open_scope(&self) -> Result<ConnectionScope, RepositoryError> {
        ConnectionScope::open(&self.pool).await
    }

    /// Scope with a transaction already started
    pub async fn begin_scope(&self) -> Result<ConnectionScope, RepositoryError> {
        let mut scope = ConnectionScope::new(self.pool.clone());
        scope.begin().await?;
        Ok(scope)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

enum ScopeHandle {
    Connection(PoolConnection<Sqlite>),
    Transaction(Transaction<'static, Sqlite>),
}

/// Connection/transaction scope owned by exactly one in-flight operation
pub struct ConnectionScope {
    pool: SqlitePool,
    handle: Option<ScopeHandle>,
}

impl ConnectionScope {
    fn new(pool: SqlitePool) -> Self {
        Self { pool, handle: None }
    }

    pub async fn open(pool: &SqlitePool) -> Result<Self, RepositoryError> {
        let connection = pool.acquire().await?;
        Ok(Self {
            pool: pool.clone(),
            handle: Some(ScopeHandle::Connection(connection)),
        })
    }

    pub fn in_transaction(&self) -> bool {
        matches!(self.handle, Some(ScopeHandle::Transaction(_)))
    }

    /// Start a transaction. Statements issued through [`Self::connection`]
    /// until `commit` or `rollback` belong to it.
    pub async fn begin(&mut self) -> Result<(), RepositoryError> {
        if self.in_transaction() {
            return Err(RepositoryError::Database(
                "Transaction already in progress".to_string(),
            ));
        }
        // Release the idle connection first so a pool of one can still begin
        self.handle = None;
        let tx = self.pool.begin().await?;
        self.handle = Some(ScopeHandle::Transaction(tx));
        Ok(())
    }

    pub async fn commit(&mut self) -> Result<(), RepositoryError> {
        match self.handle.take() {
            Some(ScopeHandle::Transaction(tx)) => {
                tx.commit().await?;
                Ok(())
            }
            other => {
                self.handle = other;
                Err(RepositoryError::Database(
                    "No transaction in progress".to_string(),
                ))
            }
        }
    }

    pub async fn rollback(&mut self) -> Result<(), RepositoryError> {
        match self.handle.take() {
            Some(ScopeHandle::Transaction(tx)) => {
                tx.rollback().await?;
                Ok(())
            }
            other => {
                self.handle = other;
                Err(RepositoryError::Database(
                    "No transaction in progress".to_string(),
                ))
            }
        }
    }

    /// Connection the repositories run on; acquired lazily
    pub async fn connection(&mut self) -> Result<&mut DbConnection, RepositoryError> {
        if self.handle.is_none() {
            let connection = self.pool.acquire().await?;
            self.handle = Some(ScopeHandle::Connection(connection));
        }
        match self.handle.as_mut() {
            Some(ScopeHandle::Connection(conn)) => Ok(&mut **conn),
            Some(ScopeHandle::Transaction(tx)) => Ok(&mut **tx),
            None => Err(RepositoryError::Database(
                "Connection scope is closed".to_string(),
            )),
        }
    }

    /// Release the scope, rolling back any transaction left open
    pub async fn close(mut self) -> Result<(), RepositoryError> {
        if let Some(ScopeHandle::Transaction(tx)) = self.handle.take() {
            warn!("Closing connection scope with an open transaction, rolling back");
            tx.rollback().await?;
        }
        Ok(())
    }
}

impl Drop for ConnectionScope {
    fn drop(&mut self) {
        if self.in_transaction() {
            // sqlx queues the rollback when the transaction is dropped
            warn!("Connection scope dropped with an open transaction, rolling back");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_database() -> Database {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let database = Database::from_pool(pool);
        database.migrate().await.unwrap();
        database
    }

    async fn application_rows(scope: &mut ConnectionScope) -> i64 {
        let conn = scope.connection().await.unwrap();
        sqlx::query_scalar("SELECT COUNT(*) FROM applications")
            .fetch_one(&mut *conn)
            .await
            .unwrap()
    }

    async fn insert_application(scope: &mut ConnectionScope) {
        let conn = scope.connection().await.unwrap();
        sqlx::query(
            "INSERT INTO applications (name, type, category, tenant_id, owner, device_type_id) \
             VALUES ('Foo', 'android', 'tools', 1, 'alice', 1)",
        )
        .execute(&mut *conn)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_commit_persists_writes() {
        let database = memory_database().await;

        let mut scope = database.begin_scope().await.unwrap();
        insert_application(&mut scope).await;
        scope.commit().await.unwrap();
        assert!(!scope.in_transaction());

        assert_eq!(application_rows(&mut scope).await, 1);
        scope.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let database = memory_database().await;

        let mut scope = database.begin_scope().await.unwrap();
        insert_application(&mut scope).await;
        scope.rollback().await.unwrap();

        assert_eq!(application_rows(&mut scope).await, 0);
    }

    #[tokio::test]
    async fn test_close_rolls_back_open_transaction() {
        let database = memory_database().await;

        let mut scope = database.begin_scope().await.unwrap();
        insert_application(&mut scope).await;
        scope.close().await.unwrap();

        let mut scope = database.open_scope().await.unwrap();
        assert_eq!(application_rows(&mut scope).await, 0);
    }

    #[tokio::test]
    async fn test_commit_without_transaction_fails() {
        let database = memory_database().await;
        let mut scope = database.open_scope().await.unwrap();
        assert!(scope.commit().await.is_err());
        assert!(scope.begin().await.is_ok());
        assert!(scope.begin().await.is_err());
    }
}
