//! The Database Driver Abstraction: one connection pool,
//! one dialect fixed for the process lifetime, hiding placeholder style,
//! identifier quoting, and `LastInsertId` vs. `RETURNING` semantics from
//! everything above it.
//!
//! Grounded on `sqlx::any` — the one crate in this corpus (via the
//! `bottle-orm` and `tabularis` driver-abstraction examples) that already
//! expresses "one driver, three backends, dialect detected from a
//! connection-string prefix" as a first-class feature, rather than
//! hand-rolling three separate drivers the way `control`'s Postgres-only
//! `sqlx::query!` usage would otherwise suggest.

pub mod dialect;
pub mod params;

use std::time::Duration;

use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};
use tracing::{debug, info};

pub use dialect::Dialect;
pub use params::SqlParam;

use crate::error::AppError;

#[derive(Clone)]
pub struct DbPool {
    pool: AnyPool,
    dialect: Dialect,
}

impl DbPool {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        sqlx::any::install_default_drivers();

        let dialect = Dialect::from_url(url);
        info!(%dialect, "connecting to database");

        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(url)
            .await?;

        Ok(Self { pool, dialect })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn raw(&self) -> &AnyPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Executes a statement with no result rows (DDL, INSERT/UPDATE/DELETE
    /// without `RETURNING`). Returns rows affected.
    pub async fn exec(&self, sql: &str, params: &[SqlParam]) -> Result<u64, AppError> {
        debug!(sql, "executing statement");
        let args = params::bind_args(params);
        let result = sqlx::query_with(sql, args).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Executes a statement and returns every matching row.
    pub async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<AnyRow>, AppError> {
        debug!(sql, "executing query");
        let args = params::bind_args(params);
        let rows = sqlx::query_with(sql, args).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    pub async fn query_one(&self, sql: &str, params: &[SqlParam]) -> Result<AnyRow, AppError> {
        debug!(sql, "executing query (one row)");
        let args = params::bind_args(params);
        let row = sqlx::query_with(sql, args).fetch_one(&self.pool).await?;
        Ok(row)
    }

    pub async fn query_optional(
        &self,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Option<AnyRow>, AppError> {
        let args = params::bind_args(params);
        let row = sqlx::query_with(sql, args)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Inserts a row and returns the generated `pkid`. PostgreSQL answers
    /// via `RETURNING pkid`; SQLite/MySQL answer via the connection's
    /// last-insert-id, which on an `AnyPool` surfaces through
    /// `AnyQueryResult::last_insert_id()`.
    pub async fn insert_returning_pkid(
        &self,
        insert_sql: &str,
        params: &[SqlParam],
    ) -> Result<i64, AppError> {
        if self.dialect.supports_returning() {
            let row = self.query_one(insert_sql, params).await?;
            let pkid: i64 = row.try_get("pkid").map_err(sqlx::Error::from)?;
            Ok(pkid)
        } else {
            let args = params::bind_args(params);
            let result = sqlx::query_with(insert_sql, args).execute(&self.pool).await?;
            Ok(result.last_insert_id().unwrap_or_default())
        }
    }

    /// Opens a transaction for batched writes that must all succeed or none
    /// do (`:create`/`:update`/`:destroy` batches are atomic by default,
    /// unless `?atomic=false`). `sqlx::Pool::begin` checks out an owned
    /// connection, so the returned transaction outlives the borrow of
    /// `self`.
    pub async fn begin(&self) -> Result<AnyTransaction, AppError> {
        Ok(self.pool.begin().await?)
    }

    pub async fn exec_tx(
        &self,
        tx: &mut AnyTransaction,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<u64, AppError> {
        debug!(sql, "executing statement (transaction)");
        let args = params::bind_args(params);
        let result = sqlx::query_with(sql, args).execute(&mut *tx).await?;
        Ok(result.rows_affected())
    }

    pub async fn query_optional_tx(
        &self,
        tx: &mut AnyTransaction,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Option<AnyRow>, AppError> {
        let args = params::bind_args(params);
        let row = sqlx::query_with(sql, args)
            .fetch_optional(&mut *tx)
            .await?;
        Ok(row)
    }

    pub async fn insert_returning_pkid_tx(
        &self,
        tx: &mut AnyTransaction,
        insert_sql: &str,
        params: &[SqlParam],
    ) -> Result<i64, AppError> {
        if self.dialect.supports_returning() {
            let args = params::bind_args(params);
            let row = sqlx::query_with(insert_sql, args)
                .fetch_one(&mut *tx)
                .await?;
            let pkid: i64 = row.try_get("pkid").map_err(sqlx::Error::from)?;
            Ok(pkid)
        } else {
            let args = params::bind_args(params);
            let result = sqlx::query_with(insert_sql, args).execute(&mut *tx).await?;
            Ok(result.last_insert_id().unwrap_or_default())
        }
    }
}

/// A transaction checked out of the pool's `Any` driver, held across the
/// several statements one batched write needs.
pub type AnyTransaction = sqlx::Transaction<'static, sqlx::Any>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connects_to_in_memory_sqlite() {
        let pool = DbPool::connect("sqlite::memory:", 5).await.unwrap();
        assert_eq!(pool.dialect(), Dialect::Sqlite);
        pool.exec("CREATE TABLE t (pkid INTEGER PRIMARY KEY)", &[])
            .await
            .unwrap();
    }
}
