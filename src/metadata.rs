//! The optional `moon_collections` sidecar: persists original column order and
//! `nullable`/`unique` flags the Schema Manager already has in hand, so
//! recovery can prefer it over blind introspection. Absent by default;
//! gated behind `recovery.persist_metadata`.

use sqlx::Row;

use crate::driver::{DbPool, Dialect, SqlParam};
use crate::error::AppError;
use crate::models::{Collection, Column, RESERVED_PREFIX};

pub const TABLE_NAME: &str = "moon_collections";

pub fn create_table_sql(dialect: Dialect) -> String {
    let table = dialect.quote_ident(TABLE_NAME);
    let pkid = match dialect {
        Dialect::Sqlite => "INTEGER PRIMARY KEY AUTOINCREMENT",
        Dialect::Postgres => "BIGSERIAL PRIMARY KEY",
        Dialect::MySql => "BIGINT AUTO_INCREMENT PRIMARY KEY",
    };
    format!(
        "CREATE TABLE IF NOT EXISTS {table} ({} {pkid}, {} TEXT NOT NULL UNIQUE, {} TEXT NOT NULL)",
        dialect.quote_ident("pkid"),
        dialect.quote_ident("name"),
        dialect.quote_ident("columns_json"),
    )
}

/// Whether the sidecar table exists, checked per-dialect since there is no
/// portable `information_schema` view across SQLite/PostgreSQL/MySQL.
pub async fn exists(db: &DbPool) -> Result<bool, AppError> {
    let dialect = db.dialect();
    let (sql, params): (String, Vec<SqlParam>) = match dialect {
        Dialect::Sqlite => (
            format!(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = {}",
                dialect.placeholder(1)
            ),
            vec![SqlParam::Text(TABLE_NAME.to_string())],
        ),
        Dialect::Postgres | Dialect::MySql => (
            format!(
                "SELECT table_name FROM information_schema.tables WHERE table_name = {}",
                dialect.placeholder(1)
            ),
            vec![SqlParam::Text(TABLE_NAME.to_string())],
        ),
    };
    let row = db.query_optional(&sql, &params).await?;
    Ok(row.is_some())
}

pub async fn upsert(db: &DbPool, collection: &Collection) -> Result<(), AppError> {
    let columns_json = serde_json::to_string(&collection.columns)?;
    let dialect = db.dialect();

    let delete_sql = format!(
        "DELETE FROM {} WHERE {} = {}",
        dialect.quote_ident(TABLE_NAME),
        dialect.quote_ident("name"),
        dialect.placeholder(1)
    );
    db.exec(&delete_sql, &[SqlParam::Text(collection.name.clone())])
        .await?;

    let insert_sql = format!(
        "INSERT INTO {} ({}, {}) VALUES ({}, {})",
        dialect.quote_ident(TABLE_NAME),
        dialect.quote_ident("name"),
        dialect.quote_ident("columns_json"),
        dialect.placeholder(1),
        dialect.placeholder(2),
    );
    db.exec(
        &insert_sql,
        &[
            SqlParam::Text(collection.name.clone()),
            SqlParam::Text(columns_json),
        ],
    )
    .await?;

    Ok(())
}

pub async fn delete(db: &DbPool, name: &str) -> Result<(), AppError> {
    let dialect = db.dialect();
    let sql = format!(
        "DELETE FROM {} WHERE {} = {}",
        dialect.quote_ident(TABLE_NAME),
        dialect.quote_ident("name"),
        dialect.placeholder(1)
    );
    db.exec(&sql, &[SqlParam::Text(name.to_string())]).await?;
    Ok(())
}

/// Loads every persisted collection definition. Returns an empty map if the
/// sidecar table does not exist.
pub async fn load_all(db: &DbPool) -> Result<Vec<Collection>, AppError> {
    if !exists(db).await? {
        return Ok(Vec::new());
    }
    let dialect = db.dialect();
    let sql = format!(
        "SELECT {}, {} FROM {}",
        dialect.quote_ident("name"),
        dialect.quote_ident("columns_json"),
        dialect.quote_ident(TABLE_NAME),
    );
    let rows = db.query(&sql, &[]).await?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let name: String = row.try_get("name").map_err(sqlx::Error::from)?;
        if name.starts_with(RESERVED_PREFIX) {
            continue;
        }
        let columns_json: String = row.try_get("columns_json").map_err(sqlx::Error::from)?;
        let columns: Vec<Column> = serde_json::from_str(&columns_json)?;
        out.push(Collection { name, columns });
    }
    Ok(out)
}
