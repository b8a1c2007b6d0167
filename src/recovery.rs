//! Consistency & Recovery: startup reconciliation between
//! the (empty, at boot) registry and whatever physical tables the database
//! actually holds.

use std::collections::HashMap;
use std::time::Duration;

use sqlx::Row;
use tracing::{info, warn};

use crate::config::RecoverySettings;
use crate::driver::{DbPool, Dialect};
use crate::error::AppError;
use crate::models::{Collection, Column, RESERVED_PREFIX, SYSTEM_COLUMNS};
use crate::registry::SchemaRegistry;

struct IntrospectedColumn {
    name: String,
    native_type: String,
    nullable: bool,
}

/// Reconciles the registry against physical tables within `settings.
/// check_timeout_seconds`. Fails startup (returns `Err`) on timeout.
pub async fn reconcile(
    db: &DbPool,
    registry: &SchemaRegistry,
    settings: &RecoverySettings,
) -> Result<(), AppError> {
    let timeout = Duration::from_secs(settings.check_timeout_seconds);
    tokio::time::timeout(timeout, reconcile_inner(db, registry, settings))
        .await
        .map_err(|_| {
            anyhow::anyhow!(
                "startup recovery did not complete within {}s",
                settings.check_timeout_seconds
            )
            .into()
        })?
}

async fn reconcile_inner(
    db: &DbPool,
    registry: &SchemaRegistry,
    settings: &RecoverySettings,
) -> Result<(), AppError> {
    let persisted: HashMap<String, Collection> = crate::metadata::load_all(db)
        .await?
        .into_iter()
        .map(|c| (c.name.clone(), c))
        .collect();

    let tables = list_tables(db).await?;
    info!(count = tables.len(), "recovery: enumerated physical tables");

    for table in tables {
        if table.starts_with(RESERVED_PREFIX) {
            continue;
        }

        let columns = introspect_columns(db, &table).await?;
        let has_id = columns.iter().any(|c| c.name == "id");
        let has_pkid = columns.iter().any(|c| c.name == "pkid");

        if has_id && has_pkid {
            let collection = if let Some(persisted) = persisted.get(&table) {
                info!(collection = %table, "recovery: adopting from persisted metadata");
                persisted.clone()
            } else {
                info!(collection = %table, "recovery: inferring schema from introspection");
                infer_collection(db.dialect(), &table, &columns)
            };
            registry.set(collection).await?;
        } else if settings.drop_orphans {
            warn!(table = %table, "recovery: dropping unmanaged orphan table");
            let sql = crate::schema_manager::ddl::drop_table(db.dialect(), &table);
            db.exec(&sql, &[]).await?;
        } else {
            warn!(table = %table, "recovery: registering unmanaged table as-is");
            let collection = infer_collection(db.dialect(), &table, &columns);
            registry.set(collection).await?;
        }
    }

    let registered: std::collections::HashSet<String> =
        registry.list().await.into_iter().collect();
    for name in persisted.keys() {
        if !registered.contains(name) {
            warn!(collection = %name, "recovery: dropping registry entry with no physical table");
        }
    }

    Ok(())
}

async fn list_tables(db: &DbPool) -> Result<Vec<String>, AppError> {
    let sql = match db.dialect() {
        Dialect::Sqlite => "SELECT name FROM sqlite_master WHERE type = 'table'",
        Dialect::Postgres => {
            "SELECT table_name AS name FROM information_schema.tables WHERE table_schema = 'public'"
        }
        Dialect::MySql => "SELECT table_name AS name FROM information_schema.tables WHERE table_schema = database()",
    };
    let rows = db.query(sql, &[]).await?;
    let mut names = Vec::with_capacity(rows.len());
    for row in rows {
        let name: String = row.try_get("name").map_err(sqlx::Error::from)?;
        if name.starts_with("sqlite_") {
            continue;
        }
        names.push(name);
    }
    Ok(names)
}

async fn introspect_columns(
    db: &DbPool,
    table: &str,
) -> Result<Vec<IntrospectedColumn>, AppError> {
    match db.dialect() {
        Dialect::Sqlite => {
            let sql = format!("PRAGMA table_info({})", db.dialect().quote_ident(table));
            let rows = db.query(&sql, &[]).await?;
            Ok(rows
                .into_iter()
                .map(|row| {
                    let name: String = row.try_get("name").unwrap_or_default();
                    let native_type: String = row.try_get("type").unwrap_or_default();
                    let notnull: i64 = row.try_get("notnull").unwrap_or_default();
                    IntrospectedColumn {
                        name,
                        native_type,
                        nullable: notnull == 0,
                    }
                })
                .collect())
        }
        Dialect::Postgres | Dialect::MySql => {
            let sql = format!(
                "SELECT column_name AS name, data_type AS native_type, is_nullable AS nullable \
                 FROM information_schema.columns WHERE table_name = {}",
                db.dialect().placeholder(1)
            );
            let rows = db
                .query(&sql, &[crate::driver::SqlParam::Text(table.to_string())])
                .await?;
            Ok(rows
                .into_iter()
                .map(|row| {
                    let name: String = row.try_get("name").unwrap_or_default();
                    let native_type: String = row.try_get("native_type").unwrap_or_default();
                    let nullable: String = row.try_get("nullable").unwrap_or_default();
                    IntrospectedColumn {
                        name,
                        native_type,
                        nullable: nullable.eq_ignore_ascii_case("yes"),
                    }
                })
                .collect())
        }
    }
}

/// Maps dialect-native column types back to the API type set. Columns whose
/// native type cannot be mapped are
/// skipped rather than guessed at.
fn infer_collection(dialect: Dialect, table: &str, columns: &[IntrospectedColumn]) -> Collection {
    let mut inferred = Vec::new();
    for col in columns {
        if SYSTEM_COLUMNS.contains(&col.name.as_str()) {
            continue;
        }
        let Some(ty) = dialect.infer_type(&col.native_type) else {
            warn!(
                table,
                column = %col.name,
                native_type = %col.native_type,
                "recovery: could not infer API type, skipping column"
            );
            continue;
        };
        inferred.push(Column {
            name: col.name.clone(),
            r#type: ty,
            nullable: col.nullable,
            unique: false,
            default_value: None,
        });
    }
    Collection {
        name: table.to_string(),
        columns: inferred,
    }
}
