//! The Schema Manager: the only component allowed to run
//! DDL. It serializes every mutation of a given collection behind a
//! per-collection lock, applies changes in the fixed order
//! rename -> modify -> add -> remove, and best-effort rolls back everything
//! it already applied if a later step in the same request fails.

pub mod ddl;
pub mod input;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{info, instrument, warn};

use crate::config::settings;
use crate::driver::DbPool;
use crate::error::AppError;
use crate::models::collection::validate_collection_name;
use crate::models::{Collection, Column};
use crate::registry::SchemaRegistry;

pub use input::{ColumnInput, CreateCollectionInput, RenameColumnInput, UpdateCollectionInput};

/// `pkid` and `id`, injected at DDL time (`ddl::create_table`) and never
/// part of `Collection.columns`, but counted against the configured column
/// cap since that limit is defined over the physical table.
const SYSTEM_COLUMN_COUNT: usize = 2;

/// One successfully-applied DDL action, recorded so it can be undone
/// best-effort if a later step in the same `update()` call fails. SQLite
/// cannot roll back DDL transactionally the way Postgres/MySQL mostly can,
/// so this is the only safety net across all three dialects.
#[derive(Debug, Clone)]
enum AppliedStep {
    Renamed { from: String, to: String },
    Added { name: String },
    Removed { old_column: Column },
    Modified { old_column: Column },
}

pub struct SchemaManager {
    db: DbPool,
    registry: SchemaRegistry,
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl SchemaManager {
    pub fn new(db: DbPool, registry: SchemaRegistry) -> Self {
        Self {
            db,
            registry,
            locks: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the per-collection mutex, creating it on first use. Lazily
    /// populated so a long-running process never pre-allocates a lock for a
    /// collection it has not touched.
    async fn lock_for(&self, name: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.read().await.get(name) {
            return lock.clone();
        }
        let mut guard = self.locks.write().await;
        guard
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: CreateCollectionInput) -> Result<Collection, AppError> {
        let name = validate_collection_name(&input.name)?;
        let limits = &settings().limits;

        let lock = self.lock_for(&name).await;
        let _guard = lock.lock().await;

        if self.registry.exists(&name).await {
            return Err(AppError::duplicate_collection(&name));
        }
        if self.registry.count().await >= limits.max_collections {
            return Err(AppError::max_collections_reached(limits.max_collections));
        }
        if input.columns.len() + SYSTEM_COLUMN_COUNT > limits.max_columns_per_collection {
            return Err(AppError::max_columns_reached(
                limits.max_columns_per_collection,
            ));
        }

        let mut columns = Vec::with_capacity(input.columns.len());
        let mut seen = std::collections::HashSet::new();
        for column_input in input.columns {
            let column = column_input.into_column()?;
            if !seen.insert(column.name.clone()) {
                return Err(AppError::validation(
                    "columns",
                    format!("duplicate column name '{}'", column.name),
                ));
            }
            columns.push(column);
        }

        let sql = ddl::create_table(self.db.dialect(), &name, &columns);
        self.db.exec(&sql, &[]).await?;

        let collection = Collection {
            name: name.clone(),
            columns,
        };
        self.registry.set(collection.clone()).await?;
        self.persist_metadata(&collection).await;

        info!(collection = %name, "created collection");
        Ok(collection)
    }

    #[instrument(skip(self))]
    pub async fn destroy(&self, name: &str) -> Result<(), AppError> {
        let lock = self.lock_for(name).await;
        let _guard = lock.lock().await;

        if !self.registry.exists(name).await {
            return Err(AppError::collection_not_found(name));
        }

        let sql = ddl::drop_table(self.db.dialect(), name);
        self.db.exec(&sql, &[]).await?;
        self.registry.delete(name).await?;

        if settings().recovery.persist_metadata {
            if let Err(err) = crate::metadata::delete(&self.db, name).await {
                warn!(collection = name, error = %err, "failed to delete sidecar metadata");
            }
        }

        info!(collection = %name, "dropped collection");
        Ok(())
    }

    /// Best-effort: a sidecar write failure should not fail the request that
    /// already succeeded against the registry and physical table — recovery
    /// remains the safety net for any resulting divergence.
    async fn persist_metadata(&self, collection: &Collection) {
        if !settings().recovery.persist_metadata {
            return;
        }
        if let Err(err) = crate::metadata::upsert(&self.db, collection).await {
            warn!(collection = %collection.name, error = %err, "failed to persist sidecar metadata");
        }
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn update(&self, input: UpdateCollectionInput) -> Result<Collection, AppError> {
        let lock = self.lock_for(&input.name).await;
        let _guard = lock.lock().await;

        let mut collection = self
            .registry
            .get(&input.name)
            .await
            .ok_or_else(|| AppError::collection_not_found(&input.name))?;

        let limits = &settings().limits;
        let projected_count = collection.columns.len() + SYSTEM_COLUMN_COUNT
            + input.add_columns.len()
            - input.remove_columns.len();
        if projected_count > limits.max_columns_per_collection {
            return Err(AppError::max_columns_reached(
                limits.max_columns_per_collection,
            ));
        }

        let mut applied: Vec<AppliedStep> = Vec::new();
        let result = self
            .apply_update(&mut collection, input, &mut applied)
            .await;

        match result {
            Ok(()) => {
                self.registry.set(collection.clone()).await?;
                self.persist_metadata(&collection).await;
                info!(collection = %collection.name, "updated collection");
                Ok(collection)
            }
            Err(err) => {
                self.rollback(&collection.name, applied).await;
                Err(err)
            }
        }
    }

    /// Applies rename -> modify -> add -> remove in that fixed order
    ///, recording each successful step into
    /// `applied` so the caller can roll back on a later failure.
    async fn apply_update(
        &self,
        collection: &mut Collection,
        input: UpdateCollectionInput,
        applied: &mut Vec<AppliedStep>,
    ) -> Result<(), AppError> {
        let dialect = self.db.dialect();
        let table = collection.name.clone();

        for rename in &input.rename_columns {
            if collection.column(&rename.old_name).is_none() {
                return Err(AppError::validation(
                    "rename_columns",
                    format!("column '{}' does not exist", rename.old_name),
                ));
            }
            crate::models::collection::validate_column_name(&rename.new_name)?;
            if collection.column(&rename.new_name).is_some() {
                return Err(AppError::validation(
                    "rename_columns",
                    format!("column '{}' already exists", rename.new_name),
                ));
            }

            let sql = ddl::rename_column(dialect, &table, &rename.old_name, &rename.new_name);
            self.db.exec(&sql, &[]).await?;
            applied.push(AppliedStep::Renamed {
                from: rename.old_name.clone(),
                to: rename.new_name.clone(),
            });

            let column = collection
                .columns
                .iter_mut()
                .find(|c| c.name == rename.old_name)
                .expect("checked above");
            column.name = rename.new_name.clone();
        }

        for modify_input in input.modify_columns {
            let new_column = modify_input.into_column()?;
            let old_column = collection
                .column(&new_column.name)
                .cloned()
                .ok_or_else(|| {
                    AppError::validation(
                        "modify_columns",
                        format!("column '{}' does not exist", new_column.name),
                    )
                })?;

            if dialect == crate::driver::Dialect::Sqlite {
                self.rebuild_table_for_modify(collection, &new_column).await?;
            } else {
                for sql in ddl::modify_column(dialect, &table, &new_column) {
                    self.db.exec(&sql, &[]).await?;
                }
            }
            applied.push(AppliedStep::Modified {
                old_column: old_column.clone(),
            });

            let slot = collection
                .columns
                .iter_mut()
                .find(|c| c.name == new_column.name)
                .expect("checked above");
            *slot = new_column;
        }

        for add_input in input.add_columns {
            let column = add_input.into_column()?;
            if collection.has_column(&column.name) {
                return Err(AppError::validation(
                    "add_columns",
                    format!("column '{}' already exists", column.name),
                ));
            }
            let sql = ddl::add_column(dialect, &table, &column);
            self.db.exec(&sql, &[]).await?;
            applied.push(AppliedStep::Added {
                name: column.name.clone(),
            });
            collection.columns.push(column);
        }

        for remove_name in &input.remove_columns {
            let old_column = collection.column(remove_name).cloned().ok_or_else(|| {
                AppError::validation(
                    "remove_columns",
                    format!("column '{remove_name}' does not exist"),
                )
            })?;
            let sql = ddl::drop_column(dialect, &table, remove_name);
            self.db.exec(&sql, &[]).await?;
            applied.push(AppliedStep::Removed {
                old_column: old_column.clone(),
            });
            collection.columns.retain(|c| c.name != *remove_name);
        }

        Ok(())
    }

    /// SQLite has no native `ALTER COLUMN TYPE`, so a modify is done by
    /// rebuilding the table: create a shadow table with the new column
    /// definitions, copy every row across, drop the original, rename the
    /// shadow into place.
    async fn rebuild_table_for_modify(
        &self,
        collection: &Collection,
        new_column: &Column,
    ) -> Result<(), AppError> {
        let dialect = self.db.dialect();
        let table = &collection.name;
        let shadow = format!("{table}__rebuild");

        let mut new_columns = collection.columns.clone();
        let slot = new_columns
            .iter_mut()
            .find(|c| c.name == new_column.name)
            .expect("caller verified column exists");
        *slot = new_column.clone();

        let create_sql = ddl::create_table(dialect, &shadow, &new_columns);
        self.db.exec(&create_sql, &[]).await?;

        let column_list = std::iter::once("id".to_string())
            .chain(collection.columns.iter().map(|c| c.name.clone()))
            .map(|n| dialect.quote_ident(&n))
            .collect::<Vec<_>>()
            .join(", ");
        let copy_sql = format!(
            "INSERT INTO {} ({}) SELECT {} FROM {}",
            dialect.quote_ident(&shadow),
            column_list,
            column_list,
            dialect.quote_ident(table)
        );
        if let Err(err) = self.db.exec(&copy_sql, &[]).await {
            let _ = self.db.exec(&ddl::drop_table(dialect, &shadow), &[]).await;
            return Err(err);
        }

        self.db.exec(&ddl::drop_table(dialect, table), &[]).await?;
        let rename_sql = format!(
            "ALTER TABLE {} RENAME TO {}",
            dialect.quote_ident(&shadow),
            dialect.quote_ident(table)
        );
        self.db.exec(&rename_sql, &[]).await?;

        Ok(())
    }

    /// Undoes as much of `applied` as possible, most-recent-first. Best
    /// effort only: a failure here is logged, not propagated, since the
    /// caller is already unwinding from an earlier error.
    async fn rollback(&self, table: &str, applied: Vec<AppliedStep>) {
        let dialect = self.db.dialect();
        for step in applied.into_iter().rev() {
            let outcome = match &step {
                AppliedStep::Renamed { from, to } => {
                    let sql = ddl::rename_column(dialect, table, to, from);
                    self.db.exec(&sql, &[]).await.map(|_| ())
                }
                AppliedStep::Added { name } => {
                    let sql = ddl::drop_column(dialect, table, name);
                    self.db.exec(&sql, &[]).await.map(|_| ())
                }
                AppliedStep::Removed { old_column } => {
                    let sql = ddl::add_column(dialect, table, old_column);
                    self.db.exec(&sql, &[]).await.map(|_| ())
                }
                AppliedStep::Modified { old_column } => {
                    if dialect == crate::driver::Dialect::Sqlite {
                        continue;
                    }
                    let mut result = Ok(0);
                    for sql in ddl::modify_column(dialect, table, old_column) {
                        result = self.db.exec(&sql, &[]).await;
                        if result.is_err() {
                            break;
                        }
                    }
                    result.map(|_| ())
                }
            };
            if let Err(err) = outcome {
                warn!(table, ?step, error = %err, "rollback step failed; schema may have diverged");
            }
        }
    }
}
