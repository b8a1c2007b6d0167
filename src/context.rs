use std::sync::Arc;

use crate::driver::DbPool;
use crate::registry::SchemaRegistry;
use crate::schema_manager::SchemaManager;
use crate::ulid::UlidGenerator;

/// Everything a request handler needs, threaded through `axum`'s extension
/// layer: the database pool, schema registry, schema manager (which owns
/// per-collection DDL locking), and the ULID
/// generator — the shared process state every request handler needs.
#[derive(Clone)]
pub struct AppContext {
    db: DbPool,
    registry: SchemaRegistry,
    schema_manager: Arc<SchemaManager>,
    ulids: Arc<UlidGenerator>,
}

impl AppContext {
    pub fn new(db: DbPool, registry: SchemaRegistry) -> Self {
        let schema_manager = Arc::new(SchemaManager::new(db.clone(), registry.clone()));
        Self {
            db,
            registry,
            schema_manager,
            ulids: Arc::new(UlidGenerator::new()),
        }
    }

    pub fn db(&self) -> &DbPool {
        &self.db
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn schema_manager(&self) -> &SchemaManager {
        &self.schema_manager
    }

    pub fn ulids(&self) -> &UlidGenerator {
        &self.ulids
    }
}
