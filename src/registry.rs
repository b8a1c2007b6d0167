//! The Schema Registry: the authoritative in-memory model of
//! every managed collection. A concurrent map from collection name to
//! `Collection`, where reads never block on other keys' writes and every
//! value handed back is a defensive deep copy so a caller can never mutate
//! the authoritative state by holding onto a reference.
//!
//! Either a concurrent hash-map primitive or a copy-on-write whole-map
//! under a single lock would satisfy the same contract; this corpus carries no
//! sharded-map crate (no `dashmap` in any manifest), so the registry uses a
//! `tokio::sync::RwLock` over the whole map — many concurrent readers, one
//! writer at a time, which is enough since collection mutation is already
//! serialized per-collection one level up by the Schema Manager.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::error::AppError;
use crate::models::Collection;

#[derive(Clone, Default)]
pub struct SchemaRegistry {
    inner: Arc<RwLock<HashMap<String, Collection>>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[instrument(skip(self, collection), fields(name = %collection.name))]
    pub async fn set(&self, collection: Collection) -> Result<(), AppError> {
        if collection.name.is_empty() {
            return Err(AppError::validation_generic(
                "collection name must not be empty",
            ));
        }
        debug!("publishing collection to registry");
        let mut guard = self.inner.write().await;
        guard.insert(collection.name.clone(), collection);
        Ok(())
    }

    pub async fn get(&self, name: &str) -> Option<Collection> {
        let guard = self.inner.read().await;
        guard.get(name).cloned()
    }

    pub async fn exists(&self, name: &str) -> bool {
        let guard = self.inner.read().await;
        guard.contains_key(name)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, name: &str) -> Result<(), AppError> {
        if name.is_empty() {
            return Err(AppError::validation_generic(
                "collection name must not be empty",
            ));
        }
        let mut guard = self.inner.write().await;
        guard.remove(name);
        Ok(())
    }

    pub async fn list(&self) -> Vec<String> {
        let guard = self.inner.read().await;
        guard.keys().cloned().collect()
    }

    pub async fn get_all(&self) -> Vec<Collection> {
        let guard = self.inner.read().await;
        guard.values().cloned().collect()
    }

    pub async fn count(&self) -> usize {
        let guard = self.inner.read().await;
        guard.len()
    }

    pub async fn clear(&self) {
        let mut guard = self.inner.write().await;
        guard.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Column, ColumnType};

    fn sample(name: &str) -> Collection {
        Collection {
            name: name.to_string(),
            columns: vec![Column {
                name: "title".into(),
                r#type: ColumnType::String,
                nullable: false,
                unique: false,
                default_value: None,
            }],
        }
    }

    #[tokio::test]
    async fn set_then_get_returns_a_deep_copy() {
        let registry = SchemaRegistry::new();
        registry.set(sample("products")).await.unwrap();

        let mut fetched = registry.get("products").await.unwrap();
        fetched.columns.push(Column {
            name: "extra".into(),
            r#type: ColumnType::String,
            nullable: true,
            unique: false,
            default_value: None,
        });

        // Mutating the caller's copy must not affect the registry's copy.
        let fetched_again = registry.get("products").await.unwrap();
        assert_eq!(fetched_again.columns.len(), 1);
        assert_eq!(fetched.columns.len(), 2);
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let registry = SchemaRegistry::new();
        assert!(registry.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let registry = SchemaRegistry::new();
        registry.set(sample("products")).await.unwrap();
        registry.delete("products").await.unwrap();
        registry.delete("products").await.unwrap();
        assert!(!registry.exists("products").await);
    }

    #[tokio::test]
    async fn delete_rejects_empty_name() {
        let registry = SchemaRegistry::new();
        assert!(registry.delete("").await.is_err());
    }

    #[tokio::test]
    async fn list_and_count_reflect_current_state() {
        let registry = SchemaRegistry::new();
        registry.set(sample("a")).await.unwrap();
        registry.set(sample("b")).await.unwrap();
        assert_eq!(registry.count().await, 2);
        let mut names = registry.list().await;
        names.sort();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn clear_empties_the_registry() {
        let registry = SchemaRegistry::new();
        registry.set(sample("a")).await.unwrap();
        registry.clear().await;
        assert_eq!(registry.count().await, 0);
    }
}
