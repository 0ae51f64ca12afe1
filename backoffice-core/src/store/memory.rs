//! In-memory [`RecordStore`] used by tests and as the default backend when no
//! database is configured.

use super::{Collection, Filter, RecordStore};
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Value>, AppError> {
        let collections = self.collections.read().await;
        let rows = collections
            .get(&collection)
            .map(|rows| rows.iter().filter(|r| filter.matches(r)).cloned().collect())
            .unwrap_or_default();
        Ok(rows)
    }

    async fn find_one(&self, collection: Collection, filter: &Filter) -> Result<Value, AppError> {
        let collections = self.collections.read().await;
        collections
            .get(&collection)
            .and_then(|rows| rows.iter().find(|r| filter.matches(r)).cloned())
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("no matching {} record", collection))
            })
    }

    async fn insert(
        &self,
        collection: Collection,
        rows: Vec<Value>,
    ) -> Result<Vec<Value>, AppError> {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection)
            .or_default()
            .extend(rows.iter().cloned());
        Ok(rows)
    }

    async fn update(
        &self,
        collection: Collection,
        filter: &Filter,
        patch: Value,
    ) -> Result<Vec<Value>, AppError> {
        let patch = patch.as_object().cloned().ok_or_else(|| {
            AppError::StoreError(anyhow::anyhow!("update patch must be a JSON object"))
        })?;

        let mut collections = self.collections.write().await;
        let mut updated = Vec::new();
        if let Some(rows) = collections.get_mut(&collection) {
            for row in rows.iter_mut().filter(|r| filter.matches(r)) {
                if let Some(obj) = row.as_object_mut() {
                    for (key, value) in &patch {
                        obj.insert(key.clone(), value.clone());
                    }
                }
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn delete(&self, collection: Collection, filter: &Filter) -> Result<u64, AppError> {
        let mut collections = self.collections.write().await;
        let Some(rows) = collections.get_mut(&collection) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|r| !filter.matches(r));
        Ok((before - rows.len()) as u64)
    }
}
