//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets.

use super::{check_dimension, missing_collection, rank, Metric, SearchHit, VectorRecord, VectorStore};
use crate::error::{CookbookError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

struct Collection {
    dimension: usize,
    metric: Metric,
    records: Vec<VectorRecord>,
}

/// In-memory vector store.
#[derive(Default)]
pub struct MemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .read()
            .map_err(|e| CookbookError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .write()
            .map_err(|e| CookbookError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn has_collection(&self, name: &str) -> Result<bool> {
        Ok(self.read()?.contains_key(name))
    }

    async fn create_collection(&self, name: &str, dimension: usize, metric: Metric) -> Result<()> {
        let mut collections = self.write()?;
        if collections.contains_key(name) {
            return Err(CookbookError::VectorStore(format!(
                "Collection '{}' already exists",
                name
            )));
        }
        collections.insert(
            name.to_string(),
            Collection {
                dimension,
                metric,
                records: Vec::new(),
            },
        );
        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> Result<()> {
        self.write()?.remove(name);
        Ok(())
    }

    async fn insert(&self, name: &str, records: &[VectorRecord]) -> Result<usize> {
        let mut collections = self.write()?;
        let collection = collections
            .get_mut(name)
            .ok_or_else(|| missing_collection(name))?;

        for record in records {
            check_dimension(name, collection.dimension, &record.vector)?;
        }
        for record in records {
            collection.records.retain(|r| r.id != record.id);
            collection.records.push(record.clone());
        }
        Ok(records.len())
    }

    async fn search(&self, name: &str, vector: &[f32], limit: usize) -> Result<Vec<SearchHit>> {
        let collections = self.read()?;
        let collection = collections.get(name).ok_or_else(|| missing_collection(name))?;
        check_dimension(name, collection.dimension, vector)?;

        let hits = collection
            .records
            .iter()
            .map(|record| SearchHit {
                score: collection.metric.score(vector, &record.vector),
                record: record.clone(),
            })
            .collect();

        Ok(rank(hits, limit))
    }

    async fn count(&self, name: &str) -> Result<usize> {
        let collections = self.read()?;
        collections
            .get(name)
            .map(|c| c.records.len())
            .ok_or_else(|| missing_collection(name))
    }
}
