//! Vector store abstraction for exam question embeddings.
//!
//! Vectors live in named collections with a fixed dimension and similarity
//! metric. Each record carries the question fields alongside its vector so a
//! search hit can be shown without a second lookup.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::error::{CookbookError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One embedded question part. `id` matches the relational row id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: i64,
    pub vector: Vec<f32>,
    pub question_number: String,
    pub question_part: Option<String>,
    pub question: String,
    pub marks: Option<i64>,
}

/// Similarity metric of a collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    /// Inner product ("IP").
    #[default]
    InnerProduct,
    Cosine,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::InnerProduct => "IP",
            Metric::Cosine => "COSINE",
        }
    }

    /// Score two vectors of equal length. Higher is more similar.
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::InnerProduct => inner_product(a, b),
            Metric::Cosine => cosine_similarity(a, b),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = CookbookError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ip" | "inner_product" => Ok(Metric::InnerProduct),
            "cosine" => Ok(Metric::Cosine),
            other => Err(CookbookError::Config(format!("Unknown metric: {}", other))),
        }
    }
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub record: VectorRecord,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn has_collection(&self, name: &str) -> Result<bool>;

    /// Create an empty collection. Fails if it already exists.
    async fn create_collection(&self, name: &str, dimension: usize, metric: Metric) -> Result<()>;

    /// Drop a collection and its records. Dropping a missing collection is a no-op.
    async fn drop_collection(&self, name: &str) -> Result<()>;

    /// Insert records, returning how many were stored.
    async fn insert(&self, name: &str, records: &[VectorRecord]) -> Result<usize>;

    /// The `limit` most similar records, best first.
    async fn search(&self, name: &str, vector: &[f32], limit: usize) -> Result<Vec<SearchHit>>;

    /// Number of records in a collection.
    async fn count(&self, name: &str) -> Result<usize>;
}

/// Reject vectors whose length does not match the collection.
pub(crate) fn check_dimension(collection: &str, expected: usize, vector: &[f32]) -> Result<()> {
    if vector.len() != expected {
        return Err(CookbookError::VectorStore(format!(
            "Vector dimension {} does not match collection '{}' dimension {}",
            vector.len(),
            collection,
            expected
        )));
    }
    Ok(())
}

pub(crate) fn missing_collection(name: &str) -> CookbookError {
    CookbookError::VectorStore(format!("Collection '{}' does not exist", name))
}

/// Sort hits best first and keep the top `limit`.
pub(crate) fn rank(mut hits: Vec<SearchHit>, limit: usize) -> Vec<SearchHit> {
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(limit);
    hits
}

/// Inner product of two vectors.
pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product = inner_product(a, b);
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
