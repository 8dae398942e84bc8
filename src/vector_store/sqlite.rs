//! SQLite-based vector store implementation.
//!
//! Vectors are stored as little-endian f32 blobs and scored in Rust.

use super::{check_dimension, missing_collection, rank, Metric, SearchHit, VectorRecord, VectorStore};
use crate::error::{CookbookError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS collections (
        name TEXT PRIMARY KEY,
        dimension INTEGER NOT NULL,
        metric TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS vectors (
        collection TEXT NOT NULL,
        id INTEGER NOT NULL,
        vector BLOB NOT NULL,
        question_number TEXT NOT NULL,
        question_part TEXT,
        question TEXT NOT NULL,
        marks INTEGER,
        PRIMARY KEY (collection, id)
    );
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Open (or create) a vector store file.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| CookbookError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn collection_info(conn: &Connection, name: &str) -> Result<Option<(usize, Metric)>> {
        let row: Option<(i64, String)> = conn
            .query_row(
                "SELECT dimension, metric FROM collections WHERE name = ?1",
                params![name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((dimension, metric)) => Ok(Some((dimension as usize, metric.parse()?))),
            None => Ok(None),
        }
    }

    /// Serialize a vector to bytes.
    fn vector_to_bytes(vector: &[f32]) -> Vec<u8> {
        vector.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize a vector from bytes.
    fn bytes_to_vector(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn has_collection(&self, name: &str) -> Result<bool> {
        let conn = self.lock()?;
        Ok(Self::collection_info(&conn, name)?.is_some())
    }

    #[instrument(skip(self))]
    async fn create_collection(&self, name: &str, dimension: usize, metric: Metric) -> Result<()> {
        let conn = self.lock()?;
        if Self::collection_info(&conn, name)?.is_some() {
            return Err(CookbookError::VectorStore(format!(
                "Collection '{}' already exists",
                name
            )));
        }

        conn.execute(
            "INSERT INTO collections (name, dimension, metric, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![name, dimension as i64, metric.as_str(), Utc::now().to_rfc3339()],
        )?;

        info!("Created collection {} ({} dims, {})", name, dimension, metric);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn drop_collection(&self, name: &str) -> Result<()> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let deleted = tx.execute("DELETE FROM vectors WHERE collection = ?1", params![name])?;
        tx.execute("DELETE FROM collections WHERE name = ?1", params![name])?;
        tx.commit()?;

        info!("Dropped collection {} ({} vectors)", name, deleted);
        Ok(())
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn insert(&self, name: &str, records: &[VectorRecord]) -> Result<usize> {
        let conn = self.lock()?;
        let (dimension, _) =
            Self::collection_info(&conn, name)?.ok_or_else(|| missing_collection(name))?;

        for record in records {
            check_dimension(name, dimension, &record.vector)?;
        }

        let tx = conn.unchecked_transaction()?;
        for record in records {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO vectors
                (collection, id, vector, question_number, question_part, question, marks)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    name,
                    record.id,
                    Self::vector_to_bytes(&record.vector),
                    record.question_number,
                    record.question_part,
                    record.question,
                    record.marks,
                ],
            )?;
        }
        tx.commit()?;

        info!("Inserted {} vectors into {}", records.len(), name);
        Ok(records.len())
    }

    #[instrument(skip(self, vector))]
    async fn search(&self, name: &str, vector: &[f32], limit: usize) -> Result<Vec<SearchHit>> {
        let conn = self.lock()?;
        let (dimension, metric) =
            Self::collection_info(&conn, name)?.ok_or_else(|| missing_collection(name))?;
        check_dimension(name, dimension, vector)?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, vector, question_number, question_part, question, marks
            FROM vectors
            WHERE collection = ?1
            "#,
        )?;

        let records = stmt.query_map(params![name], |row| {
            let bytes: Vec<u8> = row.get(1)?;
            Ok(VectorRecord {
                id: row.get(0)?,
                vector: Self::bytes_to_vector(&bytes),
                question_number: row.get(2)?,
                question_part: row.get(3)?,
                question: row.get(4)?,
                marks: row.get(5)?,
            })
        })?;

        let mut hits = Vec::new();
        for record in records {
            let record = record?;
            let score = metric.score(vector, &record.vector);
            hits.push(SearchHit { record, score });
        }

        let hits = rank(hits, limit);
        debug!("Found {} matching vectors", hits.len());
        Ok(hits)
    }

    async fn count(&self, name: &str) -> Result<usize> {
        let conn = self.lock()?;
        if Self::collection_info(&conn, name)?.is_none() {
            return Err(missing_collection(name));
        }

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM vectors WHERE collection = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: i64, vector: Vec<f32>, question: &str) -> VectorRecord {
        VectorRecord {
            id,
            vector,
            question_number: "1".to_string(),
            question_part: Some("(a)".to_string()),
            question: question.to_string(),
            marks: Some(6),
        }
    }

    #[tokio::test]
    async fn test_collection_lifecycle() {
        let store = SqliteVectorStore::in_memory().unwrap();
        assert!(!store.has_collection("questions").await.unwrap());

        store.create_collection("questions", 3, Metric::InnerProduct).await.unwrap();
        assert!(store.has_collection("questions").await.unwrap());
        assert!(store
            .create_collection("questions", 3, Metric::InnerProduct)
            .await
            .is_err());

        store
            .insert("questions", &[record(1, vec![1.0, 0.0, 0.0], "a")])
            .await
            .unwrap();
        assert_eq!(store.count("questions").await.unwrap(), 1);

        store.drop_collection("questions").await.unwrap();
        assert!(!store.has_collection("questions").await.unwrap());
        assert!(store.count("questions").await.is_err());
    }

    #[tokio::test]
    async fn test_search_ranks_by_inner_product() {
        let store = SqliteVectorStore::in_memory().unwrap();
        store.create_collection("questions", 2, Metric::InnerProduct).await.unwrap();
        store
            .insert(
                "questions",
                &[
                    record(1, vec![0.1, 0.9], "Describe the call of Abraham"),
                    record(2, vec![0.9, 0.1], "Outline six attributes of God"),
                    record(3, vec![0.5, 0.5], "State four roles of prophets"),
                ],
            )
            .await
            .unwrap();

        let hits = store.search("questions", &[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].record.id, 2);
        assert_eq!(hits[0].record.question, "Outline six attributes of God");
        assert_eq!(hits[0].record.marks, Some(6));
        assert_eq!(hits[1].record.id, 3);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_and_missing_collection() {
        let store = SqliteVectorStore::in_memory().unwrap();
        store.create_collection("questions", 3, Metric::Cosine).await.unwrap();

        assert!(store
            .insert("questions", &[record(1, vec![1.0, 0.0], "short")])
            .await
            .is_err());
        assert!(store.search("questions", &[1.0], 5).await.is_err());
        assert!(store.search("missing", &[1.0, 0.0, 0.0], 5).await.is_err());
        assert!(store.insert("missing", &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_persists_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vectors.db");

        {
            let store = SqliteVectorStore::new(&path).unwrap();
            store.create_collection("questions", 2, Metric::InnerProduct).await.unwrap();
            store
                .insert("questions", &[record(7, vec![0.25, -0.5], "persisted")])
                .await
                .unwrap();
        }

        let store = SqliteVectorStore::new(&path).unwrap();
        let hits = store.search("questions", &[0.0, -1.0], 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.vector, vec![0.25, -0.5]);
    }
}
