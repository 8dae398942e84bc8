//! Relational store for extracted exam questions.

use super::model::RetrievedQuestion;
use crate::error::{CookbookError, Result};
use rusqlite::{params, params_from_iter, Connection};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, instrument};

/// A question part to be stored, tagged with the exam it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuestionRow {
    pub exam_name: String,
    pub subject: String,
    pub year: String,
    pub question_number: String,
    pub part_label: Option<String>,
    pub content: String,
    pub marks: Option<i64>,
}

/// SQLite-backed `exam_questions` table.
pub struct QuestionStore {
    conn: Mutex<Connection>,
}

impl QuestionStore {
    /// Open the exam database. Tables are created by [`QuestionStore::create_tables`].
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| CookbookError::QuestionStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Create the `exam_questions` table if it does not exist yet.
    #[instrument(skip(self))]
    pub fn create_tables(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS exam_questions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                exam_name TEXT NOT NULL,
                subject TEXT NOT NULL,
                year TEXT NOT NULL,
                question_number TEXT NOT NULL,
                part_label TEXT,
                content TEXT NOT NULL,
                marks INTEGER,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            "#,
        )?;
        info!("Ensured exam_questions table exists");
        Ok(())
    }

    /// Insert all rows in one transaction and return their ids in order.
    #[instrument(skip(self, rows), fields(count = rows.len()))]
    pub fn insert_parts(&self, rows: &[NewQuestionRow]) -> Result<Vec<i64>> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let mut ids = Vec::with_capacity(rows.len());

        for row in rows {
            tx.execute(
                r#"
                INSERT INTO exam_questions
                (exam_name, subject, year, question_number, part_label, content, marks)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    row.exam_name,
                    row.subject,
                    row.year,
                    row.question_number,
                    row.part_label,
                    row.content,
                    row.marks,
                ],
            )?;
            ids.push(tx.last_insert_rowid());
        }

        tx.commit()?;
        info!("Stored {} question parts", ids.len());
        Ok(ids)
    }

    /// Load rows by id, in the order the ids were given. Unknown ids are skipped.
    pub fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<RetrievedQuestion>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        let placeholders = vec!["?"; ids.len()].join(", ");
        let mut stmt = conn.prepare(&format!(
            "SELECT id, question_number, part_label, content, marks FROM exam_questions WHERE id IN ({})",
            placeholders
        ))?;

        let rows = stmt.query_map(params_from_iter(ids.iter()), |row| {
            Ok(RetrievedQuestion {
                id: row.get(0)?,
                question_number: row.get(1)?,
                question_part: row.get(2)?,
                question: row.get(3)?,
                marks: row.get(4)?,
            })
        })?;

        let mut by_id = HashMap::new();
        for row in rows {
            let row = row?;
            by_id.insert(row.id, row);
        }

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    pub fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM exam_questions", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
