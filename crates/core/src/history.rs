//! # Solve History
//!
//! SQLite persistence for answered questions, stored in
//! `.stepwise/stepwise.db`. Writes happen off the request path, so a
//! failed insert costs the caller nothing but a log line.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::models::{Solution, Subject};

/// Schema version for migrations
const SCHEMA_VERSION: i32 = 1;

/// Default number of rows returned by [`HistoryStore::recent`]
pub const DEFAULT_HISTORY_LIMIT: u32 = 10;

/// A solved question ready to be persisted
#[derive(Debug, Clone)]
pub struct HistoryRecord {
    pub user_id: String,
    /// Input modality; only plain text is accepted today
    pub query_type: String,
    pub query_text: String,
    pub subject: Subject,
    /// Topic classification within the subject
    pub topic: String,
    pub solution: Solution,
    /// Parser confidence in the structured solution
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

impl HistoryRecord {
    /// Record for a freshly solved text question
    pub fn new(user_id: &str, query_text: &str, subject: Subject, solution: Solution) -> Self {
        Self {
            user_id: user_id.to_string(),
            query_type: "text".to_string(),
            query_text: query_text.to_string(),
            subject,
            topic: "Unclassified".to_string(),
            solution,
            confidence: 0.9,
            created_at: Utc::now(),
        }
    }
}

/// Row shape returned to history readers
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub query_text: String,
    pub subject: String,
    pub final_answer: String,
    pub created_at: String,
}

/// Database manager for solved-question history
pub struct HistoryStore {
    conn: Arc<Mutex<Connection>>,
}

impl HistoryStore {
    /// Open or create the database at `STEPWISE_DB`, falling back to
    /// `.stepwise/stepwise.db`
    pub fn open() -> Result<Self> {
        let path =
            std::env::var("STEPWISE_DB").unwrap_or_else(|_| ".stepwise/stepwise.db".to_string());
        Self::open_at(path)
    }

    /// Open database at a specific path (useful for testing)
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let conn = Connection::open(path.as_ref()).context("Failed to open history database")?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        store.run_migrations()?;

        Ok(store)
    }

    /// Run schema migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)",
            [],
        )?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if current_version < 1 {
            self.migrate_v1(&conn)?;
            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                [1],
            )?;
        }

        Ok(())
    }

    /// Migration to version 1 - complete schema
    fn migrate_v1(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS doubts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                query_type TEXT NOT NULL DEFAULT 'text',
                query_text TEXT NOT NULL,
                subject TEXT NOT NULL,
                topic TEXT NOT NULL DEFAULT 'Unclassified',
                steps_json TEXT NOT NULL DEFAULT '[]',
                final_answer TEXT NOT NULL DEFAULT '',
                confidence REAL NOT NULL DEFAULT 0.9,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_doubts_user_created ON doubts(user_id, created_at)",
            [],
        )?;

        tracing::info!(
            "HistoryStore initialized with schema version {}",
            SCHEMA_VERSION
        );

        Ok(())
    }

    /// Insert a solved question, returning its row id
    pub fn insert(&self, record: &HistoryRecord) -> Result<i64> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let steps_json = serde_json::to_string(&record.solution.steps)?;

        conn.execute(
            r#"
            INSERT INTO doubts
                (user_id, query_type, query_text, subject, topic,
                 steps_json, final_answer, confidence, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                record.user_id,
                record.query_type,
                record.query_text,
                record.subject.as_str(),
                record.topic,
                steps_json,
                record.solution.final_answer,
                record.confidence,
                record.created_at.to_rfc3339(),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Most recent solves for a user, newest first, optionally filtered
    /// by subject
    pub fn recent(
        &self,
        user_id: &str,
        limit: u32,
        subject: Option<Subject>,
    ) -> Result<Vec<HistoryEntry>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let mut sql = String::from(
            "SELECT query_text, subject, final_answer, created_at \
             FROM doubts WHERE user_id = ?1",
        );
        if subject.is_some() {
            sql.push_str(" AND subject = ?2");
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC LIMIT ");
        sql.push_str(&limit.to_string());

        let mut stmt = conn.prepare(&sql)?;

        let map_row = |row: &rusqlite::Row<'_>| {
            Ok(HistoryEntry {
                query_text: row.get(0)?,
                subject: row.get(1)?,
                final_answer: row.get(2)?,
                created_at: row.get(3)?,
            })
        };

        let rows = match subject {
            Some(s) => stmt.query_map(params![user_id, s.as_str()], map_row)?,
            None => stmt.query_map(params![user_id], map_row)?,
        };

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    /// Total rows stored for a user
    pub fn count(&self, user_id: &str) -> Result<i64> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        conn.query_row(
            "SELECT COUNT(*) FROM doubts WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .context("Failed to count history rows")
    }
}
