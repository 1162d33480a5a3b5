// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional connections for writes.

use recall_core::RecallError;
use tracing::{debug, info};

use crate::migrations;

/// Handle to the single SQLite connection.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs, and run
    /// pending migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, RecallError> {
        if let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| RecallError::Storage {
                source: Box::new(e),
            })?;
        }

        // Migrations run on a short-lived synchronous connection so the
        // refinery runner owns `&mut rusqlite::Connection` directly.
        let migrate_path = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), RecallError> {
            let mut conn = rusqlite::Connection::open(&migrate_path).map_err(sqlite_err)?;
            apply_pragmas(&conn, wal_mode).map_err(sqlite_err)?;
            migrations::run_migrations(&mut conn)
        })
        .await
        .map_err(|e| RecallError::Internal(format!("migration task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| storage_msg(format!("failed to open {path}: {e}")))?;
        conn.call(move |conn| -> Result<(), rusqlite::Error> { apply_pragmas(conn, wal_mode) })
            .await
            .map_err(map_tr_err)?;

        info!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The underlying async connection. Query modules call through this.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL so the main database file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), RecallError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

fn apply_pragmas(conn: &rusqlite::Connection, wal_mode: bool) -> Result<(), rusqlite::Error> {
    if wal_mode {
        // journal_mode answers with a row, so it has to go through the checked variant.
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(mode, "journal mode set");
    }
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA synchronous = NORMAL;",
    )
}

/// Map a tokio-rusqlite call error into [`RecallError::Storage`].
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> RecallError {
    storage_msg(e.to_string())
}

pub(crate) fn sqlite_err(e: rusqlite::Error) -> RecallError {
    RecallError::Storage {
        source: Box::new(e),
    }
}

pub(crate) fn storage_msg(message: String) -> RecallError {
    RecallError::Storage {
        source: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_creates_schema() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("recall.db");
        let db = Database::open(path.to_str().expect("utf8"), true)
            .await
            .expect("open");

        let tables: Vec<String> = db
            .connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                )?;
                stmt.query_map([], |row| row.get(0))?.collect()
            })
            .await
            .map_err(map_tr_err)
            .expect("list tables");

        for expected in [
            "categories",
            "channel_links",
            "conversation_sessions",
            "memories",
            "memory_relationships",
            "memory_tags",
            "tags",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing {expected}");
        }
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("recall.db");
        let path = path.to_str().expect("utf8");
        Database::open(path, false).await.expect("first open");
        Database::open(path, false).await.expect("second open");
    }
}
