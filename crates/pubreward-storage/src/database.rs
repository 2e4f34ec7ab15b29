// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use pubreward_core::PubrewardError;
use tracing::debug;

/// Convert a tokio-rusqlite error into a persistence error.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> PubrewardError {
    PubrewardError::persistence(e)
}

/// Handle to the single SQLite writer connection.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path` in WAL mode and run migrations.
    pub async fn open(path: &str) -> Result<Self, PubrewardError> {
        Self::open_with(path, true).await
    }

    /// Open the database, choosing the journal mode explicitly.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, PubrewardError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(PubrewardError::persistence)?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(PubrewardError::persistence)?;

        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            let journal = if wal_mode { "WAL" } else { "DELETE" };
            let _mode: String =
                conn.pragma_update_and_check(None, "journal_mode", journal, |row| row.get(0))?;
            conn.execute_batch("PRAGMA synchronous = NORMAL; PRAGMA foreign_keys = ON;")?;
            conn.busy_timeout(std::time::Duration::from_secs(5))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| Ok::<_, rusqlite::Error>(crate::migrations::run_migrations(conn)))
            .await
            .map_err(map_tr_err)??;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// Run `f` on the writer thread and map its error.
    pub async fn call<F, R>(&self, f: F) -> Result<R, PubrewardError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<R, rusqlite::Error> + Send + 'static,
        R: Send + 'static,
    {
        self.conn.call(f).await.map_err(map_tr_err)
    }

    /// Flush the WAL into the main database file.
    pub async fn checkpoint_wal(&self) -> Result<(), PubrewardError> {
        self.call(|conn| conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_schema_and_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/dir/pub.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        assert!(path.exists());

        let tables: Vec<String> = db
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' \
                     AND name NOT LIKE 'sqlite_%' AND name NOT LIKE 'refinery_%' ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect()
            })
            .await
            .unwrap();
        assert_eq!(
            tables,
            vec![
                "blacklist",
                "checkpoint",
                "given_like_tallies",
                "like_tallies",
                "message_records",
                "profiles",
                "registration_bonus",
                "sensitive_word_records",
                "user_tasks",
                "violations",
            ]
        );
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pub.db");
        let path = path.to_str().unwrap();
        drop(Database::open(path).await.unwrap());
        let db = Database::open(path).await.unwrap();
        db.checkpoint_wal().await.unwrap();
    }

    #[tokio::test]
    async fn wal_mode_is_applied() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wal.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        let mode: String = db
            .call(|conn| conn.pragma_query_value(None, "journal_mode", |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }
}
