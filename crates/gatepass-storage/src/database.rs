// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and migrations.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use gatepass_core::GatepassError;
use tracing::info;

use crate::migrations;

/// Convert a tokio-rusqlite error into `GatepassError::Storage`.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> GatepassError {
    GatepassError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the Gatepass SQLite database.
///
/// Wraps a single tokio-rusqlite connection with WAL mode and the schema
/// migrations applied. Clone-cheap via the inner connection handle.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply pragmas and migrations.
    pub async fn open(path: &str) -> Result<Self, GatepassError> {
        Self::open_with_options(path, true).await
    }

    /// Open with explicit WAL control (WAL is pointless for `:memory:`).
    pub async fn open_with_options(path: &str, wal_mode: bool) -> Result<Self, GatepassError> {
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| GatepassError::Storage {
                source: Box::new(e),
            })?;
        Self::initialize(conn, wal_mode).await
    }

    /// Open an in-memory database with migrations applied. Test fixture.
    pub async fn open_in_memory() -> Result<Self, GatepassError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| GatepassError::Storage {
                source: Box::new(e),
            })?;
        Self::initialize(conn, false).await
    }

    async fn initialize(
        conn: tokio_rusqlite::Connection,
        wal_mode: bool,
    ) -> Result<Self, GatepassError> {
        conn.call(move |conn| {
            if wal_mode {
                conn.pragma_update(None, "journal_mode", "WAL")?;
            }
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            migrations::run(conn)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        info!("database opened and migrated");
        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Close the connection, flushing pending writes.
    pub async fn close(self) -> Result<(), GatepassError> {
        self.conn.close().await.map_err(|e| GatepassError::Storage {
            source: Box::new(e),
        })
    }
}

/// Current UTC instant in the ledger's ISO 8601 text format.
pub fn now_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();

        let count: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' \
                     AND name IN ('invite_ledger', 'bulk_jobs')",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(count, 2);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();

        // Re-opening an already-migrated database must not fail.
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();
    }

    #[test]
    fn now_iso_format() {
        let ts = now_iso();
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), "2026-01-01T00:00:00.000Z".len());
    }
}
