// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schema migrations, versioned via `PRAGMA user_version`.

use rusqlite::Connection;

/// Apply any pending migrations. Safe to call on every open.
pub fn run(conn: &mut Connection) -> Result<(), rusqlite::Error> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if version < 1 {
        conn.execute_batch(
            "BEGIN;
            CREATE TABLE invite_ledger (
                id TEXT PRIMARY KEY NOT NULL,
                owner_sub TEXT NOT NULL,
                invite_external_id TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                expires_at TEXT,
                status TEXT NOT NULL DEFAULT 'ACTIVE',
                group_label TEXT
            );
            CREATE INDEX idx_invite_ledger_owner_created
                ON invite_ledger(owner_sub, created_at);

            CREATE TABLE bulk_jobs (
                id TEXT PRIMARY KEY NOT NULL,
                creator_sub TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'PENDING',
                total INTEGER NOT NULL DEFAULT 0,
                processed INTEGER NOT NULL DEFAULT 0,
                failed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                result TEXT
            );
            CREATE INDEX idx_bulk_jobs_creator ON bulk_jobs(creator_sub);

            PRAGMA user_version = 1;
            COMMIT;",
        )?;
    }

    Ok(())
}
