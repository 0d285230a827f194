// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Invite ledger queries: recording, quota counting, history, and status
//! transitions.
//!
//! Lifecycle transitions only ever move a record out of ACTIVE. EXHAUSTED
//! and DELETED are terminal.

use std::str::FromStr;

use gatepass_core::{GatepassError, InviteStatus};
use rusqlite::{params, Row};

use crate::database::{map_tr_err, Database};
use crate::models::{GlobalStats, InviteLogRecord};

fn row_to_record(row: &Row<'_>) -> Result<InviteLogRecord, rusqlite::Error> {
    let status_text: String = row.get(5)?;
    let status = InviteStatus::from_str(&status_text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(InviteLogRecord {
        id: row.get(0)?,
        owner_sub: row.get(1)?,
        invite_external_id: row.get(2)?,
        created_at: row.get(3)?,
        expires_at: row.get(4)?,
        status,
        group_label: row.get(6)?,
    })
}

const SELECT_COLUMNS: &str =
    "id, owner_sub, invite_external_id, created_at, expires_at, status, group_label";

/// Insert a pre-built record. Exposed so tests can backdate `created_at`.
pub async fn insert(db: &Database, record: &InviteLogRecord) -> Result<(), GatepassError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO invite_ledger \
                 (id, owner_sub, invite_external_id, created_at, expires_at, status, group_label) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.id,
                    record.owner_sub,
                    record.invite_external_id,
                    record.created_at,
                    record.expires_at,
                    record.status.to_string(),
                    record.group_label,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a freshly created invite as ACTIVE and return the new record.
pub async fn log_invite(
    db: &Database,
    owner_sub: &str,
    invite_external_id: &str,
    expires_at: Option<String>,
    group_label: Option<String>,
) -> Result<InviteLogRecord, GatepassError> {
    let record = InviteLogRecord::new(owner_sub, invite_external_id, expires_at, group_label);
    insert(db, &record).await?;
    Ok(record)
}

/// Count ledger entries for an owner, optionally restricted to entries
/// created at or after `since` (ISO 8601 UTC).
///
/// Counts all statuses: revoking or exhausting an invite does not refund
/// quota.
pub async fn count_for_owner(
    db: &Database,
    owner_sub: &str,
    since: Option<&str>,
) -> Result<u64, GatepassError> {
    let owner = owner_sub.to_string();
    let since = since.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let count: i64 = match since {
                Some(since) => conn.query_row(
                    "SELECT COUNT(*) FROM invite_ledger \
                     WHERE owner_sub = ?1 AND created_at >= ?2",
                    params![owner, since],
                    |row| row.get(0),
                )?,
                None => conn.query_row(
                    "SELECT COUNT(*) FROM invite_ledger WHERE owner_sub = ?1",
                    params![owner],
                    |row| row.get(0),
                )?,
            };
            Ok(count as u64)
        })
        .await
        .map_err(map_tr_err)
}

/// An owner's ledger entries, newest first.
pub async fn history(
    db: &Database,
    owner_sub: &str,
    limit: u32,
) -> Result<Vec<InviteLogRecord>, GatepassError> {
    let owner = owner_sub.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM invite_ledger \
                 WHERE owner_sub = ?1 ORDER BY created_at DESC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![owner, limit], row_to_record)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Look up a single ledger entry by id.
pub async fn find(db: &Database, id: &str) -> Result<Option<InviteLogRecord>, GatepassError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM invite_ledger WHERE id = ?1"
            ))?;
            let mut rows = stmt.query_map(params![id], row_to_record)?;
            rows.next().transpose()
        })
        .await
        .map_err(map_tr_err)
}

async fn transition_from_active(
    db: &Database,
    id: &str,
    to: InviteStatus,
) -> Result<bool, GatepassError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE invite_ledger SET status = ?1 WHERE id = ?2 AND status = 'ACTIVE'",
                params![to.to_string(), id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Mark an ACTIVE record EXHAUSTED. Returns false if it was not ACTIVE.
pub async fn mark_exhausted(db: &Database, id: &str) -> Result<bool, GatepassError> {
    transition_from_active(db, id, InviteStatus::Exhausted).await
}

/// Mark an ACTIVE record DELETED. Returns false if it was not ACTIVE.
pub async fn mark_deleted(db: &Database, id: &str) -> Result<bool, GatepassError> {
    transition_from_active(db, id, InviteStatus::Deleted).await
}

/// Purge an owner's ledger entries, resetting their quota usage to zero.
/// Returns the number of purged entries.
pub async fn reset_quota(db: &Database, owner_sub: &str) -> Result<u64, GatepassError> {
    let owner = owner_sub.to_string();
    db.connection()
        .call(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM invite_ledger WHERE owner_sub = ?1",
                params![owner],
            )?;
            Ok(deleted as u64)
        })
        .await
        .map_err(map_tr_err)
}

/// Instance-wide counters. "Today" and "this month" are UTC calendar
/// boundaries, not sliding windows.
pub async fn global_stats(db: &Database) -> Result<GlobalStats, GatepassError> {
    let now = chrono::Utc::now();
    let day_start = now.format("%Y-%m-%dT00:00:00.000Z").to_string();
    let month_start = format!("{}-01T00:00:00.000Z", now.format("%Y-%m"));

    db.connection()
        .call(move |conn| {
            let total_invites: i64 =
                conn.query_row("SELECT COUNT(*) FROM invite_ledger", [], |row| row.get(0))?;
            let unique_users: i64 = conn.query_row(
                "SELECT COUNT(DISTINCT owner_sub) FROM invite_ledger",
                [],
                |row| row.get(0),
            )?;
            let invites_today: i64 = conn.query_row(
                "SELECT COUNT(*) FROM invite_ledger WHERE created_at >= ?1",
                params![day_start],
                |row| row.get(0),
            )?;
            let invites_this_month: i64 = conn.query_row(
                "SELECT COUNT(*) FROM invite_ledger WHERE created_at >= ?1",
                params![month_start],
                |row| row.get(0),
            )?;
            Ok(GlobalStats {
                total_invites: total_invites as u64,
                unique_users: unique_users as u64,
                invites_today: invites_today as u64,
                invites_this_month: invites_this_month as u64,
            })
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn backdated(owner: &str, created_at: &str) -> InviteLogRecord {
        let mut record = InviteLogRecord::new(owner, "pk-1", None, None);
        record.created_at = created_at.to_string();
        record
    }

    #[tokio::test]
    async fn log_and_count() {
        let db = test_db().await;
        ledger_seed(&db, "alice", 3).await;
        ledger_seed(&db, "bob", 1).await;

        assert_eq!(count_for_owner(&db, "alice", None).await.unwrap(), 3);
        assert_eq!(count_for_owner(&db, "bob", None).await.unwrap(), 1);
        assert_eq!(count_for_owner(&db, "carol", None).await.unwrap(), 0);
    }

    async fn ledger_seed(db: &Database, owner: &str, n: usize) {
        for i in 0..n {
            log_invite(db, owner, &format!("pk-{i}"), None, None)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn since_filter_excludes_older_entries() {
        let db = test_db().await;
        insert(&db, &backdated("alice", "2026-01-01T00:00:00.000Z"))
            .await
            .unwrap();
        insert(&db, &backdated("alice", "2026-02-01T00:00:00.000Z"))
            .await
            .unwrap();

        let all = count_for_owner(&db, "alice", None).await.unwrap();
        let recent = count_for_owner(&db, "alice", Some("2026-01-15T00:00:00.000Z"))
            .await
            .unwrap();
        assert_eq!(all, 2);
        assert_eq!(recent, 1);
    }

    #[tokio::test]
    async fn history_is_newest_first_and_limited() {
        let db = test_db().await;
        for day in ["01", "03", "02"] {
            insert(&db, &backdated("alice", &format!("2026-01-{day}T00:00:00.000Z")))
                .await
                .unwrap();
        }

        let rows = history(&db, "alice", 2).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].created_at, "2026-01-03T00:00:00.000Z");
        assert_eq!(rows[1].created_at, "2026-01-02T00:00:00.000Z");
    }

    #[tokio::test]
    async fn exhausted_and_deleted_are_terminal() {
        let db = test_db().await;
        let record = log_invite(&db, "alice", "pk-1", None, None).await.unwrap();

        assert!(mark_exhausted(&db, &record.id).await.unwrap());
        // Already terminal, second transition is a no-op.
        assert!(!mark_deleted(&db, &record.id).await.unwrap());

        let found = find(&db, &record.id).await.unwrap().unwrap();
        assert_eq!(found.status, InviteStatus::Exhausted);
    }

    #[tokio::test]
    async fn revoked_invites_still_count_toward_quota() {
        let db = test_db().await;
        let record = log_invite(&db, "alice", "pk-1", None, None).await.unwrap();
        mark_deleted(&db, &record.id).await.unwrap();

        assert_eq!(count_for_owner(&db, "alice", None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn reset_quota_purges_only_the_owner() {
        let db = test_db().await;
        ledger_seed(&db, "alice", 2).await;
        ledger_seed(&db, "bob", 1).await;

        let purged = reset_quota(&db, "alice").await.unwrap();
        assert_eq!(purged, 2);
        assert_eq!(count_for_owner(&db, "alice", None).await.unwrap(), 0);
        assert_eq!(count_for_owner(&db, "bob", None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn global_stats_counts_calendar_windows() {
        let db = test_db().await;
        ledger_seed(&db, "alice", 2).await;
        ledger_seed(&db, "bob", 1).await;
        insert(&db, &backdated("carol", "2001-01-01T00:00:00.000Z"))
            .await
            .unwrap();

        let stats = global_stats(&db).await.unwrap();
        assert_eq!(stats.total_invites, 4);
        assert_eq!(stats.unique_users, 3);
        assert_eq!(stats.invites_today, 3);
        assert_eq!(stats.invites_this_month, 3);
    }
}
