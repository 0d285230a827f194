// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bulk job record queries.
//!
//! State machine: PENDING -> PROCESSING -> COMPLETED | FAILED. Progress
//! counters are updated while a job runs; `result` is written exactly once
//! at finalization.

use std::str::FromStr;

use gatepass_core::{GatepassError, JobStatus};
use rusqlite::{params, Row};
use uuid::Uuid;

use crate::database::{map_tr_err, now_iso, Database};
use crate::models::BulkJobRecord;

fn row_to_job(row: &Row<'_>) -> Result<BulkJobRecord, rusqlite::Error> {
    let status_text: String = row.get(2)?;
    let status = JobStatus::from_str(&status_text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(BulkJobRecord {
        id: row.get(0)?,
        creator_sub: row.get(1)?,
        status,
        total: row.get(3)?,
        processed: row.get(4)?,
        failed: row.get(5)?,
        created_at: row.get(6)?,
        result: row.get(7)?,
    })
}

const SELECT_COLUMNS: &str =
    "id, creator_sub, status, total, processed, failed, created_at, result";

/// Create a PENDING job with zeroed counters and return its record.
pub async fn create_job(
    db: &Database,
    creator_sub: &str,
    total: u32,
) -> Result<BulkJobRecord, GatepassError> {
    let record = BulkJobRecord {
        id: Uuid::new_v4().to_string(),
        creator_sub: creator_sub.to_string(),
        status: JobStatus::Pending,
        total,
        processed: 0,
        failed: 0,
        created_at: now_iso(),
        result: None,
    };
    let insert = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO bulk_jobs \
                 (id, creator_sub, status, total, processed, failed, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    insert.id,
                    insert.creator_sub,
                    insert.status.to_string(),
                    insert.total,
                    insert.processed,
                    insert.failed,
                    insert.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    Ok(record)
}

/// Move a PENDING job to PROCESSING.
pub async fn mark_processing(db: &Database, id: &str) -> Result<(), GatepassError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE bulk_jobs SET status = 'PROCESSING' \
                 WHERE id = ?1 AND status = 'PENDING'",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Persist intermediate progress counters for a running job.
pub async fn update_progress(
    db: &Database,
    id: &str,
    processed: u32,
    failed: u32,
) -> Result<(), GatepassError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE bulk_jobs SET processed = ?1, failed = ?2 WHERE id = ?3",
                params![processed, failed, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Write the terminal status, final counters, and result summary.
pub async fn finalize(
    db: &Database,
    id: &str,
    status: JobStatus,
    processed: u32,
    failed: u32,
    result: Option<String>,
) -> Result<(), GatepassError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE bulk_jobs \
                 SET status = ?1, processed = ?2, failed = ?3, result = ?4 \
                 WHERE id = ?5",
                params![status.to_string(), processed, failed, result, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Mark a job FAILED after a system-level error, writing the result summary
/// but leaving the last persisted progress counters in place.
pub async fn mark_failed(
    db: &Database,
    id: &str,
    result: Option<String>,
) -> Result<(), GatepassError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE bulk_jobs SET status = 'FAILED', result = ?1 WHERE id = ?2",
                params![result, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Look up a job by id.
pub async fn get_job(db: &Database, id: &str) -> Result<Option<BulkJobRecord>, GatepassError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {SELECT_COLUMNS} FROM bulk_jobs WHERE id = ?1"))?;
            let mut rows = stmt.query_map(params![id], row_to_job)?;
            rows.next().transpose()
        })
        .await
        .map_err(map_tr_err)
}

/// A creator's jobs, newest first.
pub async fn history_for_creator(
    db: &Database,
    creator_sub: &str,
    limit: u32,
) -> Result<Vec<BulkJobRecord>, GatepassError> {
    let creator = creator_sub.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM bulk_jobs \
                 WHERE creator_sub = ?1 ORDER BY created_at DESC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![creator, limit], row_to_job)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}
