// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for Gatepass.
//!
//! Two tables back the whole system: `invite_ledger` (every invite ever
//! issued, for quota accounting and history) and `bulk_jobs` (bulk invite
//! job state and progress). A single tokio-rusqlite connection serializes
//! all writes through one background thread.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::{now_iso, Database};
pub use models::{BulkJobRecord, GlobalStats, InviteLogRecord};
