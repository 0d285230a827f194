// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types for the invite ledger and bulk job tables.

use gatepass_core::{InviteStatus, JobStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::now_iso;

/// One issued invite, as recorded in the local ledger.
///
/// The ledger is the source of truth for quota accounting; the external
/// directory only holds the live invitation object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteLogRecord {
    pub id: String,
    pub owner_sub: String,
    pub invite_external_id: String,
    pub created_at: String,
    pub expires_at: Option<String>,
    pub status: InviteStatus,
    pub group_label: Option<String>,
}

impl InviteLogRecord {
    /// A fresh ACTIVE record stamped with the current UTC time.
    pub fn new(
        owner_sub: impl Into<String>,
        invite_external_id: impl Into<String>,
        expires_at: Option<String>,
        group_label: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner_sub: owner_sub.into(),
            invite_external_id: invite_external_id.into(),
            created_at: now_iso(),
            expires_at,
            status: InviteStatus::Active,
            group_label,
        }
    }
}

/// One bulk invite job and its progress counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkJobRecord {
    pub id: String,
    pub creator_sub: String,
    pub status: JobStatus,
    pub total: u32,
    pub processed: u32,
    pub failed: u32,
    pub created_at: String,
    /// JSON summary written at finalization, `None` while the job runs.
    pub result: Option<String>,
}

/// Instance-wide counters for the admin dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalStats {
    pub total_invites: u64,
    pub unique_users: u64,
    pub invites_today: u64,
    pub invites_this_month: u64,
}
