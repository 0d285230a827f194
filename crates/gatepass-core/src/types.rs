// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the collaborator traits and the Gatepass crates.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::duration::DurationToken;

/// Lifecycle status of one issued invite in the ledger.
///
/// `Active` transitions to `Exhausted` when the upstream invite is observed
/// gone during a history sync, and to `Deleted` when the owner revokes it.
/// Both are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum InviteStatus {
    Active,
    Exhausted,
    Deleted,
}

/// Lifecycle status of a bulk invite job.
///
/// `Pending -> Processing -> {Completed, Failed}`. Terminal states are never
/// left; a failed job is not retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

// --- Directory collaborator types ---

/// An invitation as reported by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    /// Opaque upstream identifier.
    pub pk: String,
    pub name: String,
    /// Upstream expiry timestamp (ISO 8601), if the invite expires.
    #[serde(default)]
    pub expires: Option<String>,
    pub single_use: bool,
    /// Primary key of the enrollment flow the invite targets.
    #[serde(default)]
    pub flow: Option<String>,
}

/// An enrollment flow known to the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowInfo {
    pub pk: String,
    pub slug: String,
    pub name: String,
}

/// A directory user, as surfaced by admin user search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub id: String,
    pub username: String,
    pub name: String,
    pub email: String,
}

/// Parameters for creating an invitation upstream.
#[derive(Debug, Clone)]
pub struct CreateInvitationParams {
    /// Human-readable invite name; slugified before submission.
    pub name: String,
    pub expiry: DurationToken,
    pub single_use: bool,
    /// Flow slug, used to construct the invite URL.
    pub flow_slug: String,
    /// Flow primary key, used in the API payload.
    pub flow_pk: String,
    /// Recorded in the invite's fixed data as `invited_by`.
    pub creator_username: Option<String>,
    /// Expanded directory groups recorded in the invite's fixed data.
    pub invite_groups: Vec<String>,
}

/// A successfully created invitation plus its shareable URL.
#[derive(Debug, Clone)]
pub struct InvitationOutcome {
    pub invitation: Invitation,
    pub invite_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn invite_status_round_trips_as_uppercase() {
        assert_eq!(InviteStatus::Active.to_string(), "ACTIVE");
        assert_eq!(
            InviteStatus::from_str("EXHAUSTED").unwrap(),
            InviteStatus::Exhausted
        );
        let json = serde_json::to_string(&InviteStatus::Deleted).unwrap();
        assert_eq!(json, "\"DELETED\"");
    }

    #[test]
    fn job_status_round_trips_as_uppercase() {
        for status in [
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            let parsed = JobStatus::from_str(&status.to_string()).unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn invitation_deserializes_with_optional_fields() {
        let json = r#"{"pk":"abc","name":"invite-for-a","single_use":true}"#;
        let inv: Invitation = serde_json::from_str(json).unwrap();
        assert!(inv.expires.is_none());
        assert!(inv.flow.is_none());
    }
}
