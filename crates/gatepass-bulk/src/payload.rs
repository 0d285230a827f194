// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bulk job payload.
//!
//! The runner has no request context, so everything it needs about the
//! creator is captured at submission time.

use gatepass_core::duration::DurationToken;
use serde::{Deserialize, Serialize};

/// Everything a bulk job needs to run detached from the submitting request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkJobPayload {
    pub recipients: Vec<String>,
    /// Message template; placeholders are substituted per invite.
    pub message: String,
    pub expiry: DurationToken,
    /// One invite per recipient when true, a single shared link otherwise.
    pub single_use: bool,
    /// Grouping names selected by the creator, expanded against their policy.
    #[serde(default)]
    pub invite_groupings: Vec<String>,
    pub creator_sub: String,
    pub creator_username: String,
    #[serde(default)]
    pub creator_display_name: Option<String>,
    /// The creator's group memberships at submission time. Policy is
    /// re-resolved from these, not from a live session.
    #[serde(default)]
    pub creator_groups: Vec<String>,
}

impl BulkJobPayload {
    /// Display name used as `{{inviter_username}}` in outbound mail.
    pub fn inviter_name(&self) -> &str {
        match &self.creator_display_name {
            Some(name) if !name.is_empty() => name,
            _ if !self.creator_username.is_empty() => &self.creator_username,
            _ => "A user",
        }
    }
}
