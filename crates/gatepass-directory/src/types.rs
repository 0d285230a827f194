// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the identity provider's REST API.

use serde::{Deserialize, Serialize};

/// Request body for creating an invitation.
#[derive(Debug, Clone, Serialize)]
pub struct CreateInvitationRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
    pub single_use: bool,
    /// Flow primary key, not slug.
    pub flow: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_data: Option<FixedData>,
}

/// Data stamped onto every account enrolled through the invite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invited_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_groups: Option<Vec<String>>,
}

/// Paginated list envelope used by every list endpoint.
#[derive(Debug, Deserialize)]
pub struct Paginated<T> {
    pub results: Vec<T>,
}

/// A flow as reported by the provider. `name` and `title` are both optional
/// in practice; display falls back to the slug.
#[derive(Debug, Deserialize)]
pub struct FlowWire {
    pub pk: String,
    pub slug: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl FlowWire {
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .filter(|n| !n.is_empty())
            .or_else(|| self.title.clone().filter(|t| !t.is_empty()))
            .unwrap_or_else(|| self.slug.clone())
    }
}

/// A directory user row. The numeric pk is stringified at the boundary.
#[derive(Debug, Deserialize)]
pub struct UserWire {
    pub pk: i64,
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_omits_absent_fields() {
        let req = CreateInvitationRequest {
            name: "invite-for-alice".into(),
            expires: None,
            single_use: true,
            flow: "flow-pk".into(),
            fixed_data: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("expires"));
        assert!(!json.contains("fixed_data"));
    }

    #[test]
    fn flow_display_name_falls_back_to_title_then_slug() {
        let flow: FlowWire = serde_json::from_str(
            r#"{"pk":"1","slug":"enroll","name":"","title":"Enrollment"}"#,
        )
        .unwrap();
        assert_eq!(flow.display_name(), "Enrollment");

        let bare: FlowWire = serde_json::from_str(r#"{"pk":"1","slug":"enroll"}"#).unwrap();
        assert_eq!(bare.display_name(), "enroll");
    }
}
