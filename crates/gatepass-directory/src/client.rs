// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the identity provider.
//!
//! Provides [`DirectoryClient`] which handles request construction, bearer
//! authentication, and the provider's error body shapes. The provider's
//! field names (`pk`, `single_use`, `fixed_data`, `itoken`) are confined to
//! this crate.

use std::time::Duration;

use async_trait::async_trait;
use gatepass_core::types::{
    CreateInvitationParams, DirectoryUser, FlowInfo, Invitation, InvitationOutcome,
};
use gatepass_core::{DirectoryApi, GatepassError};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::types::{CreateInvitationRequest, FixedData, FlowWire, Paginated, UserWire};

/// HTTP client for the identity provider's invitation, flow, and user APIs.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    client: reqwest::Client,
    base_url: String,
}

impl DirectoryClient {
    /// Creates a client for the provider at `api_url`, authenticating every
    /// request with `api_token`.
    pub fn new(api_url: &str, api_token: &str) -> Result<Self, GatepassError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_token}")).map_err(|e| {
            GatepassError::Config(format!("invalid API token header value: {e}"))
        })?;
        auth.set_sensitive(true);
        headers.insert("authorization", auth);
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| GatepassError::Directory {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, GatepassError> {
        request.send().await.map_err(|e| GatepassError::Directory {
            message: format!("HTTP request failed: {e}"),
            source: Some(Box::new(e)),
        })
    }

    /// Reads an error response body and extracts the provider's message.
    async fn error_from(response: reqwest::Response) -> GatepassError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        GatepassError::Directory {
            message: extract_error_message(status, &body),
            source: None,
        }
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GatepassError> {
        let body = response.text().await.map_err(|e| GatepassError::Directory {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;
        serde_json::from_str(&body).map_err(|e| GatepassError::Directory {
            message: format!("failed to parse provider response: {e}"),
            source: Some(Box::new(e)),
        })
    }
}

#[async_trait]
impl DirectoryApi for DirectoryClient {
    async fn create_invitation(
        &self,
        params: CreateInvitationParams,
    ) -> Result<InvitationOutcome, GatepassError> {
        let expires = params.expiry.millis().map(|ms| {
            (chrono::Utc::now() + chrono::Duration::milliseconds(ms as i64))
                .format("%Y-%m-%dT%H:%M:%S%.3fZ")
                .to_string()
        });

        let fixed_data = if params.creator_username.is_some() || !params.invite_groups.is_empty() {
            Some(FixedData {
                invited_by: params.creator_username.clone(),
                invite_groups: if params.invite_groups.is_empty() {
                    None
                } else {
                    Some(params.invite_groups.clone())
                },
            })
        } else {
            None
        };

        let body = CreateInvitationRequest {
            name: slugify(&params.name),
            expires,
            single_use: params.single_use,
            flow: params.flow_pk.clone(),
            fixed_data,
        };

        let response = self
            .send(
                self.client
                    .post(self.url("/api/v3/stages/invitation/invitations/"))
                    .json(&body),
            )
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let invitation: Invitation = Self::parse(response).await?;
        let invite_url = format!(
            "{}/if/flow/{}/?itoken={}",
            self.base_url, params.flow_slug, invitation.pk
        );
        debug!(pk = %invitation.pk, "invitation created");

        Ok(InvitationOutcome {
            invitation,
            invite_url,
        })
    }

    async fn get_invitation(&self, pk: &str) -> Result<Option<Invitation>, GatepassError> {
        let response = self
            .send(
                self.client
                    .get(self.url(&format!("/api/v3/stages/invitation/invitations/{pk}/"))),
            )
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(Self::parse(response).await?)),
            _ => Err(Self::error_from(response).await),
        }
    }

    async fn delete_invitation(&self, pk: &str) -> Result<bool, GatepassError> {
        let response = self
            .send(
                self.client
                    .delete(self.url(&format!("/api/v3/stages/invitation/invitations/{pk}/"))),
            )
            .await?;
        if response.status().is_success() {
            Ok(true)
        } else {
            let err = Self::error_from(response).await;
            warn!(pk, error = %err, "invitation delete rejected");
            Ok(false)
        }
    }

    async fn get_flow(&self, slug: &str) -> Result<Option<FlowInfo>, GatepassError> {
        let response = self
            .send(
                self.client
                    .get(self.url("/api/v3/flows/instances/"))
                    .query(&[("slug", slug)]),
            )
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        let page: Paginated<FlowWire> = Self::parse(response).await?;
        Ok(page.results.into_iter().next().map(|flow| FlowInfo {
            name: flow.display_name(),
            pk: flow.pk,
            slug: flow.slug,
        }))
    }

    async fn list_flows(&self) -> Result<Vec<FlowInfo>, GatepassError> {
        let response = self
            .send(
                self.client
                    .get(self.url("/api/v3/flows/instances/"))
                    .query(&[("designation", "enrollment")]),
            )
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        let page: Paginated<FlowWire> = Self::parse(response).await?;
        Ok(page
            .results
            .into_iter()
            .map(|flow| FlowInfo {
                name: flow.display_name(),
                pk: flow.pk,
                slug: flow.slug,
            })
            .collect())
    }

    async fn search_users(&self, query: &str) -> Result<Vec<DirectoryUser>, GatepassError> {
        let response = self
            .send(
                self.client
                    .get(self.url("/api/v3/core/users/"))
                    .query(&[("search", query), ("ordering", "username"), ("page_size", "10")]),
            )
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        let page: Paginated<UserWire> = Self::parse(response).await?;
        Ok(page
            .results
            .into_iter()
            .map(|user| DirectoryUser {
                id: user.pk.to_string(),
                username: user.username,
                name: user.name,
                email: user.email,
            })
            .collect())
    }

    async fn get_user(&self, id: &str) -> Result<Option<DirectoryUser>, GatepassError> {
        let response = self
            .send(self.client.get(self.url(&format!("/api/v3/core/users/{id}/"))))
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let user: UserWire = Self::parse(response).await?;
                Ok(Some(DirectoryUser {
                    id: user.pk.to_string(),
                    username: user.username,
                    name: user.name,
                    email: user.email,
                }))
            }
            _ => Err(Self::error_from(response).await),
        }
    }
}

/// Turn a display name into a provider-safe slug: lowercase alphanumerics
/// and hyphens, at most 50 characters. Empty input gets a timestamped
/// fallback.
pub fn slugify(name: &str) -> String {
    let mut slug = String::new();
    let mut last_hyphen = true;
    for c in name.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_hyphen = false;
        } else if (c.is_whitespace() || c == '-') && !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
    }
    let slug: String = slug.trim_end_matches('-').chars().take(50).collect();
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        format!("invite-{}", chrono::Utc::now().timestamp_millis())
    } else {
        slug
    }
}

/// Extracts a human-readable message from the provider's error body.
///
/// Precedence: `detail`, then `non_field_errors`, then field-keyed error
/// lists, then the raw status and body.
fn extract_error_message(status: StatusCode, body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return format!("provider returned {status}: {body}");
    };
    let Some(map) = value.as_object() else {
        return format!("provider returned {status}: {body}");
    };

    if let Some(detail) = map.get("detail").and_then(|v| v.as_str()) {
        return detail.to_string();
    }

    if let Some(errors) = map.get("non_field_errors").and_then(|v| v.as_array()) {
        let joined: Vec<&str> = errors.iter().filter_map(|e| e.as_str()).collect();
        if !joined.is_empty() {
            return joined.join(", ");
        }
    }

    let field_errors: Vec<String> = map
        .iter()
        .filter(|(key, _)| key.as_str() != "detail" && key.as_str() != "non_field_errors")
        .map(|(key, value)| match value.as_array() {
            Some(items) => {
                let msgs: Vec<&str> = items.iter().filter_map(|i| i.as_str()).collect();
                format!("{key}: {}", msgs.join(", "))
            }
            None => format!("{key}: {value}"),
        })
        .collect();
    if !field_errors.is_empty() {
        return field_errors.join("; ");
    }

    format!("provider returned {status}: {body}")
}
