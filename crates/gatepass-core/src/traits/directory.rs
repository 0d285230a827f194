// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity-provider collaborator trait.

use async_trait::async_trait;

use crate::error::GatepassError;
use crate::types::{
    CreateInvitationParams, DirectoryUser, FlowInfo, Invitation, InvitationOutcome,
};

/// Client for the external identity provider's invitation, flow, and user APIs.
///
/// Lookup methods return `Ok(None)` when the resource is gone upstream; only
/// transport-level problems and rejected mutations surface as errors.
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    /// Creates a single- or multi-use invitation upstream.
    async fn create_invitation(
        &self,
        params: CreateInvitationParams,
    ) -> Result<InvitationOutcome, GatepassError>;

    /// Fetches an invitation by upstream id. `None` if it no longer exists.
    async fn get_invitation(&self, pk: &str) -> Result<Option<Invitation>, GatepassError>;

    /// Deletes an invitation upstream. Returns `false` if the delete was rejected.
    async fn delete_invitation(&self, pk: &str) -> Result<bool, GatepassError>;

    /// Resolves an enrollment flow by slug. `None` if no such flow exists.
    async fn get_flow(&self, slug: &str) -> Result<Option<FlowInfo>, GatepassError>;

    /// Lists enrollment flows (pk <-> slug mapping for URL reconstruction).
    async fn list_flows(&self) -> Result<Vec<FlowInfo>, GatepassError>;

    /// Searches directory users by free-text query.
    async fn search_users(&self, query: &str) -> Result<Vec<DirectoryUser>, GatepassError>;

    /// Fetches a single directory user by id.
    async fn get_user(&self, id: &str) -> Result<Option<DirectoryUser>, GatepassError>;
}
