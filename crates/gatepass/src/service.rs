// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Application service facade.
//!
//! [`InviteService`] wires the policy resolver, quota accountant, ledger,
//! directory client, mailer, and bulk runner behind one API. Collaborators
//! are injected explicitly; nothing here reaches for globals.

use std::collections::HashMap;
use std::sync::Arc;

use gatepass_bulk::{BulkJobPayload, BulkJobRunner};
use gatepass_core::duration::DurationToken;
use gatepass_core::types::{CreateInvitationParams, DirectoryUser, FlowInfo};
use gatepass_core::{DirectoryApi, GatepassError, InviteStatus, Mailer};
use gatepass_policy::{PolicyResolver, QuotaAccountant, QuotaStatus, ResolvedPolicy};
use gatepass_storage::queries::{jobs, ledger};
use gatepass_storage::{BulkJobRecord, Database, GlobalStats, InviteLogRecord};
use serde::Serialize;
use tracing::{info, warn};

/// The caller, as asserted by the upstream auth layer.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Stable subject identifier; the ledger's `owner_sub`.
    pub sub: String,
    pub username: String,
    pub display_name: Option<String>,
    pub groups: Vec<String>,
}

/// Parameters for a synchronous single-invite creation.
#[derive(Debug, Clone)]
pub struct CreateInviteRequest {
    pub name: String,
    pub expiry: DurationToken,
    pub single_use: bool,
    pub groupings: Vec<String>,
    pub email_recipient: Option<String>,
    pub email_message: Option<String>,
}

/// A successfully issued invite.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedInvite {
    pub invite_id: String,
    pub invite_url: String,
    pub record_id: String,
    /// `None` when no delivery was requested.
    pub email_sent: Option<bool>,
}

/// Parameters for a bulk invite submission.
#[derive(Debug, Clone)]
pub struct BulkInviteRequest {
    pub recipients: Vec<String>,
    pub message: String,
    pub expiry: DurationToken,
    pub single_use: bool,
    pub groupings: Vec<String>,
}

/// One history row, with its invite URL rebuilt when still live upstream.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub record: InviteLogRecord,
    pub invite_url: Option<String>,
}

/// Everything the quota endpoint reports about the caller.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyOverview {
    pub quota: QuotaStatus,
    pub source_group: Option<String>,
    pub allow_multi_use: bool,
    pub expiry_options: Vec<ExpiryOption>,
    pub groupings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpiryOption {
    pub value: DurationToken,
    pub label: &'static str,
}

/// Service facade over all Gatepass operations.
pub struct InviteService {
    db: Database,
    resolver: PolicyResolver,
    accountant: QuotaAccountant,
    directory: Arc<dyn DirectoryApi>,
    mailer: Arc<dyn Mailer>,
    runner: Arc<BulkJobRunner>,
    flow_slug: String,
    app_name: String,
    admin_group: String,
    /// Provider base URL, used to rebuild invite links for history rows.
    directory_base_url: String,
}

impl InviteService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Database,
        resolver: PolicyResolver,
        directory: Arc<dyn DirectoryApi>,
        mailer: Arc<dyn Mailer>,
        runner: Arc<BulkJobRunner>,
        flow_slug: String,
        app_name: String,
        admin_group: String,
        directory_base_url: String,
    ) -> Self {
        let accountant = QuotaAccountant::new(db.clone());
        Self {
            db,
            resolver,
            accountant,
            directory,
            mailer,
            runner,
            flow_slug,
            app_name,
            admin_group,
            directory_base_url: directory_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// The caller's effective policy.
    pub fn resolve_policy(&self, identity: &Identity) -> ResolvedPolicy {
        self.resolver.resolve(&identity.groups)
    }

    /// Quota status plus the policy-derived options the caller may pick from.
    pub async fn policy_overview(
        &self,
        identity: &Identity,
    ) -> Result<PolicyOverview, GatepassError> {
        let policy = self.resolve_policy(identity);
        let quota = self.accountant.status(&identity.sub, &policy.quota).await?;
        Ok(PolicyOverview {
            quota,
            allow_multi_use: policy.invite.allow_multi_use,
            expiry_options: policy
                .expiry_options()
                .into_iter()
                .map(|value| ExpiryOption {
                    value,
                    label: value.label(),
                })
                .collect(),
            groupings: policy
                .invite
                .allowed_groupings
                .iter()
                .map(|g| g.name.clone())
                .collect(),
            source_group: policy.source_group,
        })
    }

    /// Issue one invite synchronously: policy check, quota admission,
    /// upstream create, ledger record, optional delivery.
    pub async fn create_invite(
        &self,
        identity: &Identity,
        request: CreateInviteRequest,
    ) -> Result<CreatedInvite, GatepassError> {
        let policy = self.resolve_policy(identity);
        self.check_invite_rules(&policy, request.expiry, request.single_use, &request.groupings)?;
        self.accountant
            .check_admission(&identity.sub, &policy.quota, 1)
            .await?;

        let flow = self.require_flow().await?;
        let expanded = policy.expand_groupings(&request.groupings);

        let outcome = self
            .directory
            .create_invitation(CreateInvitationParams {
                name: request.name,
                expiry: request.expiry,
                single_use: request.single_use,
                flow_slug: flow.slug.clone(),
                flow_pk: flow.pk.clone(),
                creator_username: Some(identity.username.clone()),
                invite_groups: expanded,
            })
            .await?;

        let record = ledger::log_invite(
            &self.db,
            &identity.sub,
            &outcome.invitation.pk,
            outcome.invitation.expires.clone(),
            group_label(&request.groupings),
        )
        .await?;
        info!(
            owner = %identity.sub,
            invite = %outcome.invitation.pk,
            single_use = request.single_use,
            "invite created"
        );

        let email_sent = match &request.email_recipient {
            None => None,
            Some(recipient) => {
                let template = request
                    .email_message
                    .as_deref()
                    .unwrap_or("{{inviter_username}} has invited you to join: {{invite_url}}");
                let body = gatepass_email::template::render(
                    template,
                    &gatepass_email::TemplateVariables {
                        inviter_username: identity
                            .display_name
                            .clone()
                            .unwrap_or_else(|| identity.username.clone()),
                        expiration_date: outcome
                            .invitation
                            .expires
                            .clone()
                            .unwrap_or_else(|| "Never".to_string()),
                        invite_url: outcome.invite_url.clone(),
                    },
                );
                let subject = format!("Invitation to join {}", self.app_name);
                match self.mailer.send(recipient, &subject, &body).await {
                    Ok(sent) => Some(sent),
                    Err(err) => {
                        // The invite exists and is logged; delivery failure
                        // is reported, not fatal.
                        warn!(recipient = %recipient, error = %err, "invite email failed");
                        Some(false)
                    }
                }
            }
        };

        Ok(CreatedInvite {
            invite_id: outcome.invitation.pk,
            invite_url: outcome.invite_url,
            record_id: record.id,
            email_sent,
        })
    }

    /// The caller's invite history, newest first, synced against upstream.
    ///
    /// ACTIVE rows whose upstream invitation is gone are marked EXHAUSTED
    /// (a single-use link was consumed, or it was removed out-of-band).
    pub async fn history(
        &self,
        identity: &Identity,
        limit: u32,
    ) -> Result<Vec<HistoryEntry>, GatepassError> {
        let records = ledger::history(&self.db, &identity.sub, limit).await?;

        // pk -> slug, for rebuilding links of invites that target other flows.
        let slug_by_pk: HashMap<String, String> = match self.directory.list_flows().await {
            Ok(flows) => flows.into_iter().map(|f| (f.pk, f.slug)).collect(),
            Err(err) => {
                warn!(error = %err, "flow listing failed, history links degraded");
                HashMap::new()
            }
        };

        let mut entries = Vec::with_capacity(records.len());
        for mut record in records {
            let mut invite_url = None;
            if record.status == InviteStatus::Active {
                match self.directory.get_invitation(&record.invite_external_id).await {
                    Ok(Some(invitation)) => {
                        let slug = invitation
                            .flow
                            .as_ref()
                            .and_then(|pk| slug_by_pk.get(pk))
                            .map(String::as_str)
                            .unwrap_or(&self.flow_slug);
                        invite_url = Some(format!(
                            "{}/if/flow/{}/?itoken={}",
                            self.directory_base_url, slug, record.invite_external_id
                        ));
                    }
                    Ok(None) => {
                        ledger::mark_exhausted(&self.db, &record.id).await?;
                        record.status = InviteStatus::Exhausted;
                    }
                    Err(err) => {
                        warn!(invite = %record.invite_external_id, error = %err,
                            "upstream check failed, leaving record untouched");
                    }
                }
            }
            entries.push(HistoryEntry { record, invite_url });
        }
        Ok(entries)
    }

    /// Revoke one of the caller's invites: upstream delete plus DELETED mark.
    pub async fn revoke_invite(
        &self,
        identity: &Identity,
        record_id: &str,
    ) -> Result<(), GatepassError> {
        let record = ledger::find(&self.db, record_id)
            .await?
            .ok_or_else(|| GatepassError::NotFound {
                what: format!("invite {record_id}"),
            })?;
        if record.owner_sub != identity.sub {
            return Err(GatepassError::NotPermitted {
                message: "invite belongs to another user".to_string(),
            });
        }

        let deleted_upstream = self
            .directory
            .delete_invitation(&record.invite_external_id)
            .await?;
        if !deleted_upstream {
            warn!(invite = %record.invite_external_id, "upstream delete rejected, marking locally");
        }
        ledger::mark_deleted(&self.db, &record.id).await?;
        info!(owner = %identity.sub, invite = %record.invite_external_id, "invite revoked");
        Ok(())
    }

    /// Admit and enqueue a bulk job; the runner takes over on a detached task.
    pub async fn submit_bulk(
        &self,
        identity: &Identity,
        request: BulkInviteRequest,
    ) -> Result<BulkJobRecord, GatepassError> {
        let policy = self.resolve_policy(identity);
        self.check_invite_rules(&policy, request.expiry, request.single_use, &request.groupings)?;

        // Single-use needs one invite per recipient; a shared link needs one.
        let required = if request.single_use {
            request.recipients.len() as u64
        } else {
            1
        };
        self.accountant
            .check_admission(&identity.sub, &policy.quota, required)
            .await?;

        let job = jobs::create_job(&self.db, &identity.sub, request.recipients.len() as u32).await?;
        let payload = BulkJobPayload {
            recipients: request.recipients,
            message: request.message,
            expiry: request.expiry,
            single_use: request.single_use,
            invite_groupings: request.groupings,
            creator_sub: identity.sub.clone(),
            creator_username: identity.username.clone(),
            creator_display_name: identity.display_name.clone(),
            creator_groups: identity.groups.clone(),
        };
        self.runner.spawn(job.id.clone(), payload);
        info!(job_id = %job.id, total = job.total, "bulk job submitted");
        Ok(job)
    }

    /// A bulk job's current state. Scoped to its creator.
    pub async fn job_status(
        &self,
        identity: &Identity,
        job_id: &str,
    ) -> Result<BulkJobRecord, GatepassError> {
        let job = jobs::get_job(&self.db, job_id)
            .await?
            .filter(|job| job.creator_sub == identity.sub)
            .ok_or_else(|| GatepassError::NotFound {
                what: format!("bulk job {job_id}"),
            })?;
        Ok(job)
    }

    /// The caller's bulk jobs, newest first.
    pub async fn bulk_history(
        &self,
        identity: &Identity,
        limit: u32,
    ) -> Result<Vec<BulkJobRecord>, GatepassError> {
        jobs::history_for_creator(&self.db, &identity.sub, limit).await
    }

    /// Enrollment flows available upstream.
    pub async fn flows(&self) -> Result<Vec<FlowInfo>, GatepassError> {
        self.directory.list_flows().await
    }

    // --- Admin operations ---

    fn require_admin(&self, identity: &Identity) -> Result<(), GatepassError> {
        if identity.groups.iter().any(|g| g == &self.admin_group) {
            Ok(())
        } else {
            Err(GatepassError::NotPermitted {
                message: "admin privileges required".to_string(),
            })
        }
    }

    /// Purge a user's ledger, resetting their quota. Returns purged count.
    pub async fn reset_quota(
        &self,
        identity: &Identity,
        target_sub: &str,
    ) -> Result<u64, GatepassError> {
        self.require_admin(identity)?;
        let purged = ledger::reset_quota(&self.db, target_sub).await?;
        info!(admin = %identity.sub, target = %target_sub, purged, "quota reset");
        Ok(purged)
    }

    /// Instance-wide invite counters.
    pub async fn global_stats(&self, identity: &Identity) -> Result<GlobalStats, GatepassError> {
        self.require_admin(identity)?;
        ledger::global_stats(&self.db).await
    }

    /// Directory user search for the admin quota-reset picker.
    pub async fn search_users(
        &self,
        identity: &Identity,
        query: &str,
    ) -> Result<Vec<DirectoryUser>, GatepassError> {
        self.require_admin(identity)?;
        self.directory.search_users(query).await
    }

    // --- Internals ---

    fn check_invite_rules(
        &self,
        policy: &ResolvedPolicy,
        expiry: DurationToken,
        single_use: bool,
        groupings: &[String],
    ) -> Result<(), GatepassError> {
        if !single_use && !policy.invite.allow_multi_use {
            return Err(GatepassError::NotPermitted {
                message: "multi-use invites are not allowed for your account".to_string(),
            });
        }
        if !policy.is_expiry_allowed(expiry) {
            return Err(GatepassError::NotPermitted {
                message: format!("expiry {expiry} exceeds your policy's maximum"),
            });
        }
        for name in groupings {
            if !policy.is_grouping_allowed(name) {
                return Err(GatepassError::NotPermitted {
                    message: format!("grouping {name:?} is not allowed for your account"),
                });
            }
        }
        Ok(())
    }

    async fn require_flow(&self) -> Result<FlowInfo, GatepassError> {
        self.directory
            .get_flow(&self.flow_slug)
            .await?
            .ok_or_else(|| GatepassError::Directory {
                message: format!("enrollment flow {:?} not found", self.flow_slug),
                source: None,
            })
    }
}

fn group_label(groupings: &[String]) -> Option<String> {
    if groupings.is_empty() {
        None
    } else {
        Some(groupings.join(", "))
    }
}
