// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background bulk invite job runner.
//!
//! A job runs detached from the request that submitted it. Individual
//! recipient failures are recorded and the job continues; unresolvable flow
//! configuration, ledger write failures, and any error escaping the run are
//! fatal to the job and finalize it as FAILED without crashing the host.

use std::sync::Arc;

use gatepass_core::types::{CreateInvitationParams, FlowInfo, InvitationOutcome};
use gatepass_core::{DirectoryApi, GatepassError, JobStatus, Mailer};
use gatepass_email::template::{self, TemplateVariables};
use gatepass_policy::PolicyResolver;
use gatepass_storage::queries::{jobs, ledger};
use gatepass_storage::Database;
use tracing::{error, info, warn};

use crate::payload::BulkJobPayload;

/// Progress counters are persisted every this many processed recipients.
const PROGRESS_EVERY: u32 = 5;

/// Executes bulk invite jobs against the directory, ledger, and mailer.
pub struct BulkJobRunner {
    db: Database,
    resolver: PolicyResolver,
    directory: Arc<dyn DirectoryApi>,
    mailer: Arc<dyn Mailer>,
    flow_slug: String,
    app_name: String,
}

struct Progress {
    processed: u32,
    failed: u32,
    errors: Vec<String>,
}

impl BulkJobRunner {
    pub fn new(
        db: Database,
        resolver: PolicyResolver,
        directory: Arc<dyn DirectoryApi>,
        mailer: Arc<dyn Mailer>,
        flow_slug: String,
        app_name: String,
    ) -> Self {
        Self {
            db,
            resolver,
            directory,
            mailer,
            flow_slug,
            app_name,
        }
    }

    /// Run a job on a detached task. Errors escaping [`run`](Self::run) are
    /// converted into a FAILED finalization; the task itself never panics
    /// the host.
    pub fn spawn(self: &Arc<Self>, job_id: String, payload: BulkJobPayload) -> tokio::task::JoinHandle<()> {
        let runner = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = runner.run(&job_id, &payload).await {
                error!(job_id = %job_id, error = %err, "bulk job failed");
                let result = serde_json::json!({ "error": err.to_string() }).to_string();
                // Progress counters stay at their last flushed values.
                if let Err(e) = jobs::mark_failed(&runner.db, &job_id, Some(result)).await {
                    error!(job_id = %job_id, error = %e, "could not record bulk job failure");
                }
            }
        })
    }

    /// Process one job to a terminal state.
    pub async fn run(&self, job_id: &str, payload: &BulkJobPayload) -> Result<(), GatepassError> {
        let total = payload.recipients.len() as u32;
        info!(job_id, total, single_use = payload.single_use, "bulk job started");

        jobs::mark_processing(&self.db, job_id).await?;

        let policy = self.resolver.resolve(&payload.creator_groups);
        let expanded_groups = policy.expand_groupings(&payload.invite_groupings);
        let group_label = if payload.invite_groupings.is_empty() {
            None
        } else {
            Some(payload.invite_groupings.join(", "))
        };

        let flow = self
            .directory
            .get_flow(&self.flow_slug)
            .await?
            .ok_or_else(|| GatepassError::Directory {
                message: format!("enrollment flow {:?} not found", self.flow_slug),
                source: None,
            })?;

        let mut progress = Progress {
            processed: 0,
            failed: 0,
            errors: Vec::new(),
        };
        let mut status = JobStatus::Completed;

        if payload.single_use {
            for email in &payload.recipients {
                if let Err(err) = self
                    .invite_one(payload, &flow, &expanded_groups, group_label.clone(), email)
                    .await
                {
                    // Ledger failures are fatal; everything else is scoped
                    // to this recipient.
                    if matches!(err, GatepassError::Storage { .. }) {
                        return Err(err);
                    }
                    progress.failed += 1;
                    progress.errors.push(format!("{email}: {err}"));
                }
                progress.processed += 1;
                if progress.processed % PROGRESS_EVERY == 0 {
                    jobs::update_progress(&self.db, job_id, progress.processed, progress.failed)
                        .await?;
                }
            }
        } else {
            match self
                .create_shared(payload, &flow, &expanded_groups, group_label)
                .await
            {
                Ok(outcome) => {
                    self.deliver_shared(job_id, payload, &outcome, &mut progress)
                        .await?;
                }
                Err(err) => {
                    if matches!(err, GatepassError::Storage { .. }) {
                        return Err(err);
                    }
                    // The shared link is all-or-nothing: nobody was invited.
                    status = JobStatus::Failed;
                    progress.failed = total;
                    progress
                        .errors
                        .push(format!("shared invite creation failed: {err}"));
                }
            }
        }

        // Progress never stalls below 100% in history views.
        progress.processed = total;

        let result = serde_json::json!({ "errors": progress.errors }).to_string();
        jobs::finalize(
            &self.db,
            job_id,
            status,
            progress.processed,
            progress.failed,
            Some(result),
        )
        .await?;
        info!(
            job_id,
            status = %status,
            failed = progress.failed,
            "bulk job finished"
        );
        Ok(())
    }

    /// Create, record, and deliver one single-use invite.
    async fn invite_one(
        &self,
        payload: &BulkJobPayload,
        flow: &FlowInfo,
        expanded_groups: &[String],
        group_label: Option<String>,
        email: &str,
    ) -> Result<(), GatepassError> {
        let outcome = self
            .directory
            .create_invitation(CreateInvitationParams {
                name: format!("Invite for {email}"),
                expiry: payload.expiry,
                single_use: true,
                flow_slug: flow.slug.clone(),
                flow_pk: flow.pk.clone(),
                creator_username: Some(payload.creator_username.clone()),
                invite_groups: expanded_groups.to_vec(),
            })
            .await?;

        ledger::log_invite(
            &self.db,
            &payload.creator_sub,
            &outcome.invitation.pk,
            outcome.invitation.expires.clone(),
            group_label,
        )
        .await?;

        if self.mailer.is_configured() {
            let body = template::render(&payload.message, &self.vars(payload, &outcome));
            self.mailer
                .send(email, &self.subject(), &body)
                .await?;
        }
        Ok(())
    }

    /// Create and record the one shared multi-use invite.
    async fn create_shared(
        &self,
        payload: &BulkJobPayload,
        flow: &FlowInfo,
        expanded_groups: &[String],
        group_label: Option<String>,
    ) -> Result<InvitationOutcome, GatepassError> {
        let outcome = self
            .directory
            .create_invitation(CreateInvitationParams {
                name: format!("Bulk Invite ({} recipients)", payload.recipients.len()),
                expiry: payload.expiry,
                single_use: false,
                flow_slug: flow.slug.clone(),
                flow_pk: flow.pk.clone(),
                creator_username: Some(payload.creator_username.clone()),
                invite_groups: expanded_groups.to_vec(),
            })
            .await?;

        ledger::log_invite(
            &self.db,
            &payload.creator_sub,
            &outcome.invitation.pk,
            outcome.invitation.expires.clone(),
            group_label,
        )
        .await?;

        Ok(outcome)
    }

    /// Send the shared link to every recipient. Without a mailer there is
    /// nothing to deliver and the job completes immediately.
    async fn deliver_shared(
        &self,
        job_id: &str,
        payload: &BulkJobPayload,
        outcome: &InvitationOutcome,
        progress: &mut Progress,
    ) -> Result<(), GatepassError> {
        if !self.mailer.is_configured() {
            warn!(job_id, "mailer unconfigured, shared invite created but not delivered");
            progress.processed = payload.recipients.len() as u32;
            return Ok(());
        }

        let body = template::render(&payload.message, &self.vars(payload, outcome));
        for email in &payload.recipients {
            match self.mailer.send(email, &self.subject(), &body).await {
                Ok(_) => {}
                Err(err) => {
                    progress.failed += 1;
                    progress.errors.push(format!("{email} (delivery): {err}"));
                }
            }
            progress.processed += 1;
            if progress.processed % PROGRESS_EVERY == 0 {
                jobs::update_progress(&self.db, job_id, progress.processed, progress.failed)
                    .await?;
            }
        }
        Ok(())
    }

    fn subject(&self) -> String {
        format!("Invitation to join {}", self.app_name)
    }

    fn vars(&self, payload: &BulkJobPayload, outcome: &InvitationOutcome) -> TemplateVariables {
        TemplateVariables {
            inviter_username: payload.inviter_name().to_string(),
            expiration_date: outcome
                .invitation
                .expires
                .clone()
                .unwrap_or_else(|| "Never".to_string()),
            invite_url: outcome.invite_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use gatepass_config::model::{PolicyConfig, QuotaConfig, QuotaStrategy};
    use gatepass_core::duration::DurationToken;
    use gatepass_core::types::{DirectoryUser, Invitation};

    struct FakeDirectory {
        flow: Option<FlowInfo>,
        fail_creates: bool,
        /// Return a storage-class error on the create with this index.
        storage_fault_at: Option<usize>,
        created: Mutex<Vec<CreateInvitationParams>>,
        counter: AtomicUsize,
    }

    impl FakeDirectory {
        fn new() -> Self {
            Self {
                flow: Some(FlowInfo {
                    pk: "flow-pk".into(),
                    slug: "enrollment".into(),
                    name: "Enrollment".into(),
                }),
                fail_creates: false,
                storage_fault_at: None,
                created: Mutex::new(Vec::new()),
                counter: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DirectoryApi for FakeDirectory {
        async fn create_invitation(
            &self,
            params: CreateInvitationParams,
        ) -> Result<InvitationOutcome, GatepassError> {
            if self.fail_creates {
                return Err(GatepassError::Directory {
                    message: "upstream rejected the invitation".into(),
                    source: None,
                });
            }
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            if self.storage_fault_at == Some(n) {
                return Err(GatepassError::Storage {
                    source: Box::new(std::io::Error::other("database is locked")),
                });
            }
            let pk = format!("inv-{n}");
            self.created.lock().unwrap().push(params.clone());
            Ok(InvitationOutcome {
                invitation: Invitation {
                    pk: pk.clone(),
                    name: params.name,
                    expires: Some("2026-09-01T00:00:00.000Z".into()),
                    single_use: params.single_use,
                    flow: Some(params.flow_pk),
                },
                invite_url: format!("https://auth.example.com/if/flow/enrollment/?itoken={pk}"),
            })
        }

        async fn get_invitation(&self, _pk: &str) -> Result<Option<Invitation>, GatepassError> {
            Ok(None)
        }

        async fn delete_invitation(&self, _pk: &str) -> Result<bool, GatepassError> {
            Ok(true)
        }

        async fn get_flow(&self, _slug: &str) -> Result<Option<FlowInfo>, GatepassError> {
            Ok(self.flow.clone())
        }

        async fn list_flows(&self) -> Result<Vec<FlowInfo>, GatepassError> {
            Ok(self.flow.clone().into_iter().collect())
        }

        async fn search_users(&self, _query: &str) -> Result<Vec<DirectoryUser>, GatepassError> {
            Ok(Vec::new())
        }

        async fn get_user(&self, _id: &str) -> Result<Option<DirectoryUser>, GatepassError> {
            Ok(None)
        }
    }

    struct FakeMailer {
        configured: bool,
        fail_for: Vec<String>,
        sent: Mutex<Vec<(String, String)>>,
    }

    impl FakeMailer {
        fn new(configured: bool) -> Self {
            Self {
                configured,
                fail_for: Vec::new(),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Mailer for FakeMailer {
        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn send(&self, to: &str, _subject: &str, text: &str) -> Result<bool, GatepassError> {
            if !self.configured {
                return Ok(false);
            }
            if self.fail_for.iter().any(|f| f == to) {
                return Err(GatepassError::Email {
                    message: "mailbox unavailable".into(),
                    source: None,
                });
            }
            self.sent.lock().unwrap().push((to.to_string(), text.to_string()));
            Ok(true)
        }
    }

    fn payload(recipients: &[&str], single_use: bool) -> BulkJobPayload {
        BulkJobPayload {
            recipients: recipients.iter().map(|r| r.to_string()).collect(),
            message: "{{inviter_username}} invites you: {{invite_url}}".into(),
            expiry: DurationToken::Day7,
            single_use,
            invite_groupings: vec![],
            creator_sub: "sub-1".into(),
            creator_username: "alice".into(),
            creator_display_name: None,
            creator_groups: vec![],
        }
    }

    fn resolver() -> PolicyResolver {
        let mut config = PolicyConfig::default();
        config.default.quota = QuotaConfig {
            strategy: QuotaStrategy::Unlimited,
            limit: None,
            period: None,
        };
        PolicyResolver::new(config)
    }

    struct Harness {
        runner: Arc<BulkJobRunner>,
        db: Database,
        directory: Arc<FakeDirectory>,
        mailer: Arc<FakeMailer>,
    }

    async fn harness(directory: FakeDirectory, mailer: FakeMailer) -> Harness {
        let db = Database::open_in_memory().await.unwrap();
        let directory = Arc::new(directory);
        let mailer = Arc::new(mailer);
        let runner = Arc::new(BulkJobRunner::new(
            db.clone(),
            resolver(),
            directory.clone() as Arc<dyn DirectoryApi>,
            mailer.clone() as Arc<dyn Mailer>,
            "enrollment".into(),
            "Gatepass".into(),
        ));
        Harness {
            runner,
            db,
            directory,
            mailer,
        }
    }

    #[tokio::test]
    async fn single_use_job_invites_every_recipient() {
        let h = harness(FakeDirectory::new(), FakeMailer::new(true)).await;
        let job = jobs::create_job(&h.db, "sub-1", 3).await.unwrap();
        let payload = payload(&["a@example.com", "b@example.com", "c@example.com"], true);

        h.runner.run(&job.id, &payload).await.unwrap();

        let done = jobs::get_job(&h.db, &job.id).await.unwrap().unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.processed, 3);
        assert_eq!(done.failed, 0);
        assert_eq!(done.result.unwrap(), r#"{"errors":[]}"#);

        assert_eq!(h.directory.created.lock().unwrap().len(), 3);
        assert_eq!(h.mailer.sent.lock().unwrap().len(), 3);
        assert_eq!(
            ledger::count_for_owner(&h.db, "sub-1", None).await.unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn all_recipients_failing_still_completes() {
        let mut directory = FakeDirectory::new();
        directory.fail_creates = true;
        let h = harness(directory, FakeMailer::new(true)).await;
        let job = jobs::create_job(&h.db, "sub-1", 3).await.unwrap();
        let payload = payload(&["a@example.com", "b@example.com", "c@example.com"], true);

        h.runner.run(&job.id, &payload).await.unwrap();

        let done = jobs::get_job(&h.db, &job.id).await.unwrap().unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.processed, 3);
        assert_eq!(done.failed, 3);

        let result: serde_json::Value =
            serde_json::from_str(&done.result.unwrap()).unwrap();
        let errors = result["errors"].as_array().unwrap();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].as_str().unwrap().starts_with("a@example.com: "));
    }

    #[tokio::test]
    async fn delivery_failure_counts_against_the_recipient() {
        let mut mailer = FakeMailer::new(true);
        mailer.fail_for = vec!["b@example.com".into()];
        let h = harness(FakeDirectory::new(), mailer).await;
        let job = jobs::create_job(&h.db, "sub-1", 2).await.unwrap();
        let payload = payload(&["a@example.com", "b@example.com"], true);

        h.runner.run(&job.id, &payload).await.unwrap();

        let done = jobs::get_job(&h.db, &job.id).await.unwrap().unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.failed, 1);
        // The invite itself was created and recorded before delivery failed.
        assert_eq!(
            ledger::count_for_owner(&h.db, "sub-1", None).await.unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn missing_flow_fails_the_job_via_the_supervisor() {
        let mut directory = FakeDirectory::new();
        directory.flow = None;
        let h = harness(directory, FakeMailer::new(true)).await;
        let job = jobs::create_job(&h.db, "sub-1", 2).await.unwrap();
        let payload = payload(&["a@example.com", "b@example.com"], true);

        h.runner.spawn(job.id.clone(), payload).await.unwrap();

        let done = jobs::get_job(&h.db, &job.id).await.unwrap().unwrap();
        assert_eq!(done.status, JobStatus::Failed);
        let result: serde_json::Value =
            serde_json::from_str(&done.result.unwrap()).unwrap();
        assert!(result["error"].as_str().unwrap().contains("enrollment"));
    }

    #[tokio::test]
    async fn mid_job_fault_does_not_regress_flushed_progress() {
        let recipients: Vec<String> = (0..7).map(|i| format!("user{i}@example.com")).collect();
        let refs: Vec<&str> = recipients.iter().map(String::as_str).collect();

        let mut directory = FakeDirectory::new();
        // Recipients 0..=4 succeed and flush processed = 5; the sixth create
        // hits a storage-class fault that aborts the run.
        directory.storage_fault_at = Some(5);
        let h = harness(directory, FakeMailer::new(false)).await;
        let job = jobs::create_job(&h.db, "sub-1", 7).await.unwrap();

        h.runner.spawn(job.id.clone(), payload(&refs, true)).await.unwrap();

        let done = jobs::get_job(&h.db, &job.id).await.unwrap().unwrap();
        assert_eq!(done.status, JobStatus::Failed);
        assert_eq!(done.processed, 5);
        assert_eq!(done.failed, 0);
        let result: serde_json::Value = serde_json::from_str(&done.result.unwrap()).unwrap();
        assert!(result["error"].as_str().unwrap().contains("database is locked"));
    }

    #[tokio::test]
    async fn multi_use_job_creates_exactly_one_invite() {
        let recipients: Vec<String> =
            (0..50).map(|i| format!("user{i}@example.com")).collect();
        let refs: Vec<&str> = recipients.iter().map(String::as_str).collect();

        let h = harness(FakeDirectory::new(), FakeMailer::new(true)).await;
        let job = jobs::create_job(&h.db, "sub-1", 50).await.unwrap();

        h.runner.run(&job.id, &payload(&refs, false)).await.unwrap();

        let done = jobs::get_job(&h.db, &job.id).await.unwrap().unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.processed, 50);
        assert_eq!(done.failed, 0);

        // One upstream invite, one ledger entry, fifty deliveries.
        assert_eq!(h.directory.created.lock().unwrap().len(), 1);
        assert_eq!(
            ledger::count_for_owner(&h.db, "sub-1", None).await.unwrap(),
            1
        );
        assert_eq!(h.mailer.sent.lock().unwrap().len(), 50);
    }

    #[tokio::test]
    async fn multi_use_without_mailer_completes_without_sending() {
        let h = harness(FakeDirectory::new(), FakeMailer::new(false)).await;
        let job = jobs::create_job(&h.db, "sub-1", 4).await.unwrap();
        let payload = payload(&["a@x.com", "b@x.com", "c@x.com", "d@x.com"], false);

        h.runner.run(&job.id, &payload).await.unwrap();

        let done = jobs::get_job(&h.db, &job.id).await.unwrap().unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.processed, 4);
        assert_eq!(done.failed, 0);
        assert!(h.mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn multi_use_creation_failure_fails_the_whole_job() {
        let mut directory = FakeDirectory::new();
        directory.fail_creates = true;
        let h = harness(directory, FakeMailer::new(true)).await;
        let job = jobs::create_job(&h.db, "sub-1", 3).await.unwrap();
        let payload = payload(&["a@x.com", "b@x.com", "c@x.com"], false);

        h.runner.run(&job.id, &payload).await.unwrap();

        let done = jobs::get_job(&h.db, &job.id).await.unwrap().unwrap();
        assert_eq!(done.status, JobStatus::Failed);
        assert_eq!(done.failed, 3);
        assert_eq!(done.processed, 3);
        assert_eq!(
            ledger::count_for_owner(&h.db, "sub-1", None).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn rendered_mail_substitutes_the_invite_url() {
        let h = harness(FakeDirectory::new(), FakeMailer::new(true)).await;
        let job = jobs::create_job(&h.db, "sub-1", 1).await.unwrap();

        h.runner
            .run(&job.id, &payload(&["a@example.com"], true))
            .await
            .unwrap();

        let sent = h.mailer.sent.lock().unwrap();
        let (_, body) = &sent[0];
        assert!(body.contains("itoken=inv-0"), "{body}");
        assert!(body.starts_with("alice invites you"));
    }
}
