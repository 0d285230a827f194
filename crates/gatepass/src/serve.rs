// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway.
//!
//! Thin axum handlers over [`InviteService`]. Session authentication is
//! upstream; the caller's identity arrives in `x-gatepass-user`,
//! `x-gatepass-username`, `x-gatepass-name`, and `x-gatepass-groups`
//! headers set by the fronting auth proxy.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use gatepass_bulk::BulkJobRunner;
use gatepass_config::GatepassConfig;
use gatepass_core::duration::DurationToken;
use gatepass_core::GatepassError;
use gatepass_directory::DirectoryClient;
use gatepass_email::SmtpMailer;
use gatepass_policy::PolicyResolver;
use gatepass_storage::Database;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::service::{
    BulkInviteRequest, CreateInviteRequest, Identity, InviteService,
};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<InviteService>,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

/// Error wrapper mapping [`GatepassError`] onto HTTP statuses.
pub struct ApiError(GatepassError);

impl From<GatepassError> for ApiError {
    fn from(err: GatepassError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            GatepassError::QuotaExhausted { .. } | GatepassError::NotPermitted { .. } => {
                StatusCode::FORBIDDEN
            }
            GatepassError::NotFound { .. } => StatusCode::NOT_FOUND,
            // Config and upstream problems are server-side per the original.
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            success: false,
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            success: false,
            error: message.into(),
        }),
    )
        .into_response()
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorBody {
            success: false,
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// Pull the caller identity from the auth proxy's headers.
fn identity_from(headers: &HeaderMap) -> Result<Identity, Response> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let sub = header("x-gatepass-user")
        .filter(|s| !s.is_empty())
        .ok_or_else(|| unauthorized("missing identity headers"))?;
    let username = header("x-gatepass-username").unwrap_or_else(|| sub.clone());
    let display_name = header("x-gatepass-name").filter(|s| !s.is_empty());
    let groups = header("x-gatepass-groups")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    Ok(Identity {
        sub,
        username,
        display_name,
        groups,
    })
}

/// Build the API router over a wired service.
pub fn router(service: Arc<InviteService>) -> Router {
    let state = AppState { service };
    Router::new()
        .route("/api/health", get(get_health))
        .route("/api/invites", post(post_invite))
        .route("/api/invites/{id}", delete(delete_invite))
        .route("/api/quota", get(get_quota))
        .route("/api/history", get(get_history))
        .route("/api/flows", get(get_flows))
        .route("/api/bulk", post(post_bulk))
        .route("/api/bulk/history", get(get_bulk_history))
        .route("/api/bulk/{id}/status", get(get_bulk_status))
        .route("/api/admin/reset-quota", post(post_admin_reset_quota))
        .route("/api/admin/stats", get(get_admin_stats))
        .route("/api/admin/users/search", get(get_admin_user_search))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Wire collaborators from configuration and serve until shutdown.
pub async fn run(config: GatepassConfig) -> Result<(), GatepassError> {
    if let Some(parent) = std::path::Path::new(&config.storage.database_path).parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| GatepassError::Config(format!("cannot create data directory: {e}")))?;
    }
    let db =
        Database::open_with_options(&config.storage.database_path, config.storage.wal_mode).await?;

    let (Some(api_url), Some(api_token)) =
        (&config.directory.api_url, &config.directory.api_token)
    else {
        return Err(GatepassError::Config(
            "directory.api_url and directory.api_token must be configured".to_string(),
        ));
    };
    let directory = Arc::new(DirectoryClient::new(api_url, api_token)?);
    let mailer = Arc::new(SmtpMailer::new(&config.smtp, &config.server.app_name)?);
    let resolver = PolicyResolver::new(config.policy.clone());

    let runner = Arc::new(BulkJobRunner::new(
        db.clone(),
        resolver.clone(),
        directory.clone(),
        mailer.clone(),
        config.directory.flow_slug.clone(),
        config.server.app_name.clone(),
    ));
    let service = Arc::new(InviteService::new(
        db,
        resolver,
        directory,
        mailer,
        runner,
        config.directory.flow_slug.clone(),
        config.server.app_name.clone(),
        config.server.admin_group.clone(),
        api_url.clone(),
    ));

    let app = router(service);
    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .map_err(|e| {
            GatepassError::Config(format!(
                "cannot bind {}: {e}",
                config.server.bind_address
            ))
        })?;
    info!(addr = %config.server.bind_address, "gatepass listening");
    axum::serve(listener, app)
        .await
        .map_err(|e| GatepassError::Internal(format!("server error: {e}")))
}

// --- Request/response bodies ---

#[derive(Debug, Deserialize)]
pub struct InviteBody {
    pub name: String,
    pub expiry: DurationToken,
    #[serde(default = "default_single_use")]
    pub single_use: bool,
    #[serde(default)]
    pub groupings: Vec<String>,
    #[serde(default)]
    pub email_recipient: Option<String>,
    #[serde(default)]
    pub email_message: Option<String>,
}

fn default_single_use() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct BulkBody {
    pub recipients: Vec<String>,
    #[serde(default)]
    pub message: String,
    pub expiry: DurationToken,
    #[serde(default = "default_single_use")]
    pub single_use: bool,
    #[serde(default)]
    pub groupings: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetQuotaBody {
    pub user_sub: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Debug, Serialize)]
struct InviteResponse<T: Serialize> {
    success: bool,
    #[serde(flatten)]
    data: T,
}

fn ok<T: Serialize>(data: T) -> Json<InviteResponse<T>> {
    Json(InviteResponse {
        success: true,
        data,
    })
}

// --- Handlers ---

async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn post_invite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<InviteBody>,
) -> Response {
    let identity = match identity_from(&headers) {
        Ok(identity) => identity,
        Err(response) => return response,
    };
    if body.name.trim().is_empty() {
        return bad_request("invite name is required");
    }

    let request = CreateInviteRequest {
        name: body.name,
        expiry: body.expiry,
        single_use: body.single_use,
        groupings: body.groupings,
        email_recipient: body.email_recipient,
        email_message: body.email_message,
    };
    match state.service.create_invite(&identity, request).await {
        Ok(created) => ok(created).into_response(),
        Err(err) => ApiError(err).into_response(),
    }
}

async fn delete_invite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let identity = match identity_from(&headers) {
        Ok(identity) => identity,
        Err(response) => return response,
    };
    match state.service.revoke_invite(&identity, &id).await {
        Ok(()) => ok(serde_json::json!({ "revoked": id })).into_response(),
        Err(err) => ApiError(err).into_response(),
    }
}

async fn get_quota(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let identity = match identity_from(&headers) {
        Ok(identity) => identity,
        Err(response) => return response,
    };
    match state.service.policy_overview(&identity).await {
        Ok(overview) => ok(overview).into_response(),
        Err(err) => ApiError(err).into_response(),
    }
}

async fn get_history(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let identity = match identity_from(&headers) {
        Ok(identity) => identity,
        Err(response) => return response,
    };
    match state.service.history(&identity, 50).await {
        Ok(entries) => ok(serde_json::json!({ "invites": entries })).into_response(),
        Err(err) => ApiError(err).into_response(),
    }
}

async fn get_flows(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(response) = identity_from(&headers) {
        return response;
    }
    match state.service.flows().await {
        Ok(flows) => ok(serde_json::json!({ "flows": flows })).into_response(),
        Err(err) => ApiError(err).into_response(),
    }
}

async fn post_bulk(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<BulkBody>,
) -> Response {
    let identity = match identity_from(&headers) {
        Ok(identity) => identity,
        Err(response) => return response,
    };
    if body.recipients.is_empty() {
        return bad_request("recipient list is empty");
    }

    let request = BulkInviteRequest {
        recipients: body.recipients,
        message: body.message,
        expiry: body.expiry,
        single_use: body.single_use,
        groupings: body.groupings,
    };
    match state.service.submit_bulk(&identity, request).await {
        Ok(job) => (
            StatusCode::ACCEPTED,
            ok(serde_json::json!({ "job_id": job.id })),
        )
            .into_response(),
        Err(err) => ApiError(err).into_response(),
    }
}

async fn get_bulk_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let identity = match identity_from(&headers) {
        Ok(identity) => identity,
        Err(response) => return response,
    };
    match state.service.job_status(&identity, &id).await {
        Ok(job) => ok(job).into_response(),
        Err(err) => ApiError(err).into_response(),
    }
}

async fn get_bulk_history(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let identity = match identity_from(&headers) {
        Ok(identity) => identity,
        Err(response) => return response,
    };
    match state.service.bulk_history(&identity, 20).await {
        Ok(jobs) => ok(serde_json::json!({ "jobs": jobs })).into_response(),
        Err(err) => ApiError(err).into_response(),
    }
}

async fn post_admin_reset_quota(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ResetQuotaBody>,
) -> Response {
    let identity = match identity_from(&headers) {
        Ok(identity) => identity,
        Err(response) => return response,
    };
    match state.service.reset_quota(&identity, &body.user_sub).await {
        Ok(purged) => ok(serde_json::json!({ "purged": purged })).into_response(),
        Err(err) => ApiError(err).into_response(),
    }
}

async fn get_admin_stats(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let identity = match identity_from(&headers) {
        Ok(identity) => identity,
        Err(response) => return response,
    };
    match state.service.global_stats(&identity).await {
        Ok(stats) => ok(stats).into_response(),
        Err(err) => ApiError(err).into_response(),
    }
}

async fn get_admin_user_search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Response {
    let identity = match identity_from(&headers) {
        Ok(identity) => identity,
        Err(response) => return response,
    };
    if params.q.trim().is_empty() {
        return bad_request("query parameter q is required");
    }
    match state.service.search_users(&identity, &params.q).await {
        Ok(users) => ok(serde_json::json!({ "users": users })).into_response(),
        Err(err) => ApiError(err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use gatepass_core::types::{
        CreateInvitationParams, DirectoryUser, FlowInfo, Invitation, InvitationOutcome,
    };
    use gatepass_core::{DirectoryApi, Mailer};
    use tower::ServiceExt;

    struct StubDirectory;

    #[async_trait]
    impl DirectoryApi for StubDirectory {
        async fn create_invitation(
            &self,
            params: CreateInvitationParams,
        ) -> Result<InvitationOutcome, GatepassError> {
            Ok(InvitationOutcome {
                invitation: Invitation {
                    pk: "inv-1".into(),
                    name: params.name,
                    expires: None,
                    single_use: params.single_use,
                    flow: Some(params.flow_pk),
                },
                invite_url: "https://auth.example.com/if/flow/enroll/?itoken=inv-1".into(),
            })
        }

        async fn get_invitation(&self, _pk: &str) -> Result<Option<Invitation>, GatepassError> {
            Ok(None)
        }

        async fn delete_invitation(&self, _pk: &str) -> Result<bool, GatepassError> {
            Ok(true)
        }

        async fn get_flow(&self, slug: &str) -> Result<Option<FlowInfo>, GatepassError> {
            Ok(Some(FlowInfo {
                pk: "f1".into(),
                slug: slug.to_string(),
                name: "Enrollment".into(),
            }))
        }

        async fn list_flows(&self) -> Result<Vec<FlowInfo>, GatepassError> {
            Ok(vec![])
        }

        async fn search_users(&self, _query: &str) -> Result<Vec<DirectoryUser>, GatepassError> {
            Ok(vec![])
        }

        async fn get_user(&self, _id: &str) -> Result<Option<DirectoryUser>, GatepassError> {
            Ok(None)
        }
    }

    struct StubMailer;

    #[async_trait]
    impl Mailer for StubMailer {
        fn is_configured(&self) -> bool {
            false
        }

        async fn send(
            &self,
            _to: &str,
            _subject: &str,
            _text: &str,
        ) -> Result<bool, GatepassError> {
            Ok(false)
        }
    }

    async fn test_router() -> Router {
        let db = Database::open_in_memory().await.unwrap();
        let directory: Arc<dyn DirectoryApi> = Arc::new(StubDirectory);
        let mailer: Arc<dyn Mailer> = Arc::new(StubMailer);
        let resolver = PolicyResolver::new(Default::default());
        let runner = Arc::new(BulkJobRunner::new(
            db.clone(),
            resolver.clone(),
            directory.clone(),
            mailer.clone(),
            "enroll".into(),
            "Gatepass".into(),
        ));
        let service = Arc::new(InviteService::new(
            db,
            resolver,
            directory,
            mailer,
            runner,
            "enroll".into(),
            "Gatepass".into(),
            "Invite Portal Admins".into(),
            "https://auth.example.com".into(),
        ));
        router(service)
    }

    fn with_identity(request: axum::http::request::Builder) -> axum::http::request::Builder {
        request
            .header("x-gatepass-user", "sub-1")
            .header("x-gatepass-username", "alice")
            .header("x-gatepass-groups", "members, staff")
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_needs_no_identity() {
        let app = test_router().await;
        let response = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn missing_identity_headers_are_unauthorized() {
        let app = test_router().await;
        let response = app
            .oneshot(Request::get("/api/quota").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn quota_reports_the_default_policy() {
        let app = test_router().await;
        let response = app
            .oneshot(
                with_identity(Request::get("/api/quota"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["quota"]["used"], 0);
        assert!(json["source_group"].is_null());
    }

    #[tokio::test]
    async fn create_invite_returns_the_url() {
        let app = test_router().await;
        let body = serde_json::json!({
            "name": "Invite for Bob",
            "expiry": "24h"
        });
        let response = app
            .oneshot(
                with_identity(Request::post("/api/invites"))
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["invite_id"], "inv-1");
        assert!(json["invite_url"].as_str().unwrap().contains("itoken=inv-1"));
    }

    #[tokio::test]
    async fn expiry_above_the_default_cap_is_forbidden() {
        let app = test_router().await;
        let body = serde_json::json!({
            "name": "Invite for Bob",
            "expiry": "never"
        });
        let response = app
            .oneshot(
                with_identity(Request::post("/api/invites"))
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn bulk_submission_is_accepted_with_a_job_id() {
        let app = test_router().await;
        let body = serde_json::json!({
            "recipients": ["a@example.com"],
            "expiry": "24h",
            "message": "Join: {{invite_url}}"
        });
        let response = app
            .oneshot(
                with_identity(Request::post("/api/bulk"))
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let json = body_json(response).await;
        assert!(json["job_id"].is_string());
    }

    #[tokio::test]
    async fn empty_recipient_list_is_a_bad_request() {
        let app = test_router().await;
        let body = serde_json::json!({
            "recipients": [],
            "expiry": "24h"
        });
        let response = app
            .oneshot(
                with_identity(Request::post("/api/bulk"))
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn admin_routes_require_the_admin_group() {
        let app = test_router().await;
        let response = app
            .oneshot(
                with_identity(Request::get("/api/admin/stats"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_stats_allowed_for_the_admin_group() {
        let app = test_router().await;
        let response = app
            .oneshot(
                Request::get("/api/admin/stats")
                    .header("x-gatepass-user", "admin-1")
                    .header("x-gatepass-username", "root")
                    .header("x-gatepass-groups", "Invite Portal Admins")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["total_invites"], 0);
    }
}
