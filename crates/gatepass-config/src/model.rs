// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Gatepass.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages. The policy
//! document (`[policy]`) is part of the same file: it is validated once at
//! load and held immutable for the process lifetime.

use gatepass_core::duration::{DurationToken, Period};
use serde::{Deserialize, Serialize};

/// Top-level Gatepass configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values; a
/// usable deployment needs at least `[directory]` credentials and one
/// `[[policy.rules]]` entry or a tuned `[policy.default]`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatepassConfig {
    /// HTTP server and identity settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Identity-provider API settings.
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// Outbound SMTP settings.
    #[serde(default)]
    pub smtp: SmtpConfig,

    /// Invite policy document: per-group rules plus the default entry.
    #[serde(default)]
    pub policy: PolicyConfig,
}

/// HTTP server and identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address the gateway binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Display name used in invite email subjects.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Directory group whose members may call the admin endpoints.
    #[serde(default = "default_admin_group")]
    pub admin_group: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            log_level: default_log_level(),
            app_name: default_app_name(),
            admin_group: default_admin_group(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_app_name() -> String {
    "Gatepass".to_string()
}

fn default_admin_group() -> String {
    "Invite Portal Admins".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("gatepass").join("gatepass.db"))
        .and_then(|p| p.to_str().map(str::to_string))
        .unwrap_or_else(|| "gatepass.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

/// Identity-provider API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DirectoryConfig {
    /// Base URL of the identity provider, e.g. `https://auth.example.com`.
    /// `None` leaves the directory client unconfigured (startup error for serve).
    #[serde(default)]
    pub api_url: Option<String>,

    /// Bearer token for the identity provider API.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Slug of the enrollment flow new invites target.
    #[serde(default = "default_flow_slug")]
    pub flow_slug: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_token: None,
            flow_slug: default_flow_slug(),
        }
    }
}

fn default_flow_slug() -> String {
    "default-enrollment-flow".to_string()
}

/// Outbound SMTP configuration.
///
/// Email is optional: with host/username/password unset the mailer reports
/// unconfigured and bulk jobs skip delivery.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SmtpConfig {
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default = "default_smtp_port")]
    pub port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// From address on outbound invite mail.
    #[serde(default = "default_from_email")]
    pub from_email: String,

    /// Require TLS certificate verification.
    #[serde(default)]
    pub use_tls: bool,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: default_smtp_port(),
            username: None,
            password: None,
            from_email: default_from_email(),
            use_tls: false,
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_email() -> String {
    "noreply@example.com".to_string()
}

// --- Policy document ---

/// Quota accounting strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaStrategy {
    /// Lifetime cap: all ledger records ever count against `limit`.
    Fixed,
    /// Sliding-window cap: records within the period's lookback count.
    Recurring,
    /// No cap; usage is tracked for display only.
    Unlimited,
}

/// Quota rule for one policy entry.
///
/// `limit` is meaningful for `fixed`/`recurring`; `period` only for
/// `recurring`. `unlimited` ignores both.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QuotaConfig {
    pub strategy: QuotaStrategy,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub period: Option<Period>,
}

/// A named bundle of identity-provider groups offered as one selectable unit
/// to invite creators.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Grouping {
    pub name: String,
    pub member_groups: Vec<String>,
}

/// Invite rules for one policy entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct InviteConfig {
    /// Longest expiry a caller under this entry may request.
    pub max_expiry: DurationToken,

    /// Whether multi-use invite links may be created.
    #[serde(default)]
    pub allow_multi_use: bool,

    /// Groupings the caller may attach to invites. An entry with an empty
    /// list contributes nothing to the merged allow list.
    #[serde(default)]
    pub allowed_groupings: Vec<Grouping>,
}

/// One group-triggered bundle of quota + invite rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyRule {
    /// The identity-provider group that activates this entry.
    pub group: String,
    pub quota: QuotaConfig,
    pub invite: InviteConfig,
}

/// The fallback entry applied to callers matching no rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultPolicy {
    pub quota: QuotaConfig,
    pub invite: InviteConfig,
}

impl Default for DefaultPolicy {
    fn default() -> Self {
        Self {
            quota: QuotaConfig {
                strategy: QuotaStrategy::Fixed,
                limit: Some(5),
                period: None,
            },
            invite: InviteConfig {
                max_expiry: DurationToken::Day7,
                allow_multi_use: false,
                allowed_groupings: Vec::new(),
            },
        }
    }
}

/// The complete invite policy document.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// Ordered per-group entries. Order is the tie-break for equal
    /// permissiveness scores during resolution.
    #[serde(default)]
    pub rules: Vec<PolicyRule>,

    /// Entry applied when no rule matches.
    #[serde(default)]
    pub default: DefaultPolicy,
}
