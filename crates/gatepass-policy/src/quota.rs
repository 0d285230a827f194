// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quota accounting against the invite ledger.
//!
//! Fixed and unlimited quotas count the owner's whole ledger; recurring
//! quotas count a sliding lookback window ending now. Every ledger entry
//! counts regardless of status: revoking an invite does not refund quota.

use chrono::{Duration, Utc};
use gatepass_config::model::{QuotaConfig, QuotaStrategy};
use gatepass_core::duration::Period;
use gatepass_core::GatepassError;
use gatepass_storage::{queries::ledger, Database};
use serde::Serialize;

/// A point-in-time view of one user's quota.
#[derive(Debug, Clone, Serialize)]
pub struct QuotaStatus {
    pub used: u64,
    pub limit: Option<u32>,
    pub strategy: QuotaStrategy,
    pub period: Option<Period>,
    /// `None` exactly when the quota is unlimited.
    pub remaining: Option<u64>,
    pub is_unlimited: bool,
}

impl QuotaStatus {
    /// Whether `required` more invites fit under this quota right now.
    pub fn admits(&self, required: u64) -> bool {
        match self.remaining {
            None => true,
            Some(remaining) => remaining >= required,
        }
    }
}

/// Computes quota status for users from the ledger.
#[derive(Clone)]
pub struct QuotaAccountant {
    db: Database,
}

impl QuotaAccountant {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Current usage and headroom for `owner_sub` under `quota`.
    pub async fn status(
        &self,
        owner_sub: &str,
        quota: &QuotaConfig,
    ) -> Result<QuotaStatus, GatepassError> {
        let since = match quota.strategy {
            QuotaStrategy::Recurring => {
                let period = quota.period.ok_or_else(|| {
                    GatepassError::Config("recurring quota without a period".to_string())
                })?;
                Some(window_start(period))
            }
            QuotaStrategy::Fixed | QuotaStrategy::Unlimited => None,
        };

        let used = ledger::count_for_owner(&self.db, owner_sub, since.as_deref()).await?;

        let status = match quota.strategy {
            QuotaStrategy::Unlimited => QuotaStatus {
                used,
                limit: None,
                strategy: QuotaStrategy::Unlimited,
                period: None,
                remaining: None,
                is_unlimited: true,
            },
            strategy => {
                let limit = quota.limit.ok_or_else(|| {
                    GatepassError::Config("limited quota without a limit".to_string())
                })?;
                QuotaStatus {
                    used,
                    limit: Some(limit),
                    strategy,
                    period: quota.period,
                    remaining: Some(u64::from(limit).saturating_sub(used)),
                    is_unlimited: false,
                }
            }
        };
        Ok(status)
    }

    /// Fail with `QuotaExhausted` unless `required` more invites fit.
    pub async fn check_admission(
        &self,
        owner_sub: &str,
        quota: &QuotaConfig,
        required: u64,
    ) -> Result<QuotaStatus, GatepassError> {
        let status = self.status(owner_sub, quota).await?;
        if !status.admits(required) {
            return Err(GatepassError::QuotaExhausted {
                message: format!(
                    "{} used of {}, {} required",
                    status.used,
                    status.limit.map_or_else(|| "unlimited".to_string(), |l| l.to_string()),
                    required
                ),
            });
        }
        Ok(status)
    }
}

/// Start of the sliding lookback window for a recurring period, as an
/// ISO 8601 UTC timestamp.
fn window_start(period: Period) -> String {
    let lookback = Duration::milliseconds(period.lookback_millis() as i64);
    (Utc::now() - lookback)
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}
