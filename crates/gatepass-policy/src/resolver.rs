// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Policy resolution: map a user's group memberships to one effective
//! policy.
//!
//! The quota comes from the single most permissive matching rule; the
//! invite rule is a union across every matching rule. A user can therefore
//! never be made worse off by belonging to an additional group.

use gatepass_config::model::{
    Grouping, InviteConfig, PolicyConfig, QuotaConfig, QuotaStrategy,
};
use gatepass_core::duration::{DurationToken, EXPIRY_LADDER};
use serde::Serialize;
use tracing::debug;

/// The effective policy for one user.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedPolicy {
    pub quota: QuotaConfig,
    pub invite: InviteConfig,
    /// Group whose rule supplied the quota, `None` when the default applied.
    pub source_group: Option<String>,
}

impl ResolvedPolicy {
    /// Whether the user may request this expiry under the merged invite rule.
    pub fn is_expiry_allowed(&self, requested: DurationToken) -> bool {
        requested.at_most(self.invite.max_expiry)
    }

    /// The standard expiry ladder filtered down to what this policy permits.
    pub fn expiry_options(&self) -> Vec<DurationToken> {
        EXPIRY_LADDER
            .into_iter()
            .filter(|d| self.is_expiry_allowed(*d))
            .collect()
    }

    /// Whether a grouping name may be attached to an invite. An empty allow
    /// list places no restriction on grouping names.
    pub fn is_grouping_allowed(&self, name: &str) -> bool {
        self.invite.allowed_groupings.is_empty()
            || self.invite.allowed_groupings.iter().any(|g| g.name == name)
    }

    /// Expand grouping names into the union of their member groups,
    /// deduplicated and in first-seen order. Unknown names are skipped.
    pub fn expand_groupings(&self, names: &[String]) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for name in names {
            let Some(grouping) = self
                .invite
                .allowed_groupings
                .iter()
                .find(|g| &g.name == name)
            else {
                continue;
            };
            for member in &grouping.member_groups {
                if !out.contains(member) {
                    out.push(member.clone());
                }
            }
        }
        out
    }
}

/// Rank a quota by how permissive it is. Unlimited beats everything;
/// recurring quotas beat fixed ones of any plausible size because they
/// replenish.
pub fn permissiveness_score(quota: &QuotaConfig) -> u64 {
    match quota.strategy {
        QuotaStrategy::Unlimited => u64::MAX,
        QuotaStrategy::Recurring => u64::from(quota.limit.unwrap_or(0)).saturating_mul(1000),
        QuotaStrategy::Fixed => u64::from(quota.limit.unwrap_or(0)),
    }
}

/// Resolves group memberships against a validated policy document.
#[derive(Debug, Clone)]
pub struct PolicyResolver {
    config: PolicyConfig,
}

impl PolicyResolver {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    /// Resolve the effective policy for a user with the given groups.
    pub fn resolve(&self, groups: &[String]) -> ResolvedPolicy {
        let matching: Vec<_> = self
            .config
            .rules
            .iter()
            .filter(|rule| groups.contains(&rule.group))
            .collect();

        if matching.is_empty() {
            return ResolvedPolicy {
                quota: self.config.default.quota.clone(),
                invite: self.config.default.invite.clone(),
                source_group: None,
            };
        }

        // Strictly-greater comparison: the earliest rule wins ties.
        let mut best = matching[0];
        for rule in &matching[1..] {
            if permissiveness_score(&rule.quota) > permissiveness_score(&best.quota) {
                best = rule;
            }
        }

        let mut max_expiry = matching[0].invite.max_expiry;
        let mut allow_multi_use = false;
        let mut groupings: Vec<Grouping> = Vec::new();
        for rule in &matching {
            max_expiry = longer_of(max_expiry, rule.invite.max_expiry);
            allow_multi_use = allow_multi_use || rule.invite.allow_multi_use;
            for grouping in &rule.invite.allowed_groupings {
                if !groupings.iter().any(|g| g.name == grouping.name) {
                    groupings.push(grouping.clone());
                }
            }
        }
        if groupings.is_empty() {
            groupings = self.config.default.invite.allowed_groupings.clone();
        }

        debug!(
            source_group = %best.group,
            matched = matching.len(),
            "policy resolved"
        );

        ResolvedPolicy {
            quota: best.quota.clone(),
            invite: InviteConfig {
                max_expiry,
                allow_multi_use,
                allowed_groupings: groupings,
            },
            source_group: Some(best.group.clone()),
        }
    }
}

/// The longer of two durations, treating "never" as infinite.
fn longer_of(a: DurationToken, b: DurationToken) -> DurationToken {
    match (a.millis(), b.millis()) {
        (None, _) => a,
        (_, None) => b,
        (Some(am), Some(bm)) => {
            if bm > am {
                b
            } else {
                a
            }
        }
    }
}
