// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, most importantly the coherence of the policy document:
//! fixed/recurring quotas need limits, recurring quotas need periods, and
//! trigger groups and grouping names must be unique.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::{GatepassConfig, InviteConfig, QuotaConfig, QuotaStrategy};

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &GatepassConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.bind_address must not be empty".to_string(),
        });
    } else if config.server.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ConfigError::Validation {
            message: format!(
                "server.bind_address `{}` is not a valid socket address",
                config.server.bind_address
            ),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    // api_url and api_token come as a pair.
    if config.directory.api_url.is_some() != config.directory.api_token.is_some() {
        errors.push(ConfigError::Validation {
            message: "directory.api_url and directory.api_token must both be set (or neither)"
                .to_string(),
        });
    }

    if config.directory.flow_slug.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "directory.flow_slug must not be empty".to_string(),
        });
    }

    // Policy document coherence.
    let mut seen_groups = HashSet::new();
    for (i, rule) in config.policy.rules.iter().enumerate() {
        if rule.group.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("policy.rules[{i}].group must not be empty"),
            });
        }
        if !seen_groups.insert(&rule.group) {
            errors.push(ConfigError::Validation {
                message: format!(
                    "duplicate trigger group `{}` in [[policy.rules]]",
                    rule.group
                ),
            });
        }
        validate_quota(&rule.quota, &format!("policy.rules[{i}].quota"), &mut errors);
        validate_invite(&rule.invite, &format!("policy.rules[{i}].invite"), &mut errors);
    }

    validate_quota(&config.policy.default.quota, "policy.default.quota", &mut errors);
    validate_invite(&config.policy.default.invite, "policy.default.invite", &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_quota(quota: &QuotaConfig, path: &str, errors: &mut Vec<ConfigError>) {
    match quota.strategy {
        QuotaStrategy::Fixed | QuotaStrategy::Recurring => {
            if quota.limit.is_none() {
                errors.push(ConfigError::Validation {
                    message: format!("{path}.limit is required for strategy `{:?}`", quota.strategy)
                        .to_lowercase(),
                });
            }
        }
        QuotaStrategy::Unlimited => {}
    }

    if quota.strategy == QuotaStrategy::Recurring && quota.period.is_none() {
        errors.push(ConfigError::Validation {
            message: format!("{path}.period is required for strategy `recurring`"),
        });
    }
}

fn validate_invite(invite: &InviteConfig, path: &str, errors: &mut Vec<ConfigError>) {
    let mut seen_names = HashSet::new();
    for (i, grouping) in invite.allowed_groupings.iter().enumerate() {
        if grouping.name.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("{path}.allowed_groupings[{i}].name must not be empty"),
            });
        }
        if !seen_names.insert(&grouping.name) {
            errors.push(ConfigError::Validation {
                message: format!(
                    "duplicate grouping name `{}` in {path}.allowed_groupings",
                    grouping.name
                ),
            });
        }
        if grouping.member_groups.is_empty() {
            errors.push(ConfigError::Validation {
                message: format!(
                    "{path}.allowed_groupings[{i}].member_groups must not be empty"
                ),
            });
        }
    }
}
