// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./gatepass.toml` > `~/.config/gatepass/gatepass.toml`
//! > `/etc/gatepass/gatepass.toml` with environment variable overrides via the
//! `GATEPASS_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::GatepassConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/gatepass/gatepass.toml` (system-wide)
/// 3. `~/.config/gatepass/gatepass.toml` (user XDG config)
/// 4. `./gatepass.toml` (local directory)
/// 5. `GATEPASS_*` environment variables
pub fn load_config() -> Result<GatepassConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<GatepassConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GatepassConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<GatepassConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GatepassConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(GatepassConfig::default()))
        .merge(Toml::file("/etc/gatepass/gatepass.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("gatepass/gatepass.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("gatepass.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `GATEPASS_DIRECTORY_API_TOKEN` must map
/// to `directory.api_token`, not `directory.api.token`.
fn env_provider() -> Env {
    Env::prefixed("GATEPASS_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("server_", "server.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("directory_", "directory.", 1)
            .replacen("smtp_", "smtp.", 1);
        mapped.into()
    })
}
