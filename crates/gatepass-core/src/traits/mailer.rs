// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound email collaborator trait.

use async_trait::async_trait;

use crate::error::GatepassError;

/// Outbound email transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Whether an SMTP transport is configured. When false, `send` is a
    /// logged no-op returning `Ok(false)`.
    fn is_configured(&self) -> bool;

    /// Sends a plain-text email. Returns `Ok(true)` on accepted delivery,
    /// `Ok(false)` when no transport is configured.
    async fn send(&self, to: &str, subject: &str, text: &str) -> Result<bool, GatepassError>;
}
