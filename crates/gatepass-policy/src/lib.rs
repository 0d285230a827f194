// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Policy resolution and quota accounting.
//!
//! [`PolicyResolver`] turns a user's group memberships into one effective
//! policy; [`QuotaAccountant`] measures that policy against the invite
//! ledger.

pub mod quota;
pub mod resolver;

pub use quota::{QuotaAccountant, QuotaStatus};
pub use resolver::{permissiveness_score, PolicyResolver, ResolvedPolicy};
