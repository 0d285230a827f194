// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bulk invite job processing.
//!
//! [`BulkJobRunner`] executes [`BulkJobPayload`]s on detached tokio tasks,
//! persisting progress and a terminal result to the job table.

pub mod payload;
pub mod runner;

pub use payload::BulkJobPayload;
pub use runner::BulkJobRunner;
