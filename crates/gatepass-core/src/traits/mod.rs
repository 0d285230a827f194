// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions.
//!
//! The identity provider and the outbound mailer are external systems; the
//! core and the bulk processor only ever see them through these traits so
//! tests can substitute in-memory fakes.

pub mod directory;
pub mod mailer;

pub use directory::DirectoryApi;
pub use mailer::Mailer;
