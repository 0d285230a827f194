// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity-provider integration.
//!
//! [`DirectoryClient`] implements [`gatepass_core::DirectoryApi`] against
//! the provider's REST API: invitation lifecycle, enrollment flow lookup,
//! and user search.

pub mod client;
pub mod types;

pub use client::{slugify, DirectoryClient};
