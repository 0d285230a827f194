// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Gatepass invite manager.

use thiserror::Error;

/// The primary error type used across all Gatepass crates.
#[derive(Debug, Error)]
pub enum GatepassError {
    /// Configuration errors (invalid TOML, missing required fields, bad policy document).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Identity-provider API errors (connection failure, rejected request).
    #[error("directory error: {message}")]
    Directory {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Email delivery errors (SMTP connect, send failure).
    #[error("email error: {message}")]
    Email {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The caller's invite quota does not admit the request.
    #[error("quota exhausted: {message}")]
    QuotaExhausted { message: String },

    /// The caller's policy does not permit the requested expiry or grouping.
    #[error("not permitted: {message}")]
    NotPermitted { message: String },

    /// A referenced invite or job does not exist.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
