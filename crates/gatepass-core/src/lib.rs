// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Gatepass invite manager.
//!
//! This crate provides the shared error type, the duration vocabulary, the
//! invite/job status types, and the collaborator traits (identity provider,
//! mailer) implemented by the adapter crates.

pub mod duration;
pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use duration::{DurationToken, Period, EXPIRY_LADDER};
pub use error::GatepassError;
pub use traits::{DirectoryApi, Mailer};
pub use types::{InviteStatus, JobStatus};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gatepass_error_has_all_variants() {
        let _config = GatepassError::Config("test".into());
        let _storage = GatepassError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _directory = GatepassError::Directory {
            message: "test".into(),
            source: None,
        };
        let _email = GatepassError::Email {
            message: "test".into(),
            source: None,
        };
        let _quota = GatepassError::QuotaExhausted {
            message: "test".into(),
        };
        let _permitted = GatepassError::NotPermitted {
            message: "test".into(),
        };
        let _not_found = GatepassError::NotFound { what: "test".into() };
        let _internal = GatepassError::Internal("test".into());
    }

    #[test]
    fn collaborator_traits_are_object_safe() {
        fn _directory(_: &dyn DirectoryApi) {}
        fn _mailer(_: &dyn Mailer) {}
    }
}
