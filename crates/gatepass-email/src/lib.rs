// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Invite email delivery: SMTP transport plus message templating.

pub mod mailer;
pub mod template;

pub use mailer::SmtpMailer;
pub use template::{render, TemplateVariables};
