// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message body templating for invite emails.

/// Variables substituted into invite message templates.
#[derive(Debug, Clone)]
pub struct TemplateVariables {
    pub inviter_username: String,
    pub expiration_date: String,
    pub invite_url: String,
}

/// Substitute `{{inviter_username}}`, `{{expiration_date}}`, and
/// `{{invite_url}}` placeholders. Unknown placeholders are left untouched.
pub fn render(template: &str, vars: &TemplateVariables) -> String {
    template
        .replace("{{inviter_username}}", &vars.inviter_username)
        .replace("{{expiration_date}}", &vars.expiration_date)
        .replace("{{invite_url}}", &vars.invite_url)
}
