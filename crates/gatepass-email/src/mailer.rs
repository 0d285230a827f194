// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMTP mailer.
//!
//! Email is optional: when the SMTP host or credentials are absent the
//! mailer stays unconfigured and every send reports `Ok(false)` instead of
//! failing, so invite creation keeps working without a mail server.

use async_trait::async_trait;
use gatepass_config::model::SmtpConfig;
use gatepass_core::{GatepassError, Mailer};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, warn};

/// Mailer backed by an async SMTP transport.
#[derive(Debug)]
pub struct SmtpMailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build a mailer from configuration. Missing host, username, or
    /// password yields an unconfigured mailer, not an error.
    pub fn new(config: &SmtpConfig, app_name: &str) -> Result<Self, GatepassError> {
        let from: Mailbox = format!("\"{app_name}\" <{}>", config.from_email)
            .parse()
            .map_err(|e| GatepassError::Config(format!("invalid smtp.from_email: {e}")))?;

        let (Some(host), Some(username), Some(password)) =
            (&config.host, &config.username, &config.password)
        else {
            warn!("smtp host or credentials missing, invite emails disabled");
            return Ok(Self {
                transport: None,
                from,
            });
        };

        // Port 465 is implicit TLS; anything else negotiates STARTTLS
        // unless TLS is disabled outright.
        let builder = if !config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        } else if config.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host).map_err(map_smtp_err)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host).map_err(map_smtp_err)?
        };

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(username.clone(), password.clone()))
            .build();

        Ok(Self {
            transport: Some(transport),
            from,
        })
    }
}

fn map_smtp_err(e: lettre::transport::smtp::Error) -> GatepassError {
    GatepassError::Email {
        message: format!("smtp transport setup failed: {e}"),
        source: Some(Box::new(e)),
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    async fn send(&self, to: &str, subject: &str, text: &str) -> Result<bool, GatepassError> {
        let Some(transport) = &self.transport else {
            warn!(to, "mailer unconfigured, skipping send");
            return Ok(false);
        };

        let to_mailbox: Mailbox = to.parse().map_err(|e| GatepassError::Email {
            message: format!("invalid recipient address {to:?}: {e}"),
            source: None,
        })?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to_mailbox)
            .subject(subject)
            .body(text.to_string())
            .map_err(|e| GatepassError::Email {
                message: format!("failed to build message: {e}"),
                source: Some(Box::new(e)),
            })?;

        transport.send(message).await.map_err(map_smtp_err)?;
        debug!(to, "invite email sent");
        Ok(true)
    }
}
