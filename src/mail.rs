//! Relays one form submission as a plain-text email to the SMTP server named
//! by a decoded [`DeliveryConfig`].
//!
//! The body is one `name: value` line per expected field, in the order the
//! configuration lists them. The transport is rebuilt for every submission
//! since host and credentials come from the token, not from the process.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

use crate::delivery::DeliveryConfig;

const IMPLICIT_TLS_PORT: u16 = 465;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid email address: {0}")]
    InvalidAddress(String),
    #[error("failed to build message: {0}")]
    Build(String),
    #[error("SMTP error: {0}")]
    Smtp(String),
}

/// Field values a visitor typed, restricted to the configuration's expected
/// field names and kept in their configured order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    pub fields: Vec<(String, String)>,
}

impl Submission {
    /// Picks each expected field out of `lookup`. Absent values become empty
    /// strings; names not in `expected` are never consulted.
    pub fn collect<'a, F>(expected: &[String], mut lookup: F) -> Self
    where
        F: FnMut(&str) -> Option<&'a str>,
    {
        let fields = expected
            .iter()
            .map(|name| {
                let value = lookup(name).unwrap_or_default().to_string();
                (name.clone(), value)
            })
            .collect();
        Self { fields }
    }
}

/// Flat `key: value` body, CRLF terminated.
pub fn render_body(submission: &Submission) -> String {
    submission
        .fields
        .iter()
        .map(|(name, value)| format!("{name}: {value}\r\n"))
        .collect()
}

pub fn build_message(
    config: &DeliveryConfig,
    submission: &Submission,
) -> Result<Message, MailError> {
    let from: Mailbox = config
        .from_address
        .parse()
        .map_err(|_| MailError::InvalidAddress(config.from_address.clone()))?;

    let mut builder = Message::builder().from(from);
    for to in &config.to_addresses {
        let mailbox: Mailbox = to
            .parse()
            .map_err(|_| MailError::InvalidAddress(to.clone()))?;
        builder = builder.to(mailbox);
    }

    builder
        .subject(&config.subject)
        .header(ContentType::TEXT_PLAIN)
        .body(render_body(submission))
        .map_err(|e| MailError::Build(e.to_string()))
}

/// Delivery backend. The HTTP layer only talks to this trait so tests can
/// swap in a recorder.
#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    async fn send(
        &self,
        config: &DeliveryConfig,
        submission: &Submission,
    ) -> Result<(), MailError>;
}

/// SMTP delivery through lettre.
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    timeout: Duration,
}

impl SmtpMailer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn transport(
        &self,
        config: &DeliveryConfig,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
        let port = config
            .port()
            .ok_or_else(|| MailError::Smtp(format!("invalid port {}", config.smtp_port)))?;
        let tls_params = TlsParameters::new(config.smtp_host.clone())
            .map_err(|e| MailError::Smtp(e.to_string()))?;
        let tls = if port == IMPLICIT_TLS_PORT {
            Tls::Wrapper(tls_params)
        } else {
            Tls::Opportunistic(tls_params)
        };

        Ok(
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                .port(port)
                .tls(tls)
                .timeout(Some(self.timeout))
                .credentials(Credentials::new(
                    config.smtp_username.clone(),
                    config.smtp_password.clone(),
                ))
                .authentication(vec![Mechanism::Plain, Mechanism::Login])
                .build(),
        )
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(
        &self,
        config: &DeliveryConfig,
        submission: &Submission,
    ) -> Result<(), MailError> {
        let message = build_message(config, submission)?;
        let transport = self.transport(config)?;

        tracing::debug!(
            host = %config.smtp_host,
            port = config.smtp_port,
            recipients = config.to_addresses.len(),
            "relaying submission"
        );
        transport
            .send(message)
            .await
            .map_err(|e| MailError::Smtp(e.to_string()))?;
        Ok(())
    }
}
