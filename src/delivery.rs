//! The delivery configuration that a token carries: where to relay, as whom,
//! to whom, and which form fields to forward.
//!
//! Wire names follow the JSON the operator posts to `/encrypt`
//! (`smtpHost`, `from`, `to`, `fields`, ...). Every field defaults when
//! absent so that a missing key surfaces as a [`ValidationError`] naming it
//! rather than as an opaque parse failure.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0:?} parameter is required")]
pub struct ValidationError(pub &'static str);

impl ValidationError {
    pub fn field(&self) -> &'static str {
        self.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    #[serde(rename = "smtpHost")]
    pub smtp_host: String,
    #[serde(rename = "smtpPort")]
    pub smtp_port: i64,
    #[serde(rename = "smtpUsername")]
    pub smtp_username: String,
    #[serde(rename = "smtpPassword")]
    pub smtp_password: String,
    #[serde(rename = "from", alias = "fromAddress")]
    pub from_address: String,
    #[serde(rename = "to", alias = "toAddresses")]
    pub to_addresses: Vec<String>,
    pub subject: String,
    #[serde(rename = "fields", alias = "expectedFields")]
    pub expected_fields: Vec<String>,
}

type Check = (&'static str, fn(&DeliveryConfig) -> bool);

/// Required-field checks in reporting order. The first failing entry wins.
const CHECKS: &[Check] = &[
    ("smtpHost", |c| !c.smtp_host.is_empty()),
    ("smtpPort", |c| c.port().is_some()),
    ("smtpUsername", |c| !c.smtp_username.is_empty()),
    ("smtpPassword", |c| !c.smtp_password.is_empty()),
    ("from", |c| !c.from_address.is_empty()),
    ("to", |c| !c.to_addresses.is_empty()),
    ("subject", |c| !c.subject.is_empty()),
    ("fields", |c| !c.expected_fields.is_empty()),
];

impl DeliveryConfig {
    /// Checks every required field in a fixed order and reports the first
    /// one that is missing, empty or (for the port) outside `1..=65535`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match CHECKS.iter().find(|(_, ok)| !ok(self)) {
            Some((name, _)) => Err(ValidationError(*name)),
            None => Ok(()),
        }
    }

    /// Port as a socket port. Only meaningful after [`validate`](Self::validate).
    pub fn port(&self) -> Option<u16> {
        u16::try_from(self.smtp_port).ok().filter(|p| *p > 0)
    }

    /// Canonical JSON encoding used as token plaintext. Unknown input keys
    /// are not carried over.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Copy that is safe to print or log.
    pub fn redacted(&self) -> Self {
        Self {
            smtp_password: "<redacted>".to_string(),
            ..self.clone()
        }
    }
}
