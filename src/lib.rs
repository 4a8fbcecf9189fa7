//! Formseal relays HTML form submissions to SMTP without trusting the form.
//! Delivery settings (server, credentials, recipients, subject, expected
//! fields) are sealed into an AES-256-GCM token that only this process can
//! open, so the token can sit in a public page without being read or edited.

pub mod config;
pub mod crypto;
pub mod delivery;
pub mod error;
pub mod mail;
pub mod server;
