//! Process configuration. Settings come either from plain environment
//! variables or from a JSON file named by `FORMSEAL_CONFIG`; in the file, any
//! string of the form `$ENV{NAME}` is replaced by that environment variable
//! after parsing so the secret never has to live on disk.

use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use zeroize::Zeroize;

pub const CONFIG_PATH_VAR: &str = "FORMSEAL_CONFIG";

const DEFAULT_LISTEN_ADDR: &str = ":8080";
const DEFAULT_SMTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SECRET is not set")]
    MissingSecret,
    #[error("config file unreadable: {0}")]
    Io(String),
    #[error("config parse failed: {0}")]
    Parse(String),
    #[error("environment variable {0} is required but missing")]
    MissingEnvVar(String),
    #[error("invalid value for {0}")]
    Invalid(&'static str),
}

/// Operator secret. Compared against the `key` parameter of `/encrypt` and
/// fed once into key derivation; never serialized, never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct OperatorSecret(String);

impl OperatorSecret {
    pub fn new(value: impl Into<String>) -> Result<Self, ConfigError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        Ok(Self(value))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for OperatorSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<redacted>")
    }
}

impl Drop for OperatorSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub secret: OperatorSecret,
    pub listen_addr: String,
    pub smtp_timeout_secs: u64,
    pub max_body_bytes: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawServerConfig {
    secret: Option<String>,
    listen_addr: Option<String>,
    smtp_timeout_secs: Option<u64>,
    max_body_bytes: Option<usize>,
}

impl ServerConfig {
    /// Loads from `FORMSEAL_CONFIG` when it is set, otherwise from
    /// `SECRET`, `ADDR`, `SMTP_TIMEOUT` and `MAX_BODY_BYTES`.
    pub fn from_env_or_file() -> Result<Self, ConfigError> {
        match env::var(CONFIG_PATH_VAR) {
            Ok(path) if !path.is_empty() => Self::load(path),
            _ => Self::from_env(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = OperatorSecret::new(env::var("SECRET").unwrap_or_default())?;
        let listen_addr = env::var("ADDR")
            .ok()
            .filter(|addr| !addr.is_empty())
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let smtp_timeout_secs = parse_env("SMTP_TIMEOUT")?.unwrap_or(DEFAULT_SMTP_TIMEOUT_SECS);
        let max_body_bytes = parse_env("MAX_BODY_BYTES")?.unwrap_or(DEFAULT_MAX_BODY_BYTES);

        Ok(Self {
            secret,
            listen_addr,
            smtp_timeout_secs,
            max_body_bytes,
        })
    }

    /// Loads a JSON file and expands `$ENV{...}` placeholders.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw_json = fs::read_to_string(&path).map_err(|e| ConfigError::Io(format!("{e}")))?;
        let mut value: Value =
            serde_json::from_str(&raw_json).map_err(|e| ConfigError::Parse(format!("{e}")))?;
        resolve_env_placeholders(&mut value)?;
        let raw: RawServerConfig =
            serde_json::from_value(value).map_err(|e| ConfigError::Parse(format!("{e}")))?;

        Ok(Self {
            secret: OperatorSecret::new(raw.secret.unwrap_or_default())?,
            listen_addr: raw
                .listen_addr
                .filter(|addr| !addr.is_empty())
                .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string()),
            smtp_timeout_secs: raw.smtp_timeout_secs.unwrap_or(DEFAULT_SMTP_TIMEOUT_SECS),
            max_body_bytes: raw.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES),
        })
    }

    /// Bindable socket address. A bare `:port` listens on every interface.
    pub fn bind_addr(&self) -> String {
        if self.listen_addr.starts_with(':') {
            format!("0.0.0.0{}", self.listen_addr)
        } else {
            self.listen_addr.clone()
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(text) if !text.is_empty() => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(name)),
        _ => Ok(None),
    }
}

fn resolve_env_placeholders(value: &mut Value) -> Result<(), ConfigError> {
    match value {
        Value::String(text) => {
            if let Some(var) = extract_env_placeholder(text).map(str::to_owned) {
                *text = env::var(&var).map_err(|_| ConfigError::MissingEnvVar(var))?;
            }
        }
        Value::Array(items) => {
            for item in items {
                resolve_env_placeholders(item)?;
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                resolve_env_placeholders(item)?;
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
    Ok(())
}

fn extract_env_placeholder(text: &str) -> Option<&str> {
    text.strip_prefix("$ENV{")
        .and_then(|rest| rest.strip_suffix('}'))
        .filter(|inner| !inner.is_empty())
}
