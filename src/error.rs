//! Request-level errors and their HTTP mapping.
//!
//! The `Display` text is what gets logged. Clients only ever see
//! [`AppError::public_message`], which for token failures is one fixed string
//! regardless of whether the token was garbled, truncated or sealed under a
//! different key.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::crypto::TokenError;
use crate::delivery::ValidationError;
use crate::mail::MailError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid secret key")]
    Unauthorized,

    #[error("failed to decode JSON config: {0}")]
    ConfigJson(String),

    #[error("invalid config: {0}")]
    InvalidConfig(#[from] ValidationError),

    #[error("unreadable form body ({0}): {1}")]
    FormBody(StatusCode, String),

    #[error("no config provided")]
    MissingToken,

    #[error("token rejected: {0}")]
    Token(#[from] TokenError),

    #[error("failed to decode JSON data: {0}")]
    TokenPayload(String),

    #[error("failed to serialize config: {0}")]
    Serialize(String),

    #[error("failed to send email: {0}")]
    Mail(#[from] MailError),
}

impl AppError {
    /// A form body that could not be read. Oversized bodies keep their 413,
    /// everything else is a plain 400.
    pub fn form_body(status: StatusCode, detail: String) -> Self {
        let status = if status == StatusCode::PAYLOAD_TOO_LARGE {
            status
        } else {
            StatusCode::BAD_REQUEST
        };
        AppError::FormBody(status, detail)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::FormBody(status, _) => *status,
            AppError::ConfigJson(_)
            | AppError::InvalidConfig(_)
            | AppError::MissingToken
            | AppError::TokenPayload(_) => StatusCode::BAD_REQUEST,
            AppError::Token(TokenError::MalformedToken | TokenError::Authentication) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Token(TokenError::Encryption(_))
            | AppError::Serialize(_)
            | AppError::Mail(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn public_message(&self) -> String {
        match self {
            AppError::Unauthorized => "Invalid secret key".to_string(),
            AppError::ConfigJson(detail) => format!("Failed to decode JSON config: {detail}"),
            AppError::InvalidConfig(err) => format!("Invalid config: {err}"),
            AppError::FormBody(status, _) if *status == StatusCode::PAYLOAD_TOO_LARGE => {
                "Form data too large".to_string()
            }
            AppError::FormBody(..) => "Failed to read form data".to_string(),
            AppError::MissingToken => "No config provided".to_string(),
            AppError::Token(TokenError::MalformedToken | TokenError::Authentication) => {
                "Failed to decrypt data".to_string()
            }
            AppError::Token(TokenError::Encryption(_)) => {
                "Error while encrypting JSON config".to_string()
            }
            AppError::TokenPayload(_) => "Failed to decode JSON data".to_string(),
            AppError::Serialize(_) => "Error while serializing config".to_string(),
            AppError::Mail(_) => "Failed to send email".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "{self}");
        } else {
            tracing::warn!(status = status.as_u16(), "{self}");
        }
        (status, self.public_message()).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
