//! HTTP surface: minting tokens for the operator and accepting form posts
//! from anywhere.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::{Form, FromRequest, Multipart, Query, Request, State};
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::{TcpListener, ToSocketAddrs};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::{OperatorSecret, ServerConfig};
use crate::crypto::integrity::secrets_match;
use crate::crypto::TokenCodec;
use crate::delivery::DeliveryConfig;
use crate::error::{AppError, Result};
use crate::mail::{Mailer, SmtpMailer, Submission};

/// Field carrying the sealed token in a form submission.
pub const TOKEN_FIELD: &str = "config";

/// Long-lived, read-only state shared by every request. Built once at
/// startup; nothing in it is mutated afterwards.
#[derive(Clone)]
pub struct AppState {
    pub codec: Arc<TokenCodec>,
    pub secret: Arc<OperatorSecret>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(secret: OperatorSecret, mailer: Arc<dyn Mailer>) -> Self {
        let codec = TokenCodec::from_secret(secret.expose());
        Self {
            codec: Arc::new(codec),
            secret: Arc::new(secret),
            mailer,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        let mailer = SmtpMailer::new(Duration::from_secs(config.smtp_timeout_secs));
        Self::new(config.secret.clone(), Arc::new(mailer))
    }
}

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/encrypt", post(encrypt))
        .route("/", get(submit).post(submit))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

#[derive(Debug, Deserialize)]
struct EncryptParams {
    key: Option<String>,
}

/// Validates a delivery configuration and answers with its sealed token.
/// Gated on the operator secret in the `key` query parameter.
async fn encrypt(
    State(state): State<AppState>,
    Query(params): Query<EncryptParams>,
    body: Bytes,
) -> Result<String> {
    let presented = params.key.unwrap_or_default();
    if !secrets_match(&presented, state.secret.expose()) {
        return Err(AppError::Unauthorized);
    }

    let config =
        DeliveryConfig::from_json(&body).map_err(|e| AppError::ConfigJson(e.to_string()))?;
    config.validate()?;

    let canonical = config
        .to_json()
        .map_err(|e| AppError::Serialize(e.to_string()))?;
    let token = state.codec.encode(&canonical)?;

    tracing::info!(
        host = %config.smtp_host,
        recipients = config.to_addresses.len(),
        fields = config.expected_fields.len(),
        "minted delivery token"
    );
    Ok(token)
}

/// Accepts a form post carrying a token plus the visitor's field values and
/// relays them as one email. Body fields take precedence over query fields.
async fn submit(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    request: Request,
) -> Result<&'static str> {
    let mut values = query;
    if !matches!(*request.method(), Method::GET | Method::HEAD) {
        values.extend(read_form_body(request, &state).await?);
    }

    let token = values
        .get(TOKEN_FIELD)
        .filter(|token| !token.is_empty())
        .ok_or(AppError::MissingToken)?;

    let plaintext = state.codec.decode(token)?;
    let config = DeliveryConfig::from_json(&plaintext)
        .map_err(|e| AppError::TokenPayload(e.to_string()))?;
    config.validate()?;

    let submission = Submission::collect(&config.expected_fields, |name| {
        values.get(name).map(String::as_str)
    });
    state.mailer.send(&config, &submission).await?;

    tracing::info!(
        host = %config.smtp_host,
        recipients = config.to_addresses.len(),
        "form submission relayed"
    );
    Ok("Form submitted successfully")
}

/// Reads a urlencoded or multipart body into name/value pairs. A body that
/// cannot be read fails the whole request; file parts are skipped.
async fn read_form_body(request: Request, state: &AppState) -> Result<HashMap<String, String>> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map_or(false, |value| value.starts_with("multipart/form-data"));

    if !is_multipart {
        let Form(values) = Form::<HashMap<String, String>>::from_request(request, state)
            .await
            .map_err(|e| AppError::form_body(e.status(), e.body_text()))?;
        return Ok(values);
    }

    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(|e| AppError::form_body(e.status(), e.body_text()))?;
    let mut values = HashMap::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.file_name().is_some() {
            continue;
        }
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        let value = field.text().await.map_err(multipart_error)?;
        values.entry(name).or_insert(value);
    }
    Ok(values)
}

fn multipart_error(err: MultipartError) -> AppError {
    AppError::form_body(err.status(), err.body_text())
}

pub async fn serve<A: ToSocketAddrs>(addr: A, router: Router) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    if let Ok(local) = listener.local_addr() {
        tracing::info!("listening on {local}");
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

pub async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutting down");
}
