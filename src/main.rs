//! Operator entry point. With no arguments (or `serve`) it runs the relay;
//! `seal` and `open` mint and inspect tokens offline with the same `SECRET`.

use std::env;
use std::fs;

use anyhow::{bail, Context};
use formseal::config::{OperatorSecret, ServerConfig};
use formseal::crypto::TokenCodec;
use formseal::delivery::DeliveryConfig;
use formseal::server::{self, AppState};
use tracing_subscriber::EnvFilter;

fn print_usage() {
    eprintln!(
        "Commands:\n  \
         serve                 run the HTTP relay (default)\n  \
         seal <config.json>    print a token for a delivery config\n  \
         open <token>          print the delivery config inside a token"
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    match args.get(1).map(String::as_str) {
        None | Some("serve") => serve().await,
        Some("seal") if args.len() == 3 => seal(&args[2]),
        Some("open") if args.len() == 3 => open(&args[2]),
        _ => {
            print_usage();
            bail!("unknown command or wrong number of arguments")
        }
    }
}

async fn serve() -> anyhow::Result<()> {
    let config = ServerConfig::from_env_or_file().context("loading configuration")?;
    let state = AppState::from_config(&config);
    let routes = server::router(state, config.max_body_bytes);

    server::serve(config.bind_addr(), routes)
        .await
        .with_context(|| format!("serving on {}", config.bind_addr()))
}

fn codec_from_env() -> anyhow::Result<TokenCodec> {
    let secret = OperatorSecret::new(env::var("SECRET").unwrap_or_default())?;
    Ok(TokenCodec::from_secret(secret.expose()))
}

fn seal(path: &str) -> anyhow::Result<()> {
    let codec = codec_from_env()?;
    let raw = fs::read(path).with_context(|| format!("reading {path}"))?;
    let config = DeliveryConfig::from_json(&raw).context("parsing delivery config")?;
    config.validate()?;

    println!("{}", codec.encode(&config.to_json()?)?);
    Ok(())
}

fn open(token: &str) -> anyhow::Result<()> {
    let codec = codec_from_env()?;
    let plaintext = codec.decode(token.trim())?;
    let config = DeliveryConfig::from_json(&plaintext)
        .context("token payload is not a delivery config")?;
    if let Err(err) = config.validate() {
        bail!("token holds an invalid config: {err}");
    }

    println!("{}", serde_json::to_string_pretty(&config.redacted())?);
    Ok(())
}
