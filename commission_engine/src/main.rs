//! Entry point for the Commission Engine binary.
//!
//! Running this binary starts an HTTP server exposing the commission
//! API.  Configuration comes from `COMMISSION_*` environment variables
//! (see [`commission_engine::config::AppConfig`]); log filtering follows
//! `RUST_LOG` and defaults to `info`.

use anyhow::Result;
use commission_engine::api::{serve, AppState};
use commission_engine::config::AppConfig;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let state = Arc::new(AppState::from_config(&config)?);
    serve(&config.bind_addr, state).await
}
