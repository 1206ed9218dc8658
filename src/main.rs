//! Briefing Relay: binary entrypoint.
//! Boots the Axum HTTP server with the briefing engine and per-session state.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable local tracing logs.
/// Activation requires BRIEFING_DEV_LOG=1 or an explicit RUST_LOG.
/// BRIEFING_LOG_JSON=1 switches to JSON lines.
fn enable_dev_tracing() {
    let dev_flag = std::env::var("BRIEFING_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");
    let has_rust_log = std::env::var("RUST_LOG").is_ok();
    if !(dev_flag || has_rust_log) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("briefing_relay=info,warn"));
    let json = std::env::var("BRIEFING_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    // try_init: the hosting runtime may already have installed a subscriber.
    let _ = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let router = briefing_relay::app().await?;
    Ok(router.into())
}
