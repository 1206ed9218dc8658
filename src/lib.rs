// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod cache;
pub mod config;
pub mod engine;
pub mod fetch;
pub mod metrics;
pub mod prompt;
pub mod relay;
pub mod sections;
pub mod session;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::engine::{BriefingEngine, BriefingOutcome, DeepOutcome};
pub use crate::relay::{relay, AttemptOutcome, ModelEndpoint, RelayResult};
pub use crate::sections::{parse_action, parse_section};

use tracing::{info, warn};

pub const ENV_METRICS: &str = "BRIEFING_METRICS";

/// Build the full application router from `config/briefing.toml` (or defaults).
///
/// `/metrics` is mounted when `BRIEFING_METRICS=1`. A failed recorder install
/// (e.g. a second call in one process) only logs a warning.
pub async fn app() -> anyhow::Result<axum::Router> {
    let cfg = config::BriefingConfig::load_default()?;
    let engine = BriefingEngine::from_config(&cfg)?;
    let mut router = api::router(AppState::new(engine));

    let metrics_on = std::env::var(ENV_METRICS).ok().is_some_and(|v| v == "1");
    if metrics_on {
        match metrics::Metrics::init(cfg.market.cache_ttl_secs) {
            Ok(m) => router = router.merge(m.router()),
            Err(e) => warn!(error = ?e, "metrics disabled"),
        }
    }

    info!(
        models = cfg.relay.models.len(),
        metrics = metrics_on,
        "briefing router ready"
    );
    Ok(router)
}
