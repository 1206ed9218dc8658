use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

/// Register descriptions so every series shows up on /metrics from the first scrape.
fn describe_all() {
    describe_counter!("relay_attempts_total", "Relay attempts by outcome label.");
    describe_counter!(
        "relay_exhausted_total",
        "Relay runs where every endpoint failed."
    );
    describe_counter!("news_items_total", "Headlines kept after cleaning/filtering.");
    describe_counter!("news_fetch_errors_total", "Feed fetch/parse errors.");
    describe_histogram!("news_parse_ms", "Feed parse time in milliseconds.");
    describe_counter!("market_fetch_errors_total", "Market data fetch errors.");
    describe_counter!("market_cache_hits_total", "Market snapshot cache hits.");
    describe_counter!(
        "article_fetch_fallback_total",
        "Deep analyses that fell back to the feed summary."
    );
    describe_gauge!("market_cache_ttl_secs", "Configured market cache TTL.");
}

impl Metrics {
    /// Install the Prometheus recorder (once per process) and publish the cache TTL.
    pub fn init(cache_ttl_secs: u64) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        describe_all();
        gauge!("market_cache_ttl_secs").set(cache_ttl_secs as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
