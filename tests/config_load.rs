// tests/config_load.rs
//
// The shipped config/briefing.toml parses, and production wiring builds from it
// without touching the network.

use std::env;

use axum::body::Body;
use http::{Request, StatusCode};
use tower::ServiceExt as _;

use briefing_relay::config::relay::{ENV_API_KEY, ENV_MAX_ROUNDS, ENV_TIMEOUT_SECS};
use briefing_relay::config::{BriefingConfig, ENV_CONFIG_PATH};
use briefing_relay::relay::BackoffPolicy;
use briefing_relay::BriefingEngine;

fn clear_env() {
    for k in [ENV_CONFIG_PATH, ENV_API_KEY, ENV_MAX_ROUNDS, ENV_TIMEOUT_SECS] {
        env::remove_var(k);
    }
}

#[serial_test::serial]
#[test]
fn shipped_config_parses() {
    clear_env();
    let cfg = BriefingConfig::load_from_file("config/briefing.toml").expect("sample config");

    assert_eq!(
        cfg.relay.models,
        vec!["gemini-2.5-flash", "gemini-2.0-flash", "gemini-1.5-flash"]
    );
    assert_eq!(cfg.relay.backoff, BackoffPolicy::Fixed { delay_ms: 2000 });
    assert_eq!(cfg.relay.api_key, "", "ENV key with no GOOGLE_API_KEY set");
    assert_eq!(cfg.news.keyword_groups.len(), 2);
    assert_eq!(cfg.market.tickers.len(), 6);
    assert_eq!(cfg.article.max_chars, 3000);
}

#[serial_test::serial]
#[test]
fn engine_builds_from_config() {
    clear_env();
    env::set_var(ENV_API_KEY, "test-key");
    env::set_var(ENV_MAX_ROUNDS, "2");

    let cfg = BriefingConfig::load_from_file("config/briefing.toml").expect("sample config");
    let engine = BriefingEngine::from_config(&cfg).expect("engine");

    assert_eq!(engine.relay().endpoints().len(), 3);
    assert_eq!(engine.relay().endpoints()[0].name, "gemini-2.5-flash");
    assert_eq!(engine.relay().settings().max_rounds, 2);
    assert_eq!(engine.cache_ttl().as_secs(), 600);
    clear_env();
}

#[serial_test::serial]
#[tokio::test]
async fn missing_config_path_is_an_error() {
    clear_env();
    env::set_var(ENV_CONFIG_PATH, "/definitely/not/here.toml");
    assert!(briefing_relay::app().await.is_err());
    clear_env();
}

#[serial_test::serial]
#[tokio::test]
async fn app_serves_health() {
    clear_env();
    let app = briefing_relay::app().await.expect("app");
    let resp = app
        .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
        .await
        .expect("oneshot");
    assert_eq!(resp.status(), StatusCode::OK);
}
