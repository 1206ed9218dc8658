// tests/common/mod.rs
//
// Shared fakes for integration tests. Each test binary uses a subset.
#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;

use briefing_relay::config::{MarketConfig, NewsConfig};
use briefing_relay::engine::{BriefingEngine, Sources};
use briefing_relay::fetch::rss::FixtureFeedSource;
use briefing_relay::fetch::{ArticleSource, MarketSource, NewsItem, NewsSource};
use briefing_relay::relay::{
    AttemptOutcome, BackoffPolicy, ModelEndpoint, ModelTransport, Relay, RelaySettings,
};

pub const GOOGLE_NEWS_XML: &str = include_str!("../fixtures/google_news_rss.xml");

pub fn ok(text: &str) -> AttemptOutcome {
    AttemptOutcome::Success {
        text: text.to_string(),
    }
}

pub fn err(status: u16) -> AttemptOutcome {
    AttemptOutcome::RemoteError {
        status,
        body: format!("status {status}"),
    }
}

/// Per-endpoint scripted outcomes. Each call pops the front; the last one repeats.
/// Endpoints without a script fail with a transport error.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<HashMap<String, VecDeque<AttemptOutcome>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, endpoint: &str, outcomes: Vec<AttemptOutcome>) -> Self {
        self.script
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), outcomes.into());
        self
    }

    /// (endpoint, prompt) per call, in order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelTransport for ScriptedTransport {
    async fn generate(
        &self,
        endpoint: &ModelEndpoint,
        prompt: &str,
        _timeout: Duration,
    ) -> AttemptOutcome {
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.name.clone(), prompt.to_string()));
        let mut script = self.script.lock().unwrap();
        match script.get_mut(&endpoint.name) {
            Some(q) if q.len() > 1 => q.pop_front().unwrap(),
            Some(q) => q.front().cloned().unwrap_or(AttemptOutcome::RateLimited),
            None => AttemptOutcome::TransportFailure {
                message: "no script".into(),
            },
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

pub fn settings(max_rounds: u32, backoff: BackoffPolicy) -> RelaySettings {
    RelaySettings {
        max_rounds,
        timeout: Duration::from_secs(20),
        backoff,
    }
}

/// News source that always errors.
pub struct FailingNews;

#[async_trait]
impl NewsSource for FailingNews {
    async fn fetch_entries(&self, _feed_url: &str) -> anyhow::Result<Vec<NewsItem>> {
        Err(anyhow!("simulated timeout"))
    }
    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Market source with fixed series and a call counter.
#[derive(Default)]
pub struct FakeMarket {
    pub series: BTreeMap<String, Vec<f64>>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl FakeMarket {
    pub fn with(series: &[(&str, &[f64])]) -> Self {
        Self {
            series: series
                .iter()
                .map(|(t, c)| (t.to_string(), c.to_vec()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketSource for FakeMarket {
    async fn daily_closes(
        &self,
        tickers: &BTreeSet<String>,
        _lookback_days: u32,
    ) -> anyhow::Result<BTreeMap<String, Vec<f64>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("market down"));
        }
        Ok(self
            .series
            .iter()
            .filter(|(t, _)| tickers.contains(*t))
            .map(|(t, c)| (t.clone(), c.clone()))
            .collect())
    }
    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Article source returning a fixed body (or nothing).
pub struct FakeArticles {
    pub body: Option<String>,
}

#[async_trait]
impl ArticleSource for FakeArticles {
    async fn fetch_body(&self, _link: &str) -> anyhow::Result<Option<String>> {
        match &self.body {
            Some(b) => Ok(Some(b.clone())),
            None => Err(anyhow!("403 forbidden")),
        }
    }
}

pub fn market_cfg(tickers: &[&str]) -> MarketConfig {
    MarketConfig {
        tickers: tickers.iter().map(|t| t.to_string()).collect(),
        ..MarketConfig::default()
    }
}

/// Engine over the RSS fixture, a fake market, and the given transport.
pub fn engine_with(
    transport: Arc<dyn ModelTransport>,
    models: &[&str],
    news: Arc<dyn NewsSource>,
    market: Arc<FakeMarket>,
    article_body: Option<&str>,
) -> BriefingEngine {
    let relay = Relay::new(
        transport,
        ModelEndpoint::from_names(models),
        settings(1, BackoffPolicy::None),
    );
    let sources = Sources {
        news,
        market,
        articles: Arc::new(FakeArticles {
            body: article_body.map(str::to_string),
        }),
    };
    BriefingEngine::new(
        sources,
        relay,
        NewsConfig::default(),
        market_cfg(&["^GSPC", "^VIX"]),
    )
}

pub fn fixture_news() -> Arc<dyn NewsSource> {
    Arc::new(FixtureFeedSource::from_fixture_str(GOOGLE_NEWS_XML))
}

pub const BRIEFING_TEXT: &str = "[MARKET]\nSCORE: 64\nVIEW: 금리 동결로 관망세\n\n[NEWS]\n\
1. ACTION: Hold | REASON: 연준 동결\n\
2. ACTION: Sell | REASON: ETF 자금 유출\n\
3. ACTION: Buy | REASON: AI 투자 확대\n\
4. ACTION: 관망 | REASON: 물가 발표 대기\n";
