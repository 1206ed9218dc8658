//! # Briefing Engine
//! Wires fetchers, the relay, and the section parser into the two user-facing
//! operations: the headline briefing and the per-headline deep analysis.
//!
//! Flow: market (cached) + news → `EmptyUpstream` if no headlines → prompt →
//! relay → sections / score / per-headline actions.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::cache::MarketCache;
use crate::config::{BriefingConfig, MarketConfig, NewsConfig};
use crate::fetch::article::HttpArticleSource;
use crate::fetch::market::YahooChartSource;
use crate::fetch::rss::HttpFeedSource;
use crate::fetch::{self, ArticleSource, MarketSnapshot, MarketSource, NewsItem, NewsSource};
use crate::prompt;
use crate::relay::gemini::GeminiTransport;
use crate::relay::{Relay, RelayResult};
use crate::sections::{parse_action, parse_score_view, BriefingSections, Stance};

/// Per-headline verdict parsed from the briefing text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadlineAction {
    /// 1-based, matching the numbering in the prompt.
    pub index: usize,
    pub title: String,
    pub link: String,
    pub action: String,
    pub reason: String,
    pub stance: Stance,
}

/// A completed headline briefing.
#[derive(Debug, Clone, Serialize)]
pub struct Briefing {
    pub market: Option<MarketSnapshot>,
    pub news: Vec<NewsItem>,
    pub text: String,
    pub served_by: String,
    pub sections: BriefingSections,
    pub score: u8,
    pub view: String,
    pub actions: Vec<HeadlineAction>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BriefingOutcome {
    Ready(Briefing),
    /// No headlines: nothing to analyze, the relay is not called.
    EmptyUpstream { market: Option<MarketSnapshot> },
    /// Every endpoint failed; `relay` carries the attempt log.
    RelayFailed { relay: RelayResult },
}

/// Result of one deep analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeepAnalysis {
    pub content: String,
    pub model: String,
    /// `false` when the feed summary stood in for the article body.
    pub used_article_body: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeepOutcome {
    Ready(DeepAnalysis),
    RelayFailed { relay: RelayResult },
}

/// External collaborators, injectable for tests.
#[derive(Clone)]
pub struct Sources {
    pub news: Arc<dyn NewsSource>,
    pub market: Arc<dyn MarketSource>,
    pub articles: Arc<dyn ArticleSource>,
}

pub struct BriefingEngine {
    sources: Sources,
    relay: Relay,
    cache: MarketCache,
    news_cfg: NewsConfig,
    market_cfg: MarketConfig,
}

impl BriefingEngine {
    pub fn new(sources: Sources, relay: Relay, news_cfg: NewsConfig, market_cfg: MarketConfig) -> Self {
        let cache = MarketCache::new(market_cfg.cache_ttl());
        Self {
            sources,
            relay,
            cache,
            news_cfg,
            market_cfg,
        }
    }

    /// Production wiring: RSS over HTTP, Yahoo chart, article scraper, Gemini.
    pub fn from_config(cfg: &BriefingConfig) -> anyhow::Result<Self> {
        info!(
            models = ?cfg.relay.models,
            max_rounds = cfg.relay.max_rounds,
            key_len = cfg.relay.api_key.len(),
            "briefing engine config loaded"
        );
        let transport = GeminiTransport::new(cfg.relay.api_key.clone(), cfg.relay.base_url.as_deref())?;
        let relay = Relay::new(Arc::new(transport), cfg.relay.endpoints(), cfg.relay.settings());

        let market: Arc<dyn MarketSource> = match cfg.market.base_url.as_deref() {
            Some(base) => Arc::new(YahooChartSource::with_base_url(base, cfg.market.timeout())),
            None => Arc::new(YahooChartSource::new(cfg.market.timeout())),
        };
        let sources = Sources {
            news: Arc::new(HttpFeedSource::new(cfg.news.timeout())),
            market,
            articles: Arc::new(HttpArticleSource::new(
                &cfg.article.user_agent,
                cfg.article.timeout(),
                cfg.article.limits(),
            )),
        };
        Ok(Self::new(sources, relay, cfg.news.clone(), cfg.market.clone()))
    }

    pub fn relay(&self) -> &Relay {
        &self.relay
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache.ttl()
    }

    /// Market snapshot through the TTL cache.
    pub async fn market(&self) -> Option<MarketSnapshot> {
        let tickers = self.market_cfg.ticker_set();
        if let Some(hit) = self.cache.get(&tickers) {
            return hit;
        }
        let snap = fetch::fetch_market(
            self.sources.market.as_ref(),
            &tickers,
            self.market_cfg.lookback_days,
        )
        .await;
        self.cache.put(&tickers, snap.clone());
        snap
    }

    pub async fn news(&self) -> Vec<NewsItem> {
        fetch::fetch_news(
            self.sources.news.as_ref(),
            &self.news_cfg.feed_url(),
            self.news_cfg.limit,
            &self.news_cfg.keyword_groups,
        )
        .await
    }

    /// Drop cached market data (e.g. on a full session reset).
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub async fn run_briefing(&self) -> BriefingOutcome {
        let market = self.market().await;
        let news = self.news().await;
        if news.is_empty() {
            warn!("no headlines; skipping relay");
            return BriefingOutcome::EmptyUpstream { market };
        }

        let prompt = prompt::briefing_prompt(&news, market.as_ref());
        let result = self.relay.execute(&prompt).await;
        if let (Some(text), Some(served_by)) = (result.text(), result.served_by()) {
            return BriefingOutcome::Ready(assemble_briefing(
                market,
                news,
                text.to_string(),
                served_by.to_string(),
            ));
        }
        BriefingOutcome::RelayFailed { relay: result }
    }

    /// Deep analysis for one headline: article body, else the feed summary.
    pub async fn deep_analysis(&self, item: &NewsItem) -> DeepOutcome {
        let (body, used_article_body) =
            fetch::fetch_article_or_summary(self.sources.articles.as_ref(), item).await;

        let prompt = prompt::deep_prompt(item, &body);
        let result = self.relay.execute(&prompt).await;
        if let (Some(text), Some(model)) = (result.text(), result.served_by()) {
            return DeepOutcome::Ready(DeepAnalysis {
                content: text.to_string(),
                model: model.to_string(),
                used_article_body,
            });
        }
        DeepOutcome::RelayFailed { relay: result }
    }
}

/// Parse a successful briefing text into its structured form.
pub fn assemble_briefing(
    market: Option<MarketSnapshot>,
    news: Vec<NewsItem>,
    text: String,
    served_by: String,
) -> Briefing {
    let sections = BriefingSections::parse(&text);
    let (score, view) = parse_score_view(&text);
    let actions = news
        .iter()
        .enumerate()
        .map(|(i, n)| {
            let (action, reason) = parse_action(&text, i + 1);
            HeadlineAction {
                index: i + 1,
                title: n.title.clone(),
                link: n.link.clone(),
                stance: Stance::classify(&action),
                action,
                reason,
            }
        })
        .collect();

    Briefing {
        market,
        news,
        text,
        served_by,
        sections,
        score,
        view,
        actions,
        generated_at: Utc::now(),
    }
}
