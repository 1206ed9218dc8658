// src/fetch/mod.rs
//! Best-effort market + news fetching.
//!
//! The public entry points (`fetch_news`, `fetch_market`, `fetch_article_or_summary`)
//! never fail: errors from the underlying sources are logged and collapsed into
//! empty / absent values.

pub mod article;
pub mod market;
pub mod rss;

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};

/// One headline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    pub summary: Option<String>,
    /// Unix seconds, when the feed provides a parseable date.
    pub published: Option<u64>,
}

/// Closing prices and day-over-day % changes, keyed by ticker.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub last: BTreeMap<String, f64>,
    pub change_pct: BTreeMap<String, f64>,
}

impl MarketSnapshot {
    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }

    /// Build from per-ticker close series (oldest first).
    ///
    /// Tickers with fewer than two closes, or a zero previous close, are left out.
    /// Returns `None` when no ticker qualifies.
    pub fn from_closes(series: &BTreeMap<String, Vec<f64>>) -> Option<Self> {
        let mut snap = MarketSnapshot::default();
        for (ticker, closes) in series {
            let finite: Vec<f64> = closes.iter().copied().filter(|c| c.is_finite()).collect();
            let [.., prev, last] = finite.as_slice() else {
                continue;
            };
            if *prev == 0.0 {
                continue;
            }
            snap.last.insert(ticker.clone(), *last);
            snap.change_pct
                .insert(ticker.clone(), (last - prev) / prev * 100.0);
        }
        if snap.is_empty() {
            None
        } else {
            Some(snap)
        }
    }
}

/// Source of headlines (RSS/Atom over HTTP in production, fixtures in tests).
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn fetch_entries(&self, feed_url: &str) -> anyhow::Result<Vec<NewsItem>>;
    fn name(&self) -> &'static str;
}

/// Source of daily closes, oldest first.
#[async_trait]
pub trait MarketSource: Send + Sync {
    async fn daily_closes(
        &self,
        tickers: &BTreeSet<String>,
        lookback_days: u32,
    ) -> anyhow::Result<BTreeMap<String, Vec<f64>>>;
    fn name(&self) -> &'static str;
}

/// Source of article body text.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// `Ok(None)` means the page was reachable but had no usable text.
    async fn fetch_body(&self, link: &str) -> anyhow::Result<Option<String>>;
}

/// Strip `[ ] { } "` and surrounding whitespace. Total and idempotent.
pub fn clean_title(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, '[' | ']' | '{' | '}' | '"'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// A weighted keyword group; a headline containing any keyword gains `weight`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordGroup {
    pub keywords: Vec<String>,
    pub weight: i32,
}

/// Sum of the weights of matching groups (case-insensitive substring match).
pub fn headline_score(title: &str, groups: &[KeywordGroup]) -> i32 {
    let t = title.to_lowercase();
    groups
        .iter()
        .filter(|g| {
            g.keywords
                .iter()
                .any(|k| !k.is_empty() && t.contains(&k.to_lowercase()))
        })
        .map(|g| g.weight)
        .sum()
}

/// Fetch, clean, optionally keyword-filter, and truncate to `limit`.
///
/// Feed order is preserved. With an empty `groups` slice no filtering happens.
pub async fn fetch_news(
    source: &dyn NewsSource,
    feed_url: &str,
    limit: usize,
    groups: &[KeywordGroup],
) -> Vec<NewsItem> {
    let entries = match source.fetch_entries(feed_url).await {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = ?e, source = source.name(), "news fetch failed");
            counter!("news_fetch_errors_total").increment(1);
            return Vec::new();
        }
    };

    let items: Vec<NewsItem> = entries
        .into_iter()
        .map(|mut it| {
            it.title = clean_title(&it.title);
            it
        })
        .filter(|it| !it.title.is_empty())
        .filter(|it| groups.is_empty() || headline_score(&it.title, groups) > 0)
        .take(limit)
        .collect();

    counter!("news_items_total").increment(items.len() as u64);
    if items.is_empty() {
        tracing::warn!(source = source.name(), "news feed yielded no usable headlines");
    }
    items
}

/// Fetch closes and compute a snapshot; `None` on any failure.
pub async fn fetch_market(
    source: &dyn MarketSource,
    tickers: &BTreeSet<String>,
    lookback_days: u32,
) -> Option<MarketSnapshot> {
    if tickers.is_empty() {
        return None;
    }
    match source.daily_closes(tickers, lookback_days.max(2)).await {
        Ok(series) => {
            let snap = MarketSnapshot::from_closes(&series);
            if snap.is_none() {
                tracing::warn!(source = source.name(), "market data had fewer than two closes");
            }
            snap
        }
        Err(e) => {
            tracing::warn!(error = ?e, source = source.name(), "market fetch failed");
            counter!("market_fetch_errors_total").increment(1);
            None
        }
    }
}

/// Article body, or the feed summary when the page can't be used.
/// The flag is `true` when the text came from the article itself.
pub async fn fetch_article_or_summary(
    source: &dyn ArticleSource,
    item: &NewsItem,
) -> (String, bool) {
    match source.fetch_body(&item.link).await {
        Ok(Some(body)) => return (body, true),
        Ok(None) => tracing::debug!(link = %item.link, "article had no usable paragraphs"),
        Err(e) => tracing::debug!(error = ?e, link = %item.link, "article fetch failed"),
    }
    counter!("article_fetch_fallback_total").increment(1);
    (item.summary.clone().unwrap_or_default(), false)
}
