// src/config/sources.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::fetch::article::ExtractLimits;
use crate::fetch::rss::google_news_search_url;
use crate::fetch::KeywordGroup;

fn default_query() -> String {
    "Fed OR CPI OR Bitcoin OR Nvidia OR Tesla OR Apple OR Gold \
     site:cnbc.com OR site:reuters.com OR site:bloomberg.com OR site:finance.yahoo.com"
        .to_string()
}
fn default_limit() -> usize {
    5
}
fn default_hl() -> String {
    "en-US".to_string()
}
fn default_gl() -> String {
    "US".to_string()
}
fn default_ceid() -> String {
    "US:en".to_string()
}
fn default_fetch_timeout_secs() -> u64 {
    10
}
fn default_keyword_groups() -> Vec<KeywordGroup> {
    vec![
        KeywordGroup {
            keywords: vec!["fed".into(), "rate".into(), "cpi".into()],
            weight: 5,
        },
        KeywordGroup {
            keywords: vec!["bitcoin".into(), "nvidia".into(), "tesla".into()],
            weight: 4,
        },
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    #[serde(default = "default_query")]
    pub query: String,
    /// Full feed URL; when set, `query`/`hl`/`gl`/`ceid` are ignored.
    #[serde(default)]
    pub feed_url: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_hl")]
    pub hl: String,
    #[serde(default = "default_gl")]
    pub gl: String,
    #[serde(default = "default_ceid")]
    pub ceid: String,
    /// Headlines must score > 0 against these groups. Empty list disables filtering.
    #[serde(default = "default_keyword_groups")]
    pub keyword_groups: Vec<KeywordGroup>,
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            query: default_query(),
            feed_url: None,
            limit: default_limit(),
            hl: default_hl(),
            gl: default_gl(),
            ceid: default_ceid(),
            keyword_groups: default_keyword_groups(),
            timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

impl NewsConfig {
    pub fn feed_url(&self) -> String {
        match &self.feed_url {
            Some(u) if !u.trim().is_empty() => u.trim().to_string(),
            _ => google_news_search_url(&self.query, &self.hl, &self.gl, &self.ceid),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub(crate) fn sanitize(&mut self) {
        if self.limit == 0 {
            self.limit = default_limit();
        }
    }
}

fn default_tickers() -> Vec<String> {
    ["^TNX", "^VIX", "BTC-USD", "GC=F", "^GSPC", "^IXIC"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_lookback_days() -> u32 {
    5
}
fn default_cache_ttl_secs() -> u64 {
    600
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    #[serde(default = "default_tickers")]
    pub tickers: Vec<String>,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    /// 0 disables the snapshot cache.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            tickers: default_tickers(),
            lookback_days: default_lookback_days(),
            cache_ttl_secs: default_cache_ttl_secs(),
            timeout_secs: default_fetch_timeout_secs(),
            base_url: None,
        }
    }
}

impl MarketConfig {
    pub fn ticker_set(&self) -> BTreeSet<String> {
        self.tickers
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub(crate) fn sanitize(&mut self) {
        if self.lookback_days < 2 {
            self.lookback_days = default_lookback_days();
        }
    }
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0 Safari/537.36"
        .to_string()
}
fn default_article_timeout_secs() -> u64 {
    4
}
fn default_min_paragraph_chars() -> usize {
    ExtractLimits::default().min_paragraph_chars
}
fn default_min_body_chars() -> usize {
    ExtractLimits::default().min_body_chars
}
fn default_max_chars() -> usize {
    ExtractLimits::default().max_chars
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_article_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_min_paragraph_chars")]
    pub min_paragraph_chars: usize,
    #[serde(default = "default_min_body_chars")]
    pub min_body_chars: usize,
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for ArticleConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_article_timeout_secs(),
            min_paragraph_chars: default_min_paragraph_chars(),
            min_body_chars: default_min_body_chars(),
            max_chars: default_max_chars(),
        }
    }
}

impl ArticleConfig {
    pub fn limits(&self) -> ExtractLimits {
        ExtractLimits {
            min_paragraph_chars: self.min_paragraph_chars,
            min_body_chars: self.min_body_chars,
            max_chars: self.max_chars.max(1),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}
