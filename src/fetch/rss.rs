// src/fetch/rss.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use once_cell::sync::Lazy;
use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;
use time::{
    format_description::well_known::{Rfc2822, Rfc3339},
    OffsetDateTime, UtcOffset,
};

use super::{NewsItem, NewsSource};

pub const GOOGLE_NEWS_SEARCH: &str = "https://news.google.com/rss/search";

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}
#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<AtomText>,
    #[serde(default)]
    link: Vec<AtomLink>,
    summary: Option<AtomText>,
    published: Option<String>,
    updated: Option<String>,
}
#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    text: String,
}
#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

fn parse_rfc2822_to_unix(ts: &str) -> Option<u64> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|x| u64::try_from(x).ok())
}

fn parse_rfc3339_to_unix(ts: &str) -> Option<u64> {
    OffsetDateTime::parse(ts.trim(), &Rfc3339)
        .ok()
        .and_then(|dt| u64::try_from(dt.unix_timestamp()).ok())
}

/// Build a Google News RSS search URL for `query`.
pub fn google_news_search_url(query: &str, hl: &str, gl: &str, ceid: &str) -> String {
    match url::Url::parse_with_params(
        GOOGLE_NEWS_SEARCH,
        &[("q", query), ("hl", hl), ("gl", gl), ("ceid", ceid)],
    ) {
        Ok(u) => u.to_string(),
        // GOOGLE_NEWS_SEARCH is a valid constant; keep a plain fallback anyway.
        Err(_) => format!("{GOOGLE_NEWS_SEARCH}?q={query}"),
    }
}

/// Feed descriptions are escaped HTML fragments: decode, drop tags, collapse whitespace.
pub fn summary_text(s: &str) -> String {
    static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("ws regex"));

    let decoded = html_escape::decode_html_entities(s);
    let no_tags = RE_TAGS.replace_all(&decoded, " ");
    // Entities can be double-escaped in some feeds (&amp;nbsp;).
    let decoded_again = html_escape::decode_html_entities(&no_tags);
    RE_WS.replace_all(&decoded_again, " ").trim().to_string()
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Parse an RSS 2.0 document, falling back to Atom.
///
/// Titles are returned raw; cleaning happens in `fetch_news`.
pub fn parse_feed(xml: &str) -> Result<Vec<NewsItem>> {
    let t0 = std::time::Instant::now();
    let xml = scrub_html_entities_for_xml(xml);

    let items = match from_str::<Rss>(&xml) {
        Ok(rss) => rss
            .channel
            .item
            .into_iter()
            .map(|it| NewsItem {
                title: it.title.unwrap_or_default(),
                link: it.link.unwrap_or_default().trim().to_string(),
                summary: it.description.as_deref().map(summary_text).and_then(non_empty),
                published: it.pub_date.as_deref().and_then(parse_rfc2822_to_unix),
            })
            .collect(),
        Err(rss_err) => {
            let atom: AtomFeed = from_str(&xml)
                .with_context(|| format!("parsing feed xml (not RSS: {rss_err})"))?;
            atom.entry
                .into_iter()
                .map(|e| {
                    let link = e
                        .link
                        .iter()
                        .find(|l| l.rel.as_deref().unwrap_or("alternate") == "alternate")
                        .or_else(|| e.link.first())
                        .and_then(|l| l.href.clone())
                        .unwrap_or_default();
                    NewsItem {
                        title: e.title.map(|t| t.text).unwrap_or_default(),
                        link,
                        summary: e.summary.map(|s| summary_text(&s.text)).and_then(non_empty),
                        published: e
                            .published
                            .or(e.updated)
                            .as_deref()
                            .and_then(parse_rfc3339_to_unix),
                    }
                })
                .collect()
        }
    };

    histogram!("news_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    Ok(items)
}

/// Fetches feeds over HTTP.
pub struct HttpFeedSource {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFeedSource {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl NewsSource for HttpFeedSource {
    async fn fetch_entries(&self, feed_url: &str) -> Result<Vec<NewsItem>> {
        let body = self
            .client
            .get(feed_url)
            .timeout(self.timeout)
            .send()
            .await
            .context("feed http get()")?
            .error_for_status()
            .context("feed http status")?
            .text()
            .await
            .context("feed http .text()")?;
        parse_feed(&body)
    }

    fn name(&self) -> &'static str {
        "rss"
    }
}

/// Serves a fixed XML document; used for tests and offline runs.
pub struct FixtureFeedSource {
    xml: String,
}

impl FixtureFeedSource {
    pub fn from_fixture_str(xml: &str) -> Self {
        Self {
            xml: xml.to_string(),
        }
    }
}

#[async_trait]
impl NewsSource for FixtureFeedSource {
    async fn fetch_entries(&self, _feed_url: &str) -> Result<Vec<NewsItem>> {
        parse_feed(&self.xml)
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
