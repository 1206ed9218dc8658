// src/fetch/article.rs
//! Article body extraction: `<p>` text only, length-filtered and truncated.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};

use super::ArticleSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractLimits {
    /// Paragraphs shorter than this (in chars, after trim) are dropped.
    pub min_paragraph_chars: usize,
    /// Joined text shorter than this counts as "no usable body".
    pub min_body_chars: usize,
    /// Hard cap on returned chars.
    pub max_chars: usize,
}

impl Default for ExtractLimits {
    fn default() -> Self {
        Self {
            min_paragraph_chars: 20,
            min_body_chars: 200,
            max_chars: 3_000,
        }
    }
}

/// Join paragraph text from `html`. `None` when the result is below `min_body_chars`.
pub fn extract_paragraphs(html: &str, limits: &ExtractLimits) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("p").ok()?;

    let paragraphs: Vec<String> = document
        .select(&selector)
        .map(|p| {
            p.text()
                .collect::<Vec<_>>()
                .join(" ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|t| t.chars().count() >= limits.min_paragraph_chars.max(1))
        .collect();

    let joined = paragraphs.join(" ");
    if joined.chars().count() < limits.min_body_chars {
        return None;
    }
    Some(joined.chars().take(limits.max_chars).collect())
}

/// Plain GET with a browser-like user agent.
pub struct HttpArticleSource {
    client: reqwest::Client,
    user_agent: String,
    timeout: Duration,
    limits: ExtractLimits,
}

impl HttpArticleSource {
    pub fn new(user_agent: &str, timeout: Duration, limits: ExtractLimits) -> Self {
        Self {
            client: reqwest::Client::new(),
            user_agent: user_agent.to_string(),
            timeout,
            limits,
        }
    }
}

#[async_trait]
impl ArticleSource for HttpArticleSource {
    async fn fetch_body(&self, link: &str) -> Result<Option<String>> {
        let html = self
            .client
            .get(link)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .timeout(self.timeout)
            .send()
            .await
            .context("article get()")?
            .error_for_status()
            .context("article status")?
            .text()
            .await
            .context("article .text()")?;
        Ok(extract_paragraphs(&html, &self.limits))
    }
}
