// src/fetch/market.rs
//! Daily closes from the Yahoo Finance chart endpoint.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::MarketSource;

pub const YAHOO_CHART_BASE: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

#[derive(Deserialize)]
struct ChartResponse {
    chart: Chart,
}
#[derive(Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
}
#[derive(Deserialize)]
struct ChartResult {
    indicators: Indicators,
}
#[derive(Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}
#[derive(Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Pull `chart.result[0].indicators.quote[0].close`, skipping null entries.
pub fn parse_chart_closes(body: &str) -> Result<Vec<f64>> {
    let resp: ChartResponse = serde_json::from_str(body).context("parsing chart json")?;
    let closes = resp
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .and_then(|r| r.indicators.quote.into_iter().next())
        .map(|q| q.close.into_iter().flatten().collect::<Vec<_>>())
        .ok_or_else(|| anyhow!("chart response has no quote data"))?;
    Ok(closes)
}

pub struct YahooChartSource {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl YahooChartSource {
    pub fn new(timeout: Duration) -> Self {
        Self::with_base_url(YAHOO_CHART_BASE, timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    async fn closes_for(&self, ticker: &str, lookback_days: u32) -> Result<Vec<f64>> {
        let url = format!("{}/{}", self.base_url, ticker);
        let range = format!("{lookback_days}d");
        let body = self
            .client
            .get(&url)
            .header("User-Agent", "Mozilla/5.0")
            .query(&[("range", range.as_str()), ("interval", "1d")])
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("chart get {ticker}"))?
            .error_for_status()
            .with_context(|| format!("chart status {ticker}"))?
            .text()
            .await?;
        parse_chart_closes(&body)
    }
}

#[async_trait]
impl MarketSource for YahooChartSource {
    /// Tickers that fail individually are skipped; the call only fails if all of them do.
    async fn daily_closes(
        &self,
        tickers: &BTreeSet<String>,
        lookback_days: u32,
    ) -> Result<BTreeMap<String, Vec<f64>>> {
        let mut out = BTreeMap::new();
        let mut last_err = None;
        for t in tickers {
            match self.closes_for(t, lookback_days).await {
                Ok(closes) => {
                    out.insert(t.clone(), closes);
                }
                Err(e) => {
                    tracing::debug!(error = ?e, ticker = %t, "chart fetch failed");
                    last_err = Some(e);
                }
            }
        }
        match (out.is_empty(), last_err) {
            (true, Some(e)) => Err(e),
            _ => Ok(out),
        }
    }

    fn name(&self) -> &'static str {
        "yahoo"
    }
}
