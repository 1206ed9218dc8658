// src/prompt.rs
//! Prompt templates. Section headers come from [`SectionHeader`] so the parser
//! always looks for exactly what the prompt asked for.

use crate::fetch::{MarketSnapshot, NewsItem};
use crate::sections::SectionHeader;

/// Summary chars included per headline in the briefing prompt.
pub const SUMMARY_MAX_CHARS: usize = 150;

pub fn briefing_template(headline_count: usize) -> String {
    let mut out = String::new();
    out.push_str("You are a CIO. Analyze these ");
    out.push_str(&headline_count.to_string());
    out.push_str(" headlines.\nReturn result in KOREAN. Use this format:\n\n");
    out.push_str(SectionHeader::Market.literal());
    out.push_str("\nSCORE: (0-100)\nVIEW: (One sentence summary)\n\n");
    out.push_str(SectionHeader::News.literal());
    out.push('\n');
    for i in 1..=headline_count {
        out.push_str(&format!("{i}. ACTION: (Buy/Sell/Hold) | REASON: (Reason)\n"));
    }
    out
}

pub const DEEP_TEMPLATE: &str = "Analyze this news. Format in Korean:
GRADE: [S/A/B/C]
ACTION: [매수/매도/관망] | [Reason]
PROBABILITY: [0-100] | [Trend] | [Impact]
SUMMARY: -Fact
RISK: -Risk
";

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// One line per headline: `(i) title (Summary: ...)`.
///
/// Parentheses rather than brackets: a `[` at line start would read as a section header.
pub fn news_context(news: &[NewsItem]) -> String {
    news.iter()
        .enumerate()
        .map(|(i, n)| {
            let summary = n.summary.as_deref().unwrap_or_default();
            format!(
                "({}) {} (Summary: {})",
                i + 1,
                n.title,
                truncate_chars(summary, SUMMARY_MAX_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `TICKER: close (+x.xx%)` lines, or an empty string when no snapshot is available.
pub fn market_context(market: Option<&MarketSnapshot>) -> String {
    let Some(m) = market else {
        return String::new();
    };
    m.last
        .iter()
        .map(|(t, last)| {
            let chg = m.change_pct.get(t).copied().unwrap_or(0.0);
            format!("{t}: {last:.2} ({chg:+.2}%)")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn briefing_prompt(news: &[NewsItem], market: Option<&MarketSnapshot>) -> String {
    let mut p = briefing_template(news.len());
    let market_txt = market_context(market);
    if !market_txt.is_empty() {
        p.push_str("\nMARKET DATA:\n");
        p.push_str(&market_txt);
        p.push('\n');
    }
    p.push('\n');
    p.push_str(&news_context(news));
    p
}

pub fn deep_prompt(item: &NewsItem, body: &str) -> String {
    format!("{DEEP_TEMPLATE}\nTitle: {}\nBody: {}", item.title, body)
}
