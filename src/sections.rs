// src/sections.rs
//! Section parsing for LLM briefing text.
//!
//! The model is asked to answer under bracketed headers (`[MARKET]`, `[NEWS]`).
//! Everything here is pure and total: a missing header or line yields a default,
//! never an error.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Headers the briefing prompt asks for. The prompt renders these same literals,
/// so prompt and parser cannot drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionHeader {
    Market,
    News,
}

impl SectionHeader {
    pub const ALL: [SectionHeader; 2] = [SectionHeader::Market, SectionHeader::News];

    pub fn literal(self) -> &'static str {
        match self {
            SectionHeader::Market => "[MARKET]",
            SectionHeader::News => "[NEWS]",
        }
    }
}

impl fmt::Display for SectionHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.literal())
    }
}

/// Text after `header` up to the next `"\n["` (or end of text), trimmed.
/// Case-sensitive; `header` is matched literally. Missing header → `""`.
pub fn parse_section(text: &str, header: &str) -> String {
    if header.is_empty() {
        return String::new();
    }
    let pattern = format!(r"(?s){}(.*?)(?:\n\[|\z)", regex::escape(header));
    let Ok(re) = Regex::new(&pattern) else {
        return String::new();
    };
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Parsed sections keyed by header. Lookups of absent headers return `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BriefingSections {
    sections: BTreeMap<SectionHeader, String>,
}

impl BriefingSections {
    pub fn parse(text: &str) -> Self {
        Self::parse_with(text, &SectionHeader::ALL)
    }

    pub fn parse_with(text: &str, headers: &[SectionHeader]) -> Self {
        let sections = headers
            .iter()
            .map(|h| (*h, parse_section(text, h.literal())))
            .collect();
        Self { sections }
    }

    pub fn get(&self, header: SectionHeader) -> &str {
        self.sections.get(&header).map(String::as_str).unwrap_or("")
    }
}

/// Default returned by [`parse_action`] when no line matches.
pub const DEFAULT_ACTION: &str = "Hold";

/// Find `"<index>. ACTION: <rest>"` and split `<rest>` on the first `|`.
///
/// `ACTION` is matched case-insensitively; `NEWS <index> ACTION:` is accepted as a
/// secondary form. A leading `REASON:` label on the reason is dropped.
/// No match → `("Hold", "")`.
pub fn parse_action(text: &str, index: usize) -> (String, String) {
    let primary = format!(r"\b{index}\.[ \t]*(?i:ACTION)[: \t]*(.*)");
    let secondary = format!(r"(?i:NEWS)[ \t_]*{index}[ \t_]*(?i:ACTION)[: \t]*(.*)");

    let rest = [primary, secondary].iter().find_map(|p| {
        Regex::new(p)
            .ok()?
            .captures(text)?
            .get(1)
            .map(|m| m.as_str().to_string())
    });

    let Some(rest) = rest else {
        return (DEFAULT_ACTION.to_string(), String::new());
    };

    let (action, reason) = match rest.split_once('|') {
        Some((a, r)) => (a.trim(), strip_reason_label(r.trim())),
        None => (rest.trim(), ""),
    };
    let action = if action.is_empty() { DEFAULT_ACTION } else { action };
    (action.to_string(), reason.to_string())
}

fn strip_reason_label(s: &str) -> &str {
    static RE_LABEL: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)^REASON\s*:\s*").expect("reason label regex"));
    match RE_LABEL.find(s) {
        Some(m) => s[m.end()..].trim(),
        None => s,
    }
}

/// Default score when the model omits `SCORE:`.
pub const DEFAULT_SCORE: u8 = 50;

/// Read `SCORE: <0-100>` and `VIEW: <line>`. Defaults: `(50, "")`.
pub fn parse_score_view(text: &str) -> (u8, String) {
    static RE_SCORE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"SCORE[: \t]*(\d+)").expect("score regex"));
    static RE_VIEW: Lazy<Regex> = Lazy::new(|| Regex::new(r"VIEW[: \t]*(.*)").expect("view regex"));

    let score = RE_SCORE
        .captures(text)
        .and_then(|c| c[1].parse::<u64>().ok())
        .map(|s| s.min(100) as u8)
        .unwrap_or(DEFAULT_SCORE);
    let view = RE_VIEW
        .captures(text)
        .map(|c| crate::fetch::clean_title(&c[1]))
        .unwrap_or_default();
    (score, view)
}

/// Coarse direction of an action label (English or Korean).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Buy,
    Sell,
    Hold,
}

impl Stance {
    pub fn classify(action: &str) -> Self {
        let a = action.to_lowercase();
        if a.contains("buy") || a.contains("매수") {
            Stance::Buy
        } else if a.contains("sell") || a.contains("매도") {
            Stance::Sell
        } else {
            Stance::Hold
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_stops_at_next_bracket_line() {
        let text = "[A]foo\n[B]bar";
        assert_eq!(parse_section(text, "[A]"), "foo");
        assert_eq!(parse_section(text, "[B]"), "bar");
    }

    #[test]
    fn missing_header_is_empty() {
        assert_eq!(parse_section("[A]foo", "[C]"), "");
        assert_eq!(parse_section("", "[A]"), "");
        assert_eq!(parse_section("anything", ""), "");
    }

    #[test]
    fn header_is_case_sensitive_and_literal() {
        let text = "[market]lower\n[MARKET]upper";
        assert_eq!(parse_section(text, "[MARKET]"), "upper");
        // regex metacharacters in the header are matched literally
        assert_eq!(parse_section("(x+)? body", "(x+)?"), "body");
    }

    #[test]
    fn multi_line_section_body_kept() {
        let text = "[MARKET]\nSCORE: 70\nVIEW: calm\n[NEWS]\n1. ACTION: Buy | x";
        assert_eq!(parse_section(text, "[MARKET]"), "SCORE: 70\nVIEW: calm");
    }

    #[test]
    fn briefing_sections_default_to_empty() {
        let s = BriefingSections::parse("[MARKET]\nSCORE: 10");
        assert_eq!(s.get(SectionHeader::Market), "SCORE: 10");
        assert_eq!(s.get(SectionHeader::News), "");
    }

    #[test]
    fn action_split_on_first_pipe() {
        assert_eq!(
            parse_action("1. ACTION: Buy | strong earnings", 1),
            ("Buy".to_string(), "strong earnings".to_string())
        );
        assert_eq!(
            parse_action("2. action: Sell | REASON: guidance cut | weak", 2),
            ("Sell".to_string(), "guidance cut | weak".to_string())
        );
    }

    #[test]
    fn action_defaults_to_hold() {
        assert_eq!(
            parse_action("1. ACTION: Buy | x", 99),
            ("Hold".to_string(), String::new())
        );
    }

    #[test]
    fn action_index_does_not_match_longer_number() {
        let text = "11. ACTION: Sell | late\n1. ACTION: Buy | early";
        assert_eq!(parse_action(text, 1).0, "Buy");
    }

    #[test]
    fn action_secondary_form() {
        assert_eq!(
            parse_action("NEWS_3_ACTION: 관망 | 불확실성", 3),
            ("관망".to_string(), "불확실성".to_string())
        );
    }

    #[test]
    fn score_view_defaults_and_clamp() {
        assert_eq!(parse_score_view("nothing"), (50, String::new()));
        let (s, v) = parse_score_view("SCORE: 250\nVIEW: \"[Risk-on]\" tone");
        assert_eq!(s, 100);
        assert_eq!(v, "Risk-on tone");
    }

    #[test]
    fn empty_labels_do_not_capture_the_next_line() {
        assert_eq!(parse_score_view("SCORE:\n80\nVIEW:\n[NEWS]"), (50, String::new()));
        let text = "1. ACTION:\n2. ACTION: Buy | momentum";
        assert_eq!(parse_action(text, 1), ("Hold".to_string(), String::new()));
        assert_eq!(parse_action(text, 2).0, "Buy");
    }

    #[test]
    fn stance_classification() {
        assert_eq!(Stance::classify("Buy"), Stance::Buy);
        assert_eq!(Stance::classify("매도"), Stance::Sell);
        assert_eq!(Stance::classify("관망"), Stance::Hold);
    }
}
