// tests/engine_pipeline.rs
//
// End-to-end briefing and deep analysis through the engine, with every
// collaborator faked (feed fixture, market, articles, model transport).

mod common;

use std::sync::Arc;

use briefing_relay::engine::{BriefingOutcome, DeepOutcome};
use briefing_relay::fetch::NewsItem;
use briefing_relay::relay::AttemptOutcome;
use briefing_relay::sections::SectionHeader;
use common::{
    engine_with, err, fixture_news, ok, FailingNews, FakeMarket, ScriptedTransport, BRIEFING_TEXT,
};

const ARTICLE: &str = "The Federal Reserve left its benchmark rate unchanged on Wednesday.";

fn market() -> Arc<FakeMarket> {
    Arc::new(FakeMarket::with(&[
        ("^GSPC", &[5000.0, 5050.0]),
        ("^VIX", &[15.0, 14.0]),
    ]))
}

fn headline() -> NewsItem {
    NewsItem {
        title: "Fed holds rates steady".into(),
        link: "https://example.com/fed".into(),
        summary: Some("Fed keeps rates unchanged.".into()),
        published: None,
    }
}

#[tokio::test]
async fn briefing_ready_with_market_and_actions() {
    let t = Arc::new(ScriptedTransport::new().on("gemini-2.5-flash", vec![ok(BRIEFING_TEXT)]));
    let engine = engine_with(t.clone(), &["gemini-2.5-flash"], fixture_news(), market(), None);

    let BriefingOutcome::Ready(b) = engine.run_briefing().await else {
        panic!("expected a ready briefing");
    };

    assert_eq!(b.news.len(), 4);
    assert_eq!(b.served_by, "gemini-2.5-flash");
    assert_eq!(b.score, 64);
    assert_eq!(b.actions.len(), 4);
    assert_eq!(b.actions[1].action, "Sell");
    assert!(b.market.is_some());
    assert!(b.sections.get(SectionHeader::Market).contains("SCORE: 64"));

    // The prompt carries market lines and numbered headlines.
    let calls = t.calls();
    assert_eq!(calls.len(), 1);
    let prompt = &calls[0].1;
    assert!(prompt.contains("^GSPC: 5050.00 (+1.00%)"), "{prompt}");
    assert!(prompt.contains("(1) Live Fed holds rates steady"), "{prompt}");
    assert!(prompt.contains("4. ACTION:"));
}

#[tokio::test]
async fn briefing_without_market_data_still_runs() {
    let t = Arc::new(ScriptedTransport::new().on("m", vec![ok(BRIEFING_TEXT)]));
    let engine = engine_with(
        t.clone(),
        &["m"],
        fixture_news(),
        Arc::new(FakeMarket::failing()),
        None,
    );

    let BriefingOutcome::Ready(b) = engine.run_briefing().await else {
        panic!("expected a ready briefing");
    };
    assert!(b.market.is_none());
    assert!(!t.calls()[0].1.contains("MARKET DATA"));
}

#[tokio::test]
async fn no_headlines_skips_the_relay() {
    let t = Arc::new(ScriptedTransport::new().on("m", vec![ok("unused")]));
    let engine = engine_with(t.clone(), &["m"], Arc::new(FailingNews), market(), None);

    let outcome = engine.run_briefing().await;

    assert!(matches!(
        outcome,
        BriefingOutcome::EmptyUpstream { market: Some(_) }
    ));
    assert_eq!(t.call_count(), 0);
}

#[tokio::test]
async fn relay_failure_surfaces_the_attempt_log() {
    let t = Arc::new(
        ScriptedTransport::new()
            .on("a", vec![AttemptOutcome::RateLimited])
            .on("b", vec![err(500)]),
    );
    let engine = engine_with(t, &["a", "b"], fixture_news(), market(), None);

    let BriefingOutcome::RelayFailed { relay } = engine.run_briefing().await else {
        panic!("expected relay failure");
    };
    assert_eq!(relay.attempt_log().len(), 2);
    assert!(relay.diagnostic().contains("rate limited (429)"));
}

#[tokio::test]
async fn deep_analysis_prefers_article_body() {
    let t = Arc::new(ScriptedTransport::new().on("m", vec![ok("GRADE: A")]));
    let engine = engine_with(t.clone(), &["m"], fixture_news(), market(), Some(ARTICLE));

    let DeepOutcome::Ready(d) = engine.deep_analysis(&headline()).await else {
        panic!("expected deep result");
    };

    assert_eq!(d.content, "GRADE: A");
    assert_eq!(d.model, "m");
    assert!(d.used_article_body);
    let prompt = &t.calls()[0].1;
    assert!(prompt.contains("GRADE: [S/A/B/C]"));
    assert!(prompt.ends_with(&format!("Title: Fed holds rates steady\nBody: {ARTICLE}")));
}

#[tokio::test]
async fn deep_analysis_falls_back_to_summary() {
    let t = Arc::new(ScriptedTransport::new().on("m", vec![ok("GRADE: B")]));
    let engine = engine_with(t.clone(), &["m"], fixture_news(), market(), None);

    let DeepOutcome::Ready(d) = engine.deep_analysis(&headline()).await else {
        panic!("expected deep result");
    };

    assert!(!d.used_article_body);
    assert!(t.calls()[0].1.ends_with("Body: Fed keeps rates unchanged."));
}

#[tokio::test]
async fn deep_analysis_reports_relay_failure() {
    let t = Arc::new(ScriptedTransport::new().on("m", vec![err(403)]));
    let engine = engine_with(t, &["m"], fixture_news(), market(), None);

    let DeepOutcome::RelayFailed { relay } = engine.deep_analysis(&headline()).await else {
        panic!("expected relay failure");
    };
    assert_eq!(relay.served_by(), None);
    assert!(relay.diagnostic().contains("[m] round 1: error 403"));
}
