use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::engine::{Briefing, BriefingEngine, BriefingOutcome, DeepAnalysis, DeepOutcome};
use crate::fetch::MarketSnapshot;
use crate::relay::{RelayAttempt, RelayResult};
use crate::session::SessionStore;

pub const SESSION_HEADER: &str = "x-session-id";
pub const CACHE_HEADER: &str = "x-briefing-cache";
const DEFAULT_SESSION: &str = "default";

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BriefingEngine>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(engine: BriefingEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            sessions: SessionStore::new(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/briefing", post(briefing))
        .route("/deep/{index}", post(deep).delete(clear_deep))
        .route("/session", axum::routing::delete(reset_session))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

fn session_id(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SESSION)
        .to_string()
}

#[derive(Debug, Default, Deserialize)]
struct RefreshQuery {
    #[serde(default)]
    refresh: Option<String>,
}

impl RefreshQuery {
    fn wanted(&self) -> bool {
        matches!(
            self.refresh.as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("1" | "true" | "yes")
        )
    }
}

#[derive(Serialize)]
struct RelayFailureBody<'a> {
    status: &'static str,
    diagnostic: String,
    attempts: &'a [RelayAttempt],
}

fn relay_failure(relay: &RelayResult) -> Response {
    let body = RelayFailureBody {
        status: "relay_failed",
        diagnostic: relay.diagnostic(),
        attempts: relay.attempt_log(),
    };
    (StatusCode::BAD_GATEWAY, Json(body)).into_response()
}

#[derive(Serialize)]
struct EmptyUpstreamBody {
    status: &'static str,
    market: Option<MarketSnapshot>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(ErrorBody { error: msg.into() })).into_response()
}

fn with_cache_header(mut resp: Response, hit: bool) -> Response {
    resp.headers_mut().insert(
        CACHE_HEADER,
        HeaderValue::from_static(if hit { "HIT" } else { "MISS" }),
    );
    resp
}

async fn briefing(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<RefreshQuery>,
) -> Response {
    let sid = session_id(&headers);

    if !q.wanted() {
        if let Some(cached) = state.sessions.get(&sid).briefing {
            return with_cache_header(Json(cached).into_response(), true);
        }
    }

    match state.engine.run_briefing().await {
        BriefingOutcome::Ready(b) => {
            state.sessions.with_session(&sid, |s| {
                // A new briefing invalidates deep results keyed by the old headline order.
                s.reset();
                s.briefing = Some(b.clone());
            });
            with_cache_header(Json::<Briefing>(b).into_response(), false)
        }
        BriefingOutcome::EmptyUpstream { market } => Json(EmptyUpstreamBody {
            status: "empty_upstream",
            market,
        })
        .into_response(),
        BriefingOutcome::RelayFailed { relay } => relay_failure(&relay),
    }
}

async fn deep(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(index): Path<usize>,
    Query(q): Query<RefreshQuery>,
) -> Response {
    let sid = session_id(&headers);
    let ctx = state.sessions.get(&sid);
    let Some(briefing) = ctx.briefing.as_ref() else {
        return error(StatusCode::CONFLICT, "no briefing in this session; POST /briefing first");
    };
    let Some(item) = index.checked_sub(1).and_then(|i| briefing.news.get(i)) else {
        return error(
            StatusCode::NOT_FOUND,
            format!("headline {index} not found (1..={})", briefing.news.len()),
        );
    };

    if !q.wanted() {
        if let Some(done) = ctx.deep_result(index) {
            return with_cache_header(Json(done.clone()).into_response(), true);
        }
    }

    let briefing_at = briefing.generated_at;
    match state.engine.deep_analysis(item).await {
        DeepOutcome::Ready(result) => {
            let stored: Option<DeepAnalysis> = state.sessions.with_session(&sid, |s| {
                // The session may have been re-briefed while the relay ran.
                if s.briefing.as_ref().map(|b| b.generated_at) != Some(briefing_at) {
                    return None;
                }
                if q.wanted() {
                    s.clear_deep(index);
                }
                s.record_deep(index, result.clone());
                Some(s.deep_result(index).cloned().unwrap_or(result))
            });
            match stored {
                Some(stored) => with_cache_header(Json(stored).into_response(), false),
                None => error(
                    StatusCode::CONFLICT,
                    "briefing changed during analysis; retry against the new headlines",
                ),
            }
        }
        DeepOutcome::RelayFailed { relay } => relay_failure(&relay),
    }
}

async fn clear_deep(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(index): Path<usize>,
) -> StatusCode {
    let sid = session_id(&headers);
    match state.sessions.with_session(&sid, |s| s.clear_deep(index)) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

async fn reset_session(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    let sid = session_id(&headers);
    state.sessions.remove(&sid);
    state.engine.clear_cache();
    StatusCode::NO_CONTENT
}
