// src/relay/mod.rs
//! Relay: ordered fallback across named model endpoints.
//!
//! One prompt is offered to each endpoint in priority order, round after round,
//! until one of them answers. Every attempt is classified into an
//! [`AttemptOutcome`] and folded into a single [`RelayResult`]:
//!
//! - `Success`          → stop immediately, first success wins
//! - `RateLimited`      → wait the backoff delay, then move to the *next* endpoint
//! - `RemoteError`      → move on immediately
//! - `TransportFailure` → move on immediately
//!
//! Endpoints are tried strictly one at a time; the number of calls never exceeds
//! `endpoints.len() * max_rounds`.

pub mod backoff;
pub mod gemini;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use serde::Serialize;
use tracing::{debug, info, warn};

pub use backoff::BackoffPolicy;

/// Upper bound on how much of a remote error body ends up in a diagnostic line.
const DIAGNOSTIC_BODY_MAX_CHARS: usize = 300;

/// One named remote inference target. `priority` is its position in the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelEndpoint {
    pub name: String,
    pub priority: usize,
}

impl ModelEndpoint {
    pub fn new(name: impl Into<String>, priority: usize) -> Self {
        Self {
            name: name.into(),
            priority,
        }
    }

    /// Build an ordered endpoint list; priority follows list order. Blank names are skipped.
    pub fn from_names<I, S>(names: I) -> Vec<ModelEndpoint>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .map(|n| n.as_ref().trim().to_string())
            .filter(|n| !n.is_empty())
            .enumerate()
            .map(|(i, n)| ModelEndpoint::new(n, i))
            .collect()
    }
}

/// Classified outcome of a single call to a single endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success { text: String },
    RateLimited,
    RemoteError { status: u16, body: String },
    TransportFailure { message: String },
}

impl AttemptOutcome {
    /// Stable label used for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            AttemptOutcome::Success { .. } => "success",
            AttemptOutcome::RateLimited => "rate_limited",
            AttemptOutcome::RemoteError { .. } => "remote_error",
            AttemptOutcome::TransportFailure { .. } => "transport_failure",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success { .. })
    }
}

/// One recorded attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayAttempt {
    pub endpoint: String,
    /// 1-based round in which the attempt happened.
    pub round: u32,
    pub outcome: AttemptOutcome,
}

impl fmt::Display for RelayAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] round {}: ", self.endpoint, self.round)?;
        match &self.outcome {
            AttemptOutcome::Success { .. } => write!(f, "ok"),
            AttemptOutcome::RateLimited => write!(f, "rate limited (429)"),
            AttemptOutcome::RemoteError { status, body } => {
                write!(f, "error {status}: {}", clip(body, DIAGNOSTIC_BODY_MAX_CHARS))
            }
            AttemptOutcome::TransportFailure { message } => {
                write!(f, "transport failure: {message}")
            }
        }
    }
}

/// Outcome of a complete fallback sequence.
///
/// Fields are private: `text` is present exactly when `served_by` is present and
/// the last logged attempt is a success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayResult {
    text: Option<String>,
    served_by: Option<String>,
    attempt_log: Vec<RelayAttempt>,
}

impl RelayResult {
    fn served(text: String, endpoint: &str, attempt_log: Vec<RelayAttempt>) -> Self {
        Self {
            text: Some(text),
            served_by: Some(endpoint.to_string()),
            attempt_log,
        }
    }

    fn exhausted(attempt_log: Vec<RelayAttempt>) -> Self {
        Self {
            text: None,
            served_by: None,
            attempt_log,
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn served_by(&self) -> Option<&str> {
        self.served_by.as_deref()
    }

    pub fn attempt_log(&self) -> &[RelayAttempt] {
        &self.attempt_log
    }

    pub fn is_success(&self) -> bool {
        self.text.is_some()
    }

    /// Human-readable trail: one attempt per line.
    pub fn diagnostic(&self) -> String {
        if self.attempt_log.is_empty() {
            return "no model endpoints configured".to_string();
        }
        self.attempt_log
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Injectable collaborator performing one remote call.
///
/// Implementations must honour `timeout` and must not panic on remote failures:
/// every failure is expressed as an [`AttemptOutcome`].
#[async_trait]
pub trait ModelTransport: Send + Sync {
    async fn generate(
        &self,
        endpoint: &ModelEndpoint,
        prompt: &str,
        timeout: Duration,
    ) -> AttemptOutcome;

    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Tunables for one relay run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySettings {
    pub max_rounds: u32,
    pub timeout: Duration,
    pub backoff: BackoffPolicy,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            max_rounds: 1,
            timeout: Duration::from_secs(20),
            backoff: BackoffPolicy::default(),
        }
    }
}

/// Run the fallback sequence for `prompt` over `endpoints`.
pub async fn relay(
    transport: &dyn ModelTransport,
    prompt: &str,
    endpoints: &[ModelEndpoint],
    settings: &RelaySettings,
) -> RelayResult {
    let rounds = settings.max_rounds.max(1);
    let total_calls = endpoints.len().saturating_mul(rounds as usize);
    let mut log: Vec<RelayAttempt> = Vec::new();

    for round in 1..=rounds {
        for endpoint in endpoints {
            debug!(model = %endpoint.name, round, provider = transport.name(), "relay attempt");
            let outcome = transport
                .generate(endpoint, prompt, settings.timeout)
                .await;
            counter!("relay_attempts_total", "outcome" => outcome.label()).increment(1);

            let rate_limited = matches!(outcome, AttemptOutcome::RateLimited);
            match &outcome {
                AttemptOutcome::Success { text } => {
                    info!(model = %endpoint.name, round, attempts = log.len() + 1, "relay served");
                    let text = text.clone();
                    log.push(RelayAttempt {
                        endpoint: endpoint.name.clone(),
                        round,
                        outcome,
                    });
                    return RelayResult::served(text, &endpoint.name, log);
                }
                AttemptOutcome::RateLimited => {
                    warn!(model = %endpoint.name, round, "relay endpoint rate limited");
                }
                AttemptOutcome::RemoteError { status, .. } => {
                    warn!(model = %endpoint.name, round, status, "relay endpoint error");
                }
                AttemptOutcome::TransportFailure { message } => {
                    warn!(model = %endpoint.name, round, error = %message, "relay transport failure");
                }
            }

            log.push(RelayAttempt {
                endpoint: endpoint.name.clone(),
                round,
                outcome,
            });

            // No point in waiting when nothing is left to try.
            if rate_limited && log.len() < total_calls {
                let delay = settings.backoff.delay_for(round);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    counter!("relay_exhausted_total").increment(1);
    warn!(attempts = log.len(), "relay exhausted all endpoints");
    RelayResult::exhausted(log)
}

/// A transport bound to its endpoint list and settings.
#[derive(Clone)]
pub struct Relay {
    transport: Arc<dyn ModelTransport>,
    endpoints: Vec<ModelEndpoint>,
    settings: RelaySettings,
}

impl Relay {
    pub fn new(
        transport: Arc<dyn ModelTransport>,
        endpoints: Vec<ModelEndpoint>,
        settings: RelaySettings,
    ) -> Self {
        Self {
            transport,
            endpoints,
            settings,
        }
    }

    pub fn endpoints(&self) -> &[ModelEndpoint] {
        &self.endpoints
    }

    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    pub async fn execute(&self, prompt: &str) -> RelayResult {
        relay(self.transport.as_ref(), prompt, &self.endpoints, &self.settings).await
    }
}

fn clip(s: &str, max: usize) -> String {
    let s = s.trim();
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push_str("...");
    out
}
