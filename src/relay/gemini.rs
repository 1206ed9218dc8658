// src/relay/gemini.rs
//! Gemini `generateContent` transport.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{AttemptOutcome, ModelEndpoint, ModelTransport};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Calls `POST {base}/v1beta/models/{model}:generateContent?key={api_key}`.
pub struct GeminiTransport {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiTransport {
    pub fn new(api_key: impl Into<String>, base_url: Option<&str>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("briefing-relay/0.1")
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.into(),
        })
    }

    fn endpoint_url(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}
#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}
#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

impl<'a> GenerateRequest<'a> {
    fn from_prompt(prompt: &'a str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        }
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}
#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}
#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}
#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Extract `candidates[0].content.parts[0].text` from a 200 body.
pub fn extract_text(body: &str) -> Option<String> {
    let resp: GenerateResponse = serde_json::from_str(body).ok()?;
    let text = resp
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .next()?
        .text?;
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Map an HTTP status + body to an outcome.
pub fn classify_response(status: u16, body: String) -> AttemptOutcome {
    match status {
        200 => match extract_text(&body) {
            Some(text) => AttemptOutcome::Success { text },
            // 200 without the expected payload (e.g. safety block) counts as an error.
            None => AttemptOutcome::RemoteError { status, body },
        },
        429 => AttemptOutcome::RateLimited,
        _ => AttemptOutcome::RemoteError { status, body },
    }
}

/// Full error chain with the URL stripped (the query string carries the key).
fn transport_message(e: reqwest::Error) -> String {
    let timed_out = e.is_timeout();
    let chain = format!("{:#}", anyhow::Error::from(e.without_url()));
    if timed_out {
        format!("timeout: {chain}")
    } else {
        chain
    }
}

#[async_trait]
impl ModelTransport for GeminiTransport {
    async fn generate(
        &self,
        endpoint: &ModelEndpoint,
        prompt: &str,
        timeout: Duration,
    ) -> AttemptOutcome {
        if self.api_key.is_empty() {
            return AttemptOutcome::TransportFailure {
                message: "missing API key".to_string(),
            };
        }

        let resp = self
            .http
            .post(self.endpoint_url(&endpoint.name))
            .query(&[("key", self.api_key.as_str())])
            .timeout(timeout)
            .json(&GenerateRequest::from_prompt(prompt))
            .send()
            .await;

        let resp = match resp {
            Ok(r) => r,
            Err(e) => {
                return AttemptOutcome::TransportFailure {
                    message: transport_message(e),
                }
            }
        };

        let status = resp.status().as_u16();
        match resp.text().await {
            Ok(body) => classify_response(status, body),
            Err(e) => AttemptOutcome::TransportFailure {
                message: transport_message(e),
            },
        }
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
