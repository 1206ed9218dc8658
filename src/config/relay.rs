// src/config/relay.rs
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::relay::{BackoffPolicy, ModelEndpoint, RelaySettings};

pub const ENV_API_KEY: &str = "GOOGLE_API_KEY";
pub const ENV_MAX_ROUNDS: &str = "BRIEFING_MAX_ROUNDS";
pub const ENV_TIMEOUT_SECS: &str = "BRIEFING_TIMEOUT_SECS";

fn default_models() -> Vec<String> {
    vec!["gemini-2.5-flash".to_string(), "gemini-2.0-flash".to_string()]
}
fn default_max_rounds() -> u32 {
    1
}
fn default_timeout_secs() -> u64 {
    20
}
fn default_api_key() -> String {
    "ENV".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Model names in priority order.
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub backoff: BackoffPolicy,
    /// Override for the Gemini API host (tests, proxies).
    #[serde(default)]
    pub base_url: Option<String>,
    /// "ENV" means: read from GOOGLE_API_KEY.
    #[serde(default = "default_api_key")]
    pub api_key: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            models: default_models(),
            max_rounds: default_max_rounds(),
            timeout_secs: default_timeout_secs(),
            backoff: BackoffPolicy::default(),
            base_url: None,
            api_key: default_api_key(),
        }
    }
}

fn parse_u64_env(raw: Option<String>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
}

impl RelayConfig {
    /// Resolve the "ENV" key, apply env overrides, and clamp nonsense values.
    pub fn finalize(&mut self) {
        if self.api_key.trim().eq_ignore_ascii_case("env") {
            // An empty key is not fatal: every attempt becomes a transport failure
            // and the diagnostic says so.
            self.api_key = env::var(ENV_API_KEY).unwrap_or_default();
        }

        if let Some(r) = parse_u64_env(env::var(ENV_MAX_ROUNDS).ok()) {
            self.max_rounds = u32::try_from(r).unwrap_or(u32::MAX);
        }
        if let Some(t) = parse_u64_env(env::var(ENV_TIMEOUT_SECS).ok()) {
            self.timeout_secs = t;
        }

        if self.max_rounds == 0 {
            self.max_rounds = 1;
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }
        self.models.retain(|m| !m.trim().is_empty());
        if self.models.is_empty() {
            self.models = default_models();
        }
    }

    pub fn endpoints(&self) -> Vec<ModelEndpoint> {
        ModelEndpoint::from_names(&self.models)
    }

    pub fn settings(&self) -> RelaySettings {
        RelaySettings {
            max_rounds: self.max_rounds,
            timeout: Duration::from_secs(self.timeout_secs),
            backoff: self.backoff,
        }
    }
}
