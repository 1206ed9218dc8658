// src/session.rs
//! Per-session state: the cached briefing and write-once deep-analysis results.
//!
//! Sessions are keyed by an opaque id so concurrent users never see each other's
//! results.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::engine::{Briefing, DeepAnalysis};

/// State owned by one session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionContext {
    pub briefing: Option<Briefing>,
    deep_results: BTreeMap<usize, DeepAnalysis>,
}

impl SessionContext {
    pub fn deep_result(&self, index: usize) -> Option<&DeepAnalysis> {
        self.deep_results.get(&index)
    }

    /// Store a result for `index` unless one exists. Returns `false` if already present.
    pub fn record_deep(&mut self, index: usize, result: DeepAnalysis) -> bool {
        if self.deep_results.contains_key(&index) {
            return false;
        }
        self.deep_results.insert(index, result);
        true
    }

    /// Drop one result so the headline can be analyzed again.
    pub fn clear_deep(&mut self, index: usize) -> Option<DeepAnalysis> {
        self.deep_results.remove(&index)
    }

    pub fn deep_count(&self) -> usize {
        self.deep_results.len()
    }

    /// Forget everything (briefing and all deep results).
    pub fn reset(&mut self) {
        self.briefing = None;
        self.deep_results.clear();
    }
}

/// All sessions in the process.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, SessionContext>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a session (empty context if unknown).
    pub fn get(&self, id: &str) -> SessionContext {
        let g = self.inner.read().unwrap_or_else(|p| p.into_inner());
        g.get(id).cloned().unwrap_or_default()
    }

    /// Mutate a session in place, creating it if needed.
    pub fn with_session<R>(&self, id: &str, f: impl FnOnce(&mut SessionContext) -> R) -> R {
        let mut g = self.inner.write().unwrap_or_else(|p| p.into_inner());
        f(g.entry(id.to_string()).or_default())
    }

    /// Reset and drop the session. Returns whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        let mut g = self.inner.write().unwrap_or_else(|p| p.into_inner());
        match g.remove(id) {
            Some(mut ctx) => {
                ctx.reset();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
