// src/relay/backoff.rs
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delay applied after a rate-limited attempt, before the next endpoint is tried.
///
/// TOML shape:
/// ```toml
/// backoff = { kind = "linear", base_ms = 20000 }   # 20s * round
/// backoff = { kind = "fixed", delay_ms = 2000 }    # always 2s
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackoffPolicy {
    /// Same delay every round.
    Fixed { delay_ms: u64 },
    /// `base_ms * round` (rounds are 1-based), so later rounds wait longer.
    Linear { base_ms: u64 },
    /// No waiting at all; useful for tests and local runs.
    None,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy::Fixed { delay_ms: 2_000 }
    }
}

impl BackoffPolicy {
    /// Delay for the given 1-based round. Non-decreasing in `round`.
    pub fn delay_for(&self, round: u32) -> Duration {
        match *self {
            BackoffPolicy::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            BackoffPolicy::Linear { base_ms } => {
                Duration::from_millis(base_ms.saturating_mul(u64::from(round.max(1))))
            }
            BackoffPolicy::None => Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_grows_with_round() {
        let p = BackoffPolicy::Linear { base_ms: 500 };
        assert_eq!(p.delay_for(1), Duration::from_millis(500));
        assert_eq!(p.delay_for(3), Duration::from_millis(1_500));
        // round 0 is treated as the first round
        assert_eq!(p.delay_for(0), Duration::from_millis(500));
    }

    #[test]
    fn fixed_and_none_ignore_round() {
        let f = BackoffPolicy::Fixed { delay_ms: 2_000 };
        assert_eq!(f.delay_for(1), f.delay_for(7));
        assert_eq!(BackoffPolicy::None.delay_for(9), Duration::ZERO);
    }

    #[test]
    fn parses_from_toml_table() {
        #[derive(Deserialize)]
        struct Wrap {
            backoff: BackoffPolicy,
        }
        let w: Wrap = toml::from_str(r#"backoff = { kind = "linear", base_ms = 20000 }"#).unwrap();
        assert_eq!(w.backoff, BackoffPolicy::Linear { base_ms: 20_000 });
    }
}
