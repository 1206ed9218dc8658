// src/config/mod.rs
//! Service configuration: `config/briefing.toml` (or `$BRIEFING_CONFIG_PATH`),
//! with env overrides for secrets and relay tunables.

pub mod relay;
pub mod sources;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use relay::RelayConfig;
pub use sources::{ArticleConfig, MarketConfig, NewsConfig};

pub const DEFAULT_CONFIG_PATH: &str = "config/briefing.toml";
pub const ENV_CONFIG_PATH: &str = "BRIEFING_CONFIG_PATH";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BriefingConfig {
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub article: ArticleConfig,
}

impl BriefingConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: BriefingConfig = toml::from_str(s).context("parsing briefing config toml")?;
        cfg.finalize();
        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading briefing config from {}", path.display()))?;
        Self::from_toml_str(&data)
    }

    /// Load using env var + fallbacks:
    /// 1) $BRIEFING_CONFIG_PATH (must exist)
    /// 2) config/briefing.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from_file(&pb);
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from_file(&default_p);
        }
        let mut cfg = Self::default();
        cfg.finalize();
        Ok(cfg)
    }

    fn finalize(&mut self) {
        self.relay.finalize();
        self.news.sanitize();
        self.market.sanitize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::BackoffPolicy;
    use std::env;

    #[serial_test::serial]
    #[test]
    fn partial_toml_fills_defaults() {
        let cfg = BriefingConfig::from_toml_str(
            r#"
[relay]
models = ["gemini-2.5-flash", "gemini-2.0-flash", "gemini-1.5-flash"]
max_rounds = 3
backoff = { kind = "linear", base_ms = 20000 }
api_key = "literal-key"

[news]
limit = 0
keyword_groups = []
"#,
        )
        .unwrap();

        assert_eq!(cfg.relay.endpoints().len(), 3);
        assert_eq!(cfg.relay.backoff, BackoffPolicy::Linear { base_ms: 20_000 });
        assert_eq!(cfg.news.limit, 5);
        assert!(cfg.news.keyword_groups.is_empty());
        assert_eq!(cfg.market.tickers.len(), 6);
        assert_eq!(cfg.article.max_chars, 3_000);
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_CONFIG_PATH);

        // no file → defaults
        let cfg = BriefingConfig::load_default().unwrap();
        assert_eq!(cfg.news.limit, 5);

        // env wins
        let p = tmp.path().join("custom.toml");
        fs::write(&p, "[news]\nlimit = 3\n").unwrap();
        env::set_var(ENV_CONFIG_PATH, p.display().to_string());
        assert_eq!(BriefingConfig::load_default().unwrap().news.limit, 3);

        // env pointing nowhere is an error
        env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(BriefingConfig::load_default().is_err());
        env::remove_var(ENV_CONFIG_PATH);

        env::set_current_dir(&old).unwrap();
    }
}
