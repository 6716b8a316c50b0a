// =============================================================================
// Runtime Configuration - analysis defaults with atomic save
// =============================================================================
//
// Central configuration hub for the analysis service.  Request parameters
// (policy, lookback) override these defaults per call; the scoring policy can
// also be switched at runtime through the API.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.  All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
//
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::market_data::{twse, yahoo};
use crate::signals::ScoringPolicy;

pub const CONFIG_PATH: &str = "analyst_config.json";

/// Longest bar window a request may ask for.
pub const MAX_LOOKBACK_DAYS: u32 = 3650;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_ticker() -> String {
    "2330.TW".to_string()
}

fn default_lookback_days() -> u32 {
    365
}

fn default_market_index_symbol() -> String {
    "^TWII".to_string()
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_yahoo_base_url() -> String {
    yahoo::DEFAULT_BASE_URL.to_string()
}

fn default_twse_base_url() -> String {
    twse::DEFAULT_BASE_URL.to_string()
}

// =============================================================================
// RuntimeConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Analysis defaults --------------------------------------------------

    /// Ticker analysed when a caller does not name one.
    #[serde(default = "default_ticker")]
    pub default_ticker: String,

    /// Calendar days of history requested from the bar source.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    /// Scoring policy used when a request does not pick one.
    #[serde(default)]
    pub scoring_policy: ScoringPolicy,

    // --- Collaborators --------------------------------------------------------

    /// Broad-market reference reported alongside each analysis.
    #[serde(default = "default_market_index_symbol")]
    pub market_index_symbol: String,

    /// Fetch institutional flow from the exchange; manual figures are the
    /// fallback when this is off or the fetch fails.
    #[serde(default = "default_true")]
    pub enable_remote_flow: bool,

    #[serde(default = "default_true")]
    pub enable_market_index: bool,

    /// Per-request timeout for every outbound HTTP call.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_yahoo_base_url")]
    pub yahoo_base_url: String,

    #[serde(default = "default_twse_base_url")]
    pub twse_base_url: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_ticker: default_ticker(),
            lookback_days: default_lookback_days(),
            scoring_policy: ScoringPolicy::default(),
            market_index_symbol: default_market_index_symbol(),
            enable_remote_flow: true,
            enable_market_index: true,
            http_timeout_secs: default_http_timeout_secs(),
            yahoo_base_url: default_yahoo_base_url(),
            twse_base_url: default_twse_base_url(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            default_ticker = %config.default_ticker,
            scoring_policy = %config.scoring_policy,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }

    pub fn http_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.http_timeout_secs.max(1))
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.default_ticker, "2330.TW");
        assert_eq!(cfg.lookback_days, 365);
        assert_eq!(cfg.scoring_policy, ScoringPolicy::RuleTable);
        assert_eq!(cfg.market_index_symbol, "^TWII");
        assert!(cfg.enable_remote_flow);
        assert!(cfg.enable_market_index);
        assert_eq!(cfg.http_timeout(), std::time::Duration::from_secs(10));
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.lookback_days, 365);
        assert!(cfg.enable_remote_flow);
        assert_eq!(cfg.yahoo_base_url, yahoo::DEFAULT_BASE_URL);
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "scoring_policy": "heuristic", "default_ticker": "2317.TW" }"#;
        let cfg: RuntimeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.scoring_policy, ScoringPolicy::Heuristic);
        assert_eq!(cfg.default_ticker, "2317.TW");
        assert_eq!(cfg.market_index_symbol, "^TWII");
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = std::env::temp_dir().join(format!("analyst-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");

        let mut cfg = RuntimeConfig::default();
        cfg.scoring_policy = ScoringPolicy::Heuristic;
        cfg.lookback_days = 120;
        cfg.save(&path).unwrap();

        let loaded = RuntimeConfig::load(&path).unwrap();
        assert_eq!(loaded.scoring_policy, ScoringPolicy::Heuristic);
        assert_eq!(loaded.lookback_days, 120);
        assert!(!path.with_extension("json.tmp").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(RuntimeConfig::load("/nonexistent/analyst_config.json").is_err());
    }
}
