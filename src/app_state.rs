// =============================================================================
// Central Application State
// =============================================================================
//
// Ties the runtime configuration to the external collaborators and the bar
// cache.  Nothing here holds analysis results: every request recomputes from
// its own bar window.
//
// Thread safety:
//   - parking_lot::RwLock for the runtime configuration (cloned before any
//     await point).
//   - Atomic counter for request accounting.
// =============================================================================

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use parking_lot::RwLock;
use serde::Serialize;

use crate::analysis::Sources;
use crate::market_data::{BarCache, TwseFlowClient, YahooClient};
use crate::runtime_config::RuntimeConfig;

pub struct AppState {
    pub runtime_config: Arc<RwLock<RuntimeConfig>>,
    /// Where configuration changes made through the API are persisted.
    pub config_path: PathBuf,

    pub yahoo: YahooClient,
    pub twse: TwseFlowClient,
    pub bar_cache: BarCache,

    pub analyses_served: AtomicU64,
    pub analyses_failed: AtomicU64,

    /// Instant when the service was started. Used for uptime calculations.
    pub start_time: std::time::Instant,
}

/// Counters reported by the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStats {
    pub analyses_served: u64,
    pub analyses_failed: u64,
    pub cached_bar_windows: usize,
    pub uptime_secs: u64,
}

impl AppState {
    /// Build the state, constructing HTTP clients from `config`.
    pub fn new(config: RuntimeConfig, config_path: impl Into<PathBuf>) -> Result<Self> {
        let timeout = config.http_timeout();
        let yahoo = YahooClient::new(config.yahoo_base_url.clone(), timeout)?;
        let twse = TwseFlowClient::new(config.twse_base_url.clone(), timeout)?;

        Ok(Self {
            runtime_config: Arc::new(RwLock::new(config)),
            config_path: config_path.into(),
            yahoo,
            twse,
            bar_cache: BarCache::new(),
            analyses_served: AtomicU64::new(0),
            analyses_failed: AtomicU64::new(0),
            start_time: std::time::Instant::now(),
        })
    }

    /// Clone of the current configuration, safe to hold across awaits.
    pub fn config_snapshot(&self) -> RuntimeConfig {
        self.runtime_config.read().clone()
    }

    pub fn sources(&self) -> Sources<'_, YahooClient, TwseFlowClient, YahooClient> {
        Sources {
            cache: &self.bar_cache,
            bars: &self.yahoo,
            flow: &self.twse,
            index: &self.yahoo,
        }
    }

    pub fn record_outcome(&self, ok: bool) {
        let counter = if ok {
            &self.analyses_served
        } else {
            &self.analyses_failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            analyses_served: self.analyses_served.load(Ordering::Relaxed),
            analyses_failed: self.analyses_failed.load(Ordering::Relaxed),
            cached_bar_windows: self.bar_cache.len(),
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }
}
