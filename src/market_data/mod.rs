// =============================================================================
// Market Data Module
// =============================================================================
//
// External collaborators feeding the analysis pipeline:
// - Daily price bars and the broad-market index close (Yahoo chart API)
// - Three-institutional net flow (TWSE T86 table)
// - Bar cache guaranteeing at most one in-flight fetch per key
//
// Every source reports failure as `AnalysisError::DataUnavailable`; deciding
// whether a failure is fatal or has a fallback is the caller's job.

pub mod bar_cache;
pub mod twse;
pub mod yahoo;

use std::future::Future;

use chrono::NaiveDate;

use crate::error::Result;
use crate::types::{FlowFigures, Interval, PriceBar};

pub use bar_cache::{BarCache, BarKey};
pub use twse::TwseFlowClient;
pub use yahoo::YahooClient;

/// Source of historical bars, ascending by date.
pub trait BarSource: Send + Sync {
    fn fetch_bars(
        &self,
        ticker: &str,
        lookback_days: u32,
        interval: Interval,
    ) -> impl Future<Output = Result<Vec<PriceBar>>> + Send;
}

/// Source of institutional flow figures for one session.
pub trait FlowSource: Send + Sync {
    fn fetch_flow(
        &self,
        ticker: &str,
        date: NaiveDate,
    ) -> impl Future<Output = Result<FlowFigures>> + Send;
}

/// Source of the latest close of a broad-market index.
pub trait IndexSource: Send + Sync {
    fn fetch_index_close(&self, symbol: &str) -> impl Future<Output = Result<f64>> + Send;
}
