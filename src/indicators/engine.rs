// =============================================================================
// Indicator Engine - price bars in, aligned indicator snapshots out
// =============================================================================
//
// Pure function of the bar sequence: no caching, no shared state, safe to call
// concurrently for different tickers.  The input must be non-empty and strictly
// ascending by date; it is never re-sorted.
// =============================================================================

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use super::bollinger::calculate_bands;
use super::macd::calculate_macd;
use super::rsi::calculate_rsi;
use super::sma::rolling_mean;
use super::{
    Reading, BOLLINGER_PERIOD, BOLLINGER_STD_MULT, MACD_FAST, MACD_SIGNAL, MACD_SLOW,
    MA_LONG_PERIOD, MA_SHORT_PERIOD, RSI_PERIOD,
};
use crate::error::{AnalysisError, Result};
use crate::types::PriceBar;

/// Every derived value for one bar, computed from the bars up to and
/// including it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    pub date: NaiveDate,
    pub close: f64,
    pub ma5: Reading,
    pub ma20: Reading,
    pub bollinger_upper: Reading,
    pub bollinger_lower: Reading,
    pub rsi14: Reading,
    /// EMA-based, so defined from the first bar.
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_histogram: f64,
}

/// Compute the snapshot series for `bars`.
///
/// # Errors
/// - `InsufficientData` when `bars` is empty.
/// - `InvalidInput` when dates are not strictly ascending, or a price field is
///   negative or non-finite.
pub fn compute_snapshots(bars: &[PriceBar]) -> Result<Vec<IndicatorSnapshot>> {
    validate(bars)?;

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    let ma5 = rolling_mean(&closes, MA_SHORT_PERIOD);
    let ma20 = rolling_mean(&closes, MA_LONG_PERIOD);
    let bands = calculate_bands(&closes, BOLLINGER_PERIOD, BOLLINGER_STD_MULT);
    let rsi = calculate_rsi(&closes, RSI_PERIOD);
    let macd = calculate_macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);

    let snapshots: Vec<IndicatorSnapshot> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| IndicatorSnapshot {
            date: bar.date,
            close: bar.close,
            ma5: ma5[i],
            ma20: ma20[i],
            bollinger_upper: bands[i].upper,
            bollinger_lower: bands[i].lower,
            rsi14: rsi[i],
            macd: macd[i].macd,
            macd_signal: macd[i].signal,
            macd_histogram: macd[i].histogram,
        })
        .collect();

    debug!(bars = bars.len(), "indicator snapshots computed");
    Ok(snapshots)
}

fn validate(bars: &[PriceBar]) -> Result<()> {
    if bars.is_empty() {
        return Err(AnalysisError::InsufficientData);
    }

    for (i, bar) in bars.iter().enumerate() {
        let fields = [
            ("open", bar.open),
            ("high", bar.high),
            ("low", bar.low),
            ("close", bar.close),
            ("volume", bar.volume),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(AnalysisError::InvalidInput(format!(
                    "bar {i} ({}) has invalid {name}: {value}",
                    bar.date
                )));
            }
        }
    }

    if let Some(w) = bars.windows(2).find(|w| w[1].date <= w[0].date) {
        let what = if w[1].date == w[0].date {
            "duplicate"
        } else {
            "out-of-order"
        };
        return Err(AnalysisError::InvalidInput(format!(
            "{what} bar date {} after {}",
            w[1].date, w[0].date
        )));
    }

    Ok(())
}
