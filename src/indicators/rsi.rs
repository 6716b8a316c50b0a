// =============================================================================
// Relative Strength Index (RSI), simple rolling-mean variant
// =============================================================================
//
// Step 1 - delta_i = close_i - close_{i-1}   (undefined at i = 0)
// Step 2 - up_i = max(delta_i, 0), down_i = max(-delta_i, 0)
// Step 3 - roll_up / roll_down = trailing `period` simple means of up / down,
//          defined once `period` deltas exist (i >= period)
// Step 4 - RS = roll_up / roll_down,  RSI = 100 - 100 / (1 + RS)
//
// roll_down == 0 with roll_up > 0 saturates at 100.  Both zero is a flat
// window and carries no signal.
//
// Thresholds:  RSI > 70 => OVERBOUGHT,  RSI < 30 => OVERSOLD.
// =============================================================================

use serde::Serialize;

use super::Reading;

pub const OVERBOUGHT: f64 = 70.0;
pub const OVERSOLD: f64 = 30.0;

/// Compute the RSI series for `closes`, aligned with the input.
///
/// # Edge cases
/// - `period == 0` => every position is `NoSignal`
/// - indices `0..period` => `Warmup` (fewer than `period` deltas)
pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<Reading> {
    if period == 0 {
        return vec![Reading::NoSignal; closes.len()];
    }

    let mut ups = Vec::with_capacity(closes.len());
    let mut downs = Vec::with_capacity(closes.len());
    for w in closes.windows(2) {
        let delta = w[1] - w[0];
        ups.push(delta.max(0.0));
        downs.push((-delta).max(0.0));
    }

    let period_f = period as f64;
    (0..closes.len())
        .map(|i| {
            if i < period {
                return Reading::Warmup;
            }
            // Deltas are indexed from bar 1, so bar i maps to delta i - 1.
            let range = i - period..i;
            let roll_up = ups[range.clone()].iter().sum::<f64>() / period_f;
            let roll_down = downs[range].iter().sum::<f64>() / period_f;
            rsi_from_averages(roll_up, roll_down)
        })
        .collect()
}

/// Label for a defined RSI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RsiZone {
    Overbought,
    Oversold,
    Neutral,
}

/// Classify an RSI reading; `None` when the reading is undefined.
pub fn classify(reading: Reading) -> Option<RsiZone> {
    let value = reading.value()?;
    Some(if value > OVERBOUGHT {
        RsiZone::Overbought
    } else if value < OVERSOLD {
        RsiZone::Oversold
    } else {
        RsiZone::Neutral
    })
}

// =============================================================================
// Internal helpers
// =============================================================================

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Reading {
    if avg_loss == 0.0 {
        if avg_gain > 0.0 {
            Reading::Value(100.0)
        } else {
            Reading::NoSignal
        }
    } else {
        let rs = avg_gain / avg_loss;
        Reading::from_f64(100.0 - 100.0 / (1.0 + rs))
    }
}
