// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free series transforms over daily closes.  Every function
// returns a series aligned index-for-index with its input; positions where a
// value cannot be produced carry an explicit `Reading` state instead of a
// numeric stand-in, so callers are forced to handle warm-up and numerical
// edge cases.

pub mod bollinger;
pub mod ema;
pub mod engine;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use engine::{compute_snapshots, IndicatorSnapshot};

use serde::{Deserialize, Serialize};

pub const MA_SHORT_PERIOD: usize = 5;
pub const MA_LONG_PERIOD: usize = 20;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_STD_MULT: f64 = 2.0;
pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;

/// Value of an indicator at one bar.
///
/// Deliberately not `PartialOrd`: a reading can only be compared after it has
/// been unwrapped through [`Reading::value`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Reading {
    /// A defined, finite value.
    Value(f64),
    /// The look-back window is not full yet.
    Warmup,
    /// The window is full but carries no signal (e.g. RSI of a flat market).
    NoSignal,
}

impl Reading {
    /// Wrap a computed number; non-finite results become `NoSignal`.
    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() {
            Self::Value(value)
        } else {
            Self::NoSignal
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_warmup(&self) -> bool {
        matches!(self, Self::Warmup)
    }

    /// Combine two readings. `Warmup` dominates `NoSignal`.
    pub fn zip_with(self, other: Reading, f: impl FnOnce(f64, f64) -> f64) -> Reading {
        match (self, other) {
            (Self::Value(a), Self::Value(b)) => Self::from_f64(f(a, b)),
            (Self::Warmup, _) | (_, Self::Warmup) => Self::Warmup,
            _ => Self::NoSignal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_values_carry_no_signal() {
        assert_eq!(Reading::from_f64(f64::NAN), Reading::NoSignal);
        assert_eq!(Reading::from_f64(f64::INFINITY), Reading::NoSignal);
        assert_eq!(Reading::from_f64(1.5), Reading::Value(1.5));
    }

    #[test]
    fn zip_prefers_warmup_over_no_signal() {
        let add = |a: f64, b: f64| a + b;
        assert_eq!(Reading::Value(1.0).zip_with(Reading::Value(2.0), add), Reading::Value(3.0));
        assert_eq!(Reading::Warmup.zip_with(Reading::NoSignal, add), Reading::Warmup);
        assert_eq!(Reading::NoSignal.zip_with(Reading::Value(1.0), add), Reading::NoSignal);
    }

    #[test]
    fn serialises_with_explicit_state() {
        let json = serde_json::to_string(&Reading::Value(42.0)).unwrap();
        assert_eq!(json, r#"{"state":"value","value":42.0}"#);
        let json = serde_json::to_string(&Reading::Warmup).unwrap();
        assert_eq!(json, r#"{"state":"warmup"}"#);
    }
}
