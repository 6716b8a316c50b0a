// =============================================================================
// Shared types used across the equity analysis pipeline
// =============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Shares per board lot on the Taiwan exchanges.
pub const SHARES_PER_LOT: i64 = 1000;

/// One trading session of OHLCV data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

/// Bar interval accepted by the bar source. Only daily bars are analysed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    #[default]
    Daily,
}

impl Interval {
    /// Interval code understood by the Yahoo chart API.
    pub fn as_query(&self) -> &'static str {
        match self {
            Self::Daily => "1d",
        }
    }
}

/// Net buy/sell of the three institutional trader categories for one
/// session, in shares. Positive = net buying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlowFigures {
    pub foreign: i64,
    pub investment_trust: i64,
    pub dealer: i64,
}

impl FlowFigures {
    pub fn new(foreign: i64, investment_trust: i64, dealer: i64) -> Self {
        Self {
            foreign,
            investment_trust,
            dealer,
        }
    }

    /// Build from figures entered in board lots (張).
    pub fn from_lots(foreign: i64, investment_trust: i64, dealer: i64) -> Self {
        Self::new(
            foreign.saturating_mul(SHARES_PER_LOT),
            investment_trust.saturating_mul(SHARES_PER_LOT),
            dealer.saturating_mul(SHARES_PER_LOT),
        )
    }

    pub fn net_total(&self) -> i64 {
        self.foreign
            .saturating_add(self.investment_trust)
            .saturating_add(self.dealer)
    }

    pub fn bias(&self) -> FlowBias {
        match self.net_total() {
            n if n > 0 => FlowBias::Bullish,
            n if n < 0 => FlowBias::Bearish,
            _ => FlowBias::Neutral,
        }
    }
}

/// Market lean implied by the sign of the institutional net.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowBias {
    Bullish,
    Bearish,
    Neutral,
}

impl std::fmt::Display for FlowBias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bullish => write!(f, "bullish"),
            Self::Bearish => write!(f, "bearish"),
            Self::Neutral => write!(f, "neutral"),
        }
    }
}
