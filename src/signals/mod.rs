// =============================================================================
// Signals Module - Scoring & Recommendation Engine
// =============================================================================
//
// Turns the latest indicator snapshot plus optional institutional flow into a
// discrete directional call.  Two scoring policies exist and are selected
// explicitly:
//
// - `RuleTable`  - additive tech/chip score mapped through a threshold table
// - `Heuristic`  - win rate built from 50 with ±20 (RSI) and ±10 (MA cross)
//                  adjustments, gated by the flow bias
//
// Undefined indicators never contribute a score: the rule is skipped and, when
// the cause is a short history, a warning is attached to the result.

pub mod heuristic;
pub mod rule_table;

use serde::{Deserialize, Serialize};

use crate::indicators::{IndicatorSnapshot, Reading};
use crate::types::{FlowBias, FlowFigures};

/// Named scoring policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringPolicy {
    #[default]
    RuleTable,
    Heuristic,
}

impl ScoringPolicy {
    /// Score `latest` (the last bar's snapshot) with this policy.
    pub fn score(
        &self,
        latest: &IndicatorSnapshot,
        close: f64,
        flow: Option<&FlowFigures>,
    ) -> ScoreResult {
        match self {
            Self::RuleTable => rule_table::score(latest, close, flow),
            Self::Heuristic => heuristic::score(latest, close, flow),
        }
    }
}

impl std::fmt::Display for ScoringPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RuleTable => write!(f, "rule_table"),
            Self::Heuristic => write!(f, "heuristic"),
        }
    }
}

impl std::str::FromStr for ScoringPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rule_table" | "rule-table" | "table" => Ok(Self::RuleTable),
            "heuristic" | "simple" => Ok(Self::Heuristic),
            other => Err(format!("unknown scoring policy '{other}'")),
        }
    }
}

/// Directional call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "strong bullish")]
    StrongBullish,
    #[serde(rename = "mild bullish")]
    MildBullish,
    #[serde(rename = "neutral")]
    Neutral,
    #[serde(rename = "mild bearish")]
    MildBearish,
    #[serde(rename = "strong bearish")]
    StrongBearish,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::StrongBullish => "strong bullish",
            Self::MildBullish => "mild bullish",
            Self::Neutral => "neutral",
            Self::MildBearish => "mild bearish",
            Self::StrongBearish => "strong bearish",
        };
        f.write_str(s)
    }
}

/// Operating suggestion; a pure function of [`Direction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    BuyOrHold,
    ReduceOrStandAside,
    StandAside,
}

impl Recommendation {
    pub fn for_direction(direction: Direction) -> Self {
        match direction {
            Direction::StrongBullish | Direction::MildBullish => Self::BuyOrHold,
            Direction::MildBearish | Direction::StrongBearish => Self::ReduceOrStandAside,
            Direction::Neutral => Self::StandAside,
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            Self::BuyOrHold => "consider buying or holding, watch support/stop-loss",
            Self::ReduceOrStandAside => {
                "consider reducing or standing aside, set a stop-loss if holding"
            }
            Self::StandAside => "stand aside, wait for a clear signal",
        }
    }
}

/// Non-fatal condition attached to a score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreWarning {
    /// A rule was skipped because `indicator` is still in its warm-up window.
    InsufficientHistory { indicator: &'static str },
}

/// Outcome of one scoring call.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreResult {
    pub policy: ScoringPolicy,
    pub tech_score: i32,
    pub chip_score: i32,
    pub total_score: i32,
    pub direction: Direction,
    pub win_rate: u8,
    pub recommendation: Recommendation,
    pub recommendation_text: &'static str,
    /// Reason strings in evaluation order.
    pub rationale: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ScoreWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_bias: Option<FlowBias>,
}

// =============================================================================
// Shared rule helpers
// =============================================================================

/// Flow sub-score shared by both policies. Absent figures score 0 and add no
/// rationale.
pub(crate) fn score_flow(flow: Option<&FlowFigures>, rationale: &mut Vec<String>) -> i32 {
    let Some(flow) = flow else {
        return 0;
    };
    match flow.bias() {
        FlowBias::Bullish => {
            rationale.push("institutional net buying — bullish.".to_string());
            1
        }
        FlowBias::Bearish => {
            rationale.push("institutional net selling — bearish.".to_string());
            -1
        }
        FlowBias::Neutral => {
            rationale.push("institutional flow balanced — neutral.".to_string());
            0
        }
    }
}

/// Record a warm-up warning for each reading still warming up.
pub(crate) fn note_warmup(warnings: &mut Vec<ScoreWarning>, inputs: &[(&'static str, Reading)]) {
    for &(indicator, reading) in inputs {
        if reading.is_warmup() {
            let warning = ScoreWarning::InsufficientHistory { indicator };
            if !warnings.contains(&warning) {
                warnings.push(warning);
            }
        }
    }
}

/// Snapshot with only the fields the scorers read filled in.
#[cfg(test)]
pub(crate) fn test_snapshot(close: f64, ma5: Reading, ma20: Reading, rsi14: Reading) -> IndicatorSnapshot {
    IndicatorSnapshot {
        date: chrono::NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        close,
        ma5,
        ma20,
        bollinger_upper: Reading::Warmup,
        bollinger_lower: Reading::Warmup,
        rsi14,
        macd: 0.0,
        macd_signal: 0.0,
        macd_histogram: 0.0,
    }
}
