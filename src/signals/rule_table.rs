// =============================================================================
// Rule-table scoring policy
// =============================================================================
//
// Technical sub-score (rules accumulate, evaluated in order):
//   1. close > MA5 AND close > MA20      => +2, otherwise -2
//   2. RSI < 30 => +1,  RSI > 70 => -1   (skipped when RSI is undefined)
// Chip sub-score from the institutional net: +1 / -1 / 0.
//
// Classification of total = tech + chip, high to low, first match wins:
//   total >  2        => strong bullish, 70 %
//   0 < total <= 2    => mild bullish,   60 %
//   total == 0        => neutral,        50 %
//   -2 < total < 0    => mild bearish,   40 %
//   total <= -2       => strong bearish, 30 %
// =============================================================================

use tracing::debug;

use super::{
    note_warmup, score_flow, Direction, Recommendation, ScoreResult, ScoringPolicy,
};
use crate::indicators::rsi::{self, RsiZone};
use crate::indicators::IndicatorSnapshot;
use crate::types::FlowFigures;

pub fn score(latest: &IndicatorSnapshot, close: f64, flow: Option<&FlowFigures>) -> ScoreResult {
    let mut tech_score = 0;
    let mut rationale = Vec::new();
    let mut warnings = Vec::new();

    // --- Rule 1: price vs moving averages ---
    match (latest.ma5.value(), latest.ma20.value()) {
        (Some(ma5), Some(ma20)) => {
            if close > ma5 && close > ma20 {
                tech_score += 2;
                rationale.push("price above MA5 and MA20 — short/medium-term bullish.".to_string());
            } else {
                tech_score -= 2;
                rationale.push("price below moving averages — bearish.".to_string());
            }
        }
        _ => note_warmup(&mut warnings, &[("ma5", latest.ma5), ("ma20", latest.ma20)]),
    }

    // --- Rule 2: RSI extremes ---
    match rsi::classify(latest.rsi14) {
        Some(RsiZone::Oversold) => {
            tech_score += 1;
            rationale.push("RSI below 30 — oversold, mildly bullish.".to_string());
        }
        Some(RsiZone::Overbought) => {
            tech_score -= 1;
            rationale.push("RSI above 70 — overbought, mildly bearish.".to_string());
        }
        Some(RsiZone::Neutral) => {}
        None => note_warmup(&mut warnings, &[("rsi14", latest.rsi14)]),
    }

    let chip_score = score_flow(flow, &mut rationale);
    let total_score = tech_score + chip_score;
    let (direction, win_rate) = classify(total_score);
    let recommendation = Recommendation::for_direction(direction);

    debug!(
        tech_score,
        chip_score,
        total_score,
        direction = %direction,
        warnings = warnings.len(),
        "rule-table score computed"
    );

    ScoreResult {
        policy: ScoringPolicy::RuleTable,
        tech_score,
        chip_score,
        total_score,
        direction,
        win_rate,
        recommendation,
        recommendation_text: recommendation.text(),
        rationale,
        warnings,
        flow_bias: flow.map(FlowFigures::bias),
    }
}

/// Map a total score to its direction and win rate.
pub fn classify(total_score: i32) -> (Direction, u8) {
    if total_score > 2 {
        (Direction::StrongBullish, 70)
    } else if total_score > 0 {
        (Direction::MildBullish, 60)
    } else if total_score == 0 {
        (Direction::Neutral, 50)
    } else if total_score > -2 {
        (Direction::MildBearish, 40)
    } else {
        (Direction::StrongBearish, 30)
    }
}
