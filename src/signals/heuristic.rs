// =============================================================================
// Heuristic scoring policy
// =============================================================================
//
// Win rate starts at 50 and is adjusted, then clamped to [0, 100]:
//   RSI < 30 => +20,  RSI > 70 => -20
//   MA5 > MA20 => +10, otherwise -10
//
// The institutional flow reduces to a bias (net > 0 bullish, < 0 bearish,
// otherwise neutral) that gates the call:
//   win_rate >= 60 AND bias bullish => buy / hold
//   win_rate <= 40 AND bias bearish => reduce / stand aside
//   anything else                    => stand aside
//
// `tech_score` carries the summed win-rate adjustment so the two policies
// report through the same result shape.
// =============================================================================

use tracing::debug;

use super::{
    note_warmup, score_flow, Direction, Recommendation, ScoreResult, ScoringPolicy,
};
use crate::indicators::rsi::{self, RsiZone};
use crate::indicators::IndicatorSnapshot;
use crate::types::{FlowBias, FlowFigures};

const BASE_WIN_RATE: i32 = 50;
const RSI_ADJUSTMENT: i32 = 20;
const MA_CROSS_ADJUSTMENT: i32 = 10;
const BUY_GATE: u8 = 60;
const SELL_GATE: u8 = 40;

pub fn score(latest: &IndicatorSnapshot, _close: f64, flow: Option<&FlowFigures>) -> ScoreResult {
    let mut adjustment = 0;
    let mut rationale = Vec::new();
    let mut warnings = Vec::new();

    match rsi::classify(latest.rsi14) {
        Some(RsiZone::Oversold) => {
            adjustment += RSI_ADJUSTMENT;
            rationale.push("RSI below 30 — oversold, win rate +20.".to_string());
        }
        Some(RsiZone::Overbought) => {
            adjustment -= RSI_ADJUSTMENT;
            rationale.push("RSI above 70 — overbought, win rate -20.".to_string());
        }
        Some(RsiZone::Neutral) => {}
        None => note_warmup(&mut warnings, &[("rsi14", latest.rsi14)]),
    }

    match (latest.ma5.value(), latest.ma20.value()) {
        (Some(ma5), Some(ma20)) if ma5 > ma20 => {
            adjustment += MA_CROSS_ADJUSTMENT;
            rationale.push("MA5 above MA20 — short-term uptrend, win rate +10.".to_string());
        }
        (Some(_), Some(_)) => {
            adjustment -= MA_CROSS_ADJUSTMENT;
            rationale.push("MA5 not above MA20 — short-term downtrend, win rate -10.".to_string());
        }
        _ => note_warmup(&mut warnings, &[("ma5", latest.ma5), ("ma20", latest.ma20)]),
    }

    // Clamped to [0, 100], so the narrowing cast is exact.
    let win_rate = (BASE_WIN_RATE + adjustment).clamp(0, 100) as u8;

    let chip_score = score_flow(flow, &mut rationale);
    let bias = flow.map(FlowFigures::bias).unwrap_or(FlowBias::Neutral);
    let direction = call(win_rate, bias);
    let recommendation = Recommendation::for_direction(direction);

    debug!(
        win_rate,
        bias = %bias,
        direction = %direction,
        "heuristic score computed"
    );

    ScoreResult {
        policy: ScoringPolicy::Heuristic,
        tech_score: adjustment,
        chip_score,
        total_score: adjustment + chip_score,
        direction,
        win_rate,
        recommendation,
        recommendation_text: recommendation.text(),
        rationale,
        warnings,
        flow_bias: flow.map(FlowFigures::bias),
    }
}

/// Gate the win rate with the flow bias.
fn call(win_rate: u8, bias: FlowBias) -> Direction {
    match bias {
        FlowBias::Bullish if win_rate >= BUY_GATE => {
            if win_rate >= 70 {
                Direction::StrongBullish
            } else {
                Direction::MildBullish
            }
        }
        FlowBias::Bearish if win_rate <= SELL_GATE => {
            if win_rate <= 30 {
                Direction::StrongBearish
            } else {
                Direction::MildBearish
            }
        }
        _ => Direction::Neutral,
    }
}
