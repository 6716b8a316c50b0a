// =============================================================================
// Analysis Pipeline - bars → indicators → score
// =============================================================================
//
// `analyze` is the pure core: one bar window and optional flow figures in, one
// snapshot series and one score out.  `run` wraps it with the collaborators:
//
//   1. bars from the cache (fatal on failure)
//   2. institutional flow from the exchange, falling back to caller-supplied
//      manual figures when the fetch is disabled or fails
//   3. broad-market index close, informational only (dropped on failure)
//   4. pure pipeline on the fetched window
// =============================================================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AnalysisError, Result};
use crate::indicators::{compute_snapshots, IndicatorSnapshot};
use crate::market_data::{BarCache, BarKey, BarSource, FlowSource, IndexSource};
use crate::runtime_config::{RuntimeConfig, MAX_LOOKBACK_DAYS};
use crate::signals::{ScoreResult, ScoringPolicy};
use crate::types::{FlowFigures, Interval, PriceBar};

/// Result of the pure pipeline.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub snapshots: Vec<IndicatorSnapshot>,
    pub score: ScoreResult,
}

/// Compute indicators for `bars` and score the last bar with `policy`.
pub fn analyze(
    bars: &[PriceBar],
    flow: Option<&FlowFigures>,
    policy: ScoringPolicy,
) -> Result<Analysis> {
    let snapshots = compute_snapshots(bars)?;
    let latest = snapshots.last().ok_or(AnalysisError::InsufficientData)?;
    let score = policy.score(latest, latest.close, flow);
    Ok(Analysis { snapshots, score })
}

// =============================================================================
// Request / report
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub ticker: String,
    pub policy: Option<ScoringPolicy>,
    pub lookback_days: Option<u32>,
    /// Fallback figures entered by the caller.
    pub manual_flow: Option<FlowFigures>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowOrigin {
    Remote,
    Manual,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowReport {
    pub figures: FlowFigures,
    pub net_total: i64,
    pub origin: FlowOrigin,
}

impl FlowReport {
    fn new(figures: FlowFigures, origin: FlowOrigin) -> Self {
        Self {
            net_total: figures.net_total(),
            figures,
            origin,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexReading {
    pub symbol: String,
    pub close: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub id: Uuid,
    pub ticker: String,
    pub as_of: NaiveDate,
    pub last_close: f64,
    pub latest: IndicatorSnapshot,
    pub snapshots: Vec<IndicatorSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow: Option<FlowReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_index: Option<IndexReading>,
    pub score: ScoreResult,
    pub generated_at: DateTime<Utc>,
}

/// Borrowed handles to the external collaborators.
pub struct Sources<'a, B, F, I> {
    pub cache: &'a BarCache,
    pub bars: &'a B,
    pub flow: &'a F,
    pub index: &'a I,
}

// =============================================================================
// Orchestration
// =============================================================================

/// Run one full analysis. `config` is a snapshot taken by the caller.
pub async fn run<B, F, I>(
    sources: &Sources<'_, B, F, I>,
    config: &RuntimeConfig,
    request: AnalysisRequest,
) -> Result<AnalysisReport>
where
    B: BarSource,
    F: FlowSource,
    I: IndexSource,
{
    let ticker = normalise_ticker(&request.ticker)?;
    let lookback_days = request.lookback_days.unwrap_or(config.lookback_days);
    if lookback_days == 0 || lookback_days > MAX_LOOKBACK_DAYS {
        return Err(AnalysisError::InvalidInput(format!(
            "lookback_days must be within 1..={MAX_LOOKBACK_DAYS}, got {lookback_days}"
        )));
    }
    let policy = request.policy.unwrap_or(config.scoring_policy);

    let key = BarKey {
        ticker: ticker.clone(),
        lookback_days,
        as_of: Utc::now().date_naive(),
    };
    let bars = sources
        .cache
        .get_or_fetch(sources.bars, &key, Interval::Daily)
        .await?;
    let last_bar = bars.last().ok_or(AnalysisError::InsufficientData)?;
    let as_of = last_bar.date;

    let flow = resolve_flow(
        sources.flow,
        config.enable_remote_flow,
        &ticker,
        as_of,
        request.manual_flow,
    )
    .await;

    let market_index = if config.enable_market_index {
        fetch_index(sources.index, &config.market_index_symbol).await
    } else {
        None
    };

    let Analysis { snapshots, score } = analyze(&bars, flow.as_ref().map(|f| &f.figures), policy)?;
    let latest = snapshots
        .last()
        .cloned()
        .ok_or(AnalysisError::InsufficientData)?;

    info!(
        ticker = %ticker,
        bars = bars.len(),
        policy = %policy,
        total_score = score.total_score,
        direction = %score.direction,
        win_rate = score.win_rate,
        "analysis complete"
    );

    Ok(AnalysisReport {
        id: Uuid::new_v4(),
        ticker,
        as_of,
        last_close: latest.close,
        latest,
        snapshots,
        flow,
        market_index,
        score,
        generated_at: Utc::now(),
    })
}

async fn resolve_flow<F: FlowSource>(
    source: &F,
    remote_enabled: bool,
    ticker: &str,
    date: NaiveDate,
    manual: Option<FlowFigures>,
) -> Option<FlowReport> {
    if remote_enabled {
        match source.fetch_flow(ticker, date).await {
            Ok(figures) => return Some(FlowReport::new(figures, FlowOrigin::Remote)),
            Err(e) => warn!(
                ticker,
                error = %e,
                has_manual = manual.is_some(),
                "remote flow unavailable, falling back to manual figures"
            ),
        }
    }
    manual.map(|figures| FlowReport::new(figures, FlowOrigin::Manual))
}

async fn fetch_index<I: IndexSource>(source: &I, symbol: &str) -> Option<IndexReading> {
    match source.fetch_index_close(symbol).await {
        Ok(close) => Some(IndexReading {
            symbol: symbol.to_string(),
            close,
        }),
        Err(e) => {
            warn!(symbol, error = %e, "market index unavailable");
            None
        }
    }
}

/// Trim and upper-case a ticker, rejecting characters no exchange symbol uses.
fn normalise_ticker(raw: &str) -> Result<String> {
    let ticker = raw.trim().to_ascii_uppercase();
    let valid = !ticker.is_empty()
        && ticker.len() <= 20
        && ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '^' | '-' | '='));
    if valid {
        Ok(ticker)
    } else {
        Err(AnalysisError::InvalidInput(format!("invalid ticker '{raw}'")))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::indicators::engine::tests::bars_from_closes;
    use crate::signals::{Direction, Recommendation};

    struct FixedBars(Vec<PriceBar>);

    impl BarSource for FixedBars {
        async fn fetch_bars(&self, _: &str, _: u32, _: Interval) -> Result<Vec<PriceBar>> {
            Ok(self.0.clone())
        }
    }

    struct Flow(Option<FlowFigures>, AtomicUsize);

    impl FlowSource for Flow {
        async fn fetch_flow(&self, _: &str, _: NaiveDate) -> Result<FlowFigures> {
            self.1.fetch_add(1, Ordering::SeqCst);
            self.0
                .ok_or_else(|| AnalysisError::unavailable("flow", "exchange closed"))
        }
    }

    struct Index(Option<f64>);

    impl IndexSource for Index {
        async fn fetch_index_close(&self, _: &str) -> Result<f64> {
            self.0
                .ok_or_else(|| AnalysisError::unavailable("market index", "timeout"))
        }
    }

    fn rising_bars() -> Vec<PriceBar> {
        // Steady climb with a shallow dip every fourth bar.
        let closes: Vec<f64> = (0..40)
            .map(|i| 100.0 + i as f64 - if i % 4 == 0 { 1.5 } else { 0.0 })
            .collect();
        bars_from_closes(&closes)
    }

    #[test]
    fn analyze_scores_the_last_bar() {
        let bars = rising_bars();
        let analysis = analyze(&bars, Some(&FlowFigures::new(500, 0, 0)), ScoringPolicy::RuleTable)
            .unwrap();
        assert_eq!(analysis.snapshots.len(), bars.len());

        // Close 139 sits above MA5 (136.7) and MA20 (129.125): +2.
        // Three of every four deltas are gains, RSI ~91: -1.
        let latest = analysis.snapshots.last().unwrap();
        assert!((latest.ma5.value().unwrap() - 136.7).abs() < 1e-9);
        assert!((latest.ma20.value().unwrap() - 129.125).abs() < 1e-9);
        assert!(latest.rsi14.value().unwrap() > 90.0);

        let score = &analysis.score;
        assert_eq!(score.tech_score, 1);
        assert_eq!(score.chip_score, 1);
        assert_eq!(score.total_score, 2);
        assert_eq!(score.direction, Direction::MildBullish);
        assert_eq!(score.win_rate, 60);
        assert_eq!(score.recommendation, Recommendation::BuyOrHold);
        assert_eq!(
            score.rationale,
            vec![
                "price above MA5 and MA20 — short/medium-term bullish.",
                "RSI above 70 — overbought, mildly bearish.",
                "institutional net buying — bullish.",
            ]
        );
        assert!(score.warnings.is_empty());
    }

    #[test]
    fn analyze_rejects_empty_input() {
        assert!(matches!(
            analyze(&[], None, ScoringPolicy::RuleTable),
            Err(AnalysisError::InsufficientData)
        ));
    }

    #[test]
    fn short_history_scores_without_fabricated_signals() {
        let bars = bars_from_closes(&[10.0, 11.0, 12.0]);
        let analysis = analyze(&bars, None, ScoringPolicy::RuleTable).unwrap();
        assert_eq!(analysis.score.total_score, 0);
        assert_eq!(analysis.score.direction, Direction::Neutral);
        assert!(!analysis.score.warnings.is_empty());
    }

    #[tokio::test]
    async fn remote_flow_wins_over_manual() {
        let cache = BarCache::new();
        let bars = FixedBars(rising_bars());
        let flow = Flow(Some(FlowFigures::new(-9_000, 0, 0)), AtomicUsize::new(0));
        let index = Index(Some(21_000.0));
        let sources = Sources { cache: &cache, bars: &bars, flow: &flow, index: &index };

        let request = AnalysisRequest {
            ticker: " 2330.tw ".to_string(),
            manual_flow: Some(FlowFigures::from_lots(5, 0, 0)),
            ..Default::default()
        };
        let report = run(&sources, &RuntimeConfig::default(), request).await.unwrap();

        assert_eq!(report.ticker, "2330.TW");
        let flow_report = report.flow.unwrap();
        assert_eq!(flow_report.origin, FlowOrigin::Remote);
        assert_eq!(flow_report.net_total, -9_000);
        assert_eq!(report.score.chip_score, -1);
        assert_eq!(report.market_index.unwrap().close, 21_000.0);
        assert_eq!(report.as_of, report.latest.date);
        assert_eq!(report.snapshots.len(), 40);
    }

    #[tokio::test]
    async fn failed_remote_flow_falls_back_to_manual() {
        let cache = BarCache::new();
        let bars = FixedBars(rising_bars());
        let flow = Flow(None, AtomicUsize::new(0));
        let index = Index(None);
        let sources = Sources { cache: &cache, bars: &bars, flow: &flow, index: &index };

        let request = AnalysisRequest {
            ticker: "2330.TW".to_string(),
            policy: Some(ScoringPolicy::Heuristic),
            manual_flow: Some(FlowFigures::from_lots(5, 0, 0)),
            ..Default::default()
        };
        let report = run(&sources, &RuntimeConfig::default(), request).await.unwrap();

        assert_eq!(report.flow.unwrap().origin, FlowOrigin::Manual);
        assert!(report.market_index.is_none());
        assert_eq!(report.score.policy, ScoringPolicy::Heuristic);
        assert_eq!(flow.1.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn disabled_remote_flow_is_never_called() {
        let cache = BarCache::new();
        let bars = FixedBars(rising_bars());
        let flow = Flow(Some(FlowFigures::new(1, 0, 0)), AtomicUsize::new(0));
        let index = Index(None);
        let sources = Sources { cache: &cache, bars: &bars, flow: &flow, index: &index };

        let config = RuntimeConfig {
            enable_remote_flow: false,
            enable_market_index: false,
            ..RuntimeConfig::default()
        };
        let request = AnalysisRequest {
            ticker: "2330.TW".to_string(),
            ..Default::default()
        };
        let report = run(&sources, &config, request).await.unwrap();

        assert!(report.flow.is_none());
        assert_eq!(report.score.chip_score, 0);
        assert_eq!(flow.1.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_requests_are_rejected_before_fetching() {
        let cache = BarCache::new();
        let bars = FixedBars(rising_bars());
        let flow = Flow(None, AtomicUsize::new(0));
        let index = Index(None);
        let sources = Sources { cache: &cache, bars: &bars, flow: &flow, index: &index };
        let config = RuntimeConfig::default();

        let bad_ticker = AnalysisRequest {
            ticker: "23 30".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            run(&sources, &config, bad_ticker).await,
            Err(AnalysisError::InvalidInput(_))
        ));

        let bad_lookback = AnalysisRequest {
            ticker: "2330.TW".to_string(),
            lookback_days: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            run(&sources, &config, bad_lookback).await,
            Err(AnalysisError::InvalidInput(_))
        ));
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn unordered_source_bars_are_invalid_input() {
        let cache = BarCache::new();
        let mut raw = rising_bars();
        raw.swap(3, 4);
        let bars = FixedBars(raw);
        let flow = Flow(None, AtomicUsize::new(0));
        let index = Index(None);
        let sources = Sources { cache: &cache, bars: &bars, flow: &flow, index: &index };

        let request = AnalysisRequest {
            ticker: "2330.TW".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            run(&sources, &RuntimeConfig::default(), request).await,
            Err(AnalysisError::InvalidInput(_))
        ));
    }
}
