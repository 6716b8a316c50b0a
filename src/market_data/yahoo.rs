// =============================================================================
// Yahoo Finance chart API client - daily bars and index closes
// =============================================================================
//
// GET {base}/v8/finance/chart/{symbol}?period1=..&period2=..&interval=1d
//
// The response carries parallel arrays (timestamp / open / high / low / close /
// volume) in which any element may be null on halted or partial sessions;
// such rows are skipped.  Timestamps are shifted by the exchange GMT offset
// before taking the calendar date, and a trailing live row sharing the date of
// the previous row replaces it.
// =============================================================================

use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{BarSource, IndexSource};
use crate::error::{AnalysisError, Result};
use crate::types::{Interval, PriceBar};

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

const SOURCE: &str = "bars";
const INDEX_SOURCE: &str = "market index";

/// Yahoo chart API client.
#[derive(Clone)]
pub struct YahooClient {
    base_url: String,
    client: reqwest::Client,
}

impl YahooClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; equity-analyst/1.0)")
            .timeout(timeout)
            .build()
            .context("failed to build Yahoo HTTP client")?;

        let base_url = base_url.into();
        debug!(base_url = %base_url, "YahooClient initialised");

        Ok(Self { base_url, client })
    }

    async fn chart(&self, symbol: &str, query: &[(&str, String)], source: &'static str) -> Result<ChartResult> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);

        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| AnalysisError::unavailable(source, format!("request failed: {e}")))?;

        let status = resp.status();
        let body: ChartResponse = resp
            .json()
            .await
            .map_err(|e| AnalysisError::unavailable(source, format!("malformed response ({status}): {e}")))?;

        into_result(body, source)
    }
}

impl BarSource for YahooClient {
    #[instrument(skip(self), name = "yahoo::fetch_bars")]
    async fn fetch_bars(
        &self,
        ticker: &str,
        lookback_days: u32,
        interval: Interval,
    ) -> Result<Vec<PriceBar>> {
        let end = Utc::now();
        let start = end - chrono::Duration::days(i64::from(lookback_days));
        let query = [
            ("period1", start.timestamp().to_string()),
            ("period2", end.timestamp().to_string()),
            ("interval", interval.as_query().to_string()),
        ];

        let result = self.chart(ticker, &query, SOURCE).await?;
        let bars = parse_bars(&result)?;
        if bars.is_empty() {
            return Err(AnalysisError::unavailable(
                SOURCE,
                format!("no bars returned for {ticker}"),
            ));
        }

        debug!(ticker, count = bars.len(), "bars fetched");
        Ok(bars)
    }
}

impl IndexSource for YahooClient {
    #[instrument(skip(self), name = "yahoo::fetch_index_close")]
    async fn fetch_index_close(&self, symbol: &str) -> Result<f64> {
        let query = [
            ("range", "5d".to_string()),
            ("interval", Interval::Daily.as_query().to_string()),
        ];
        let result = self.chart(symbol, &query, INDEX_SOURCE).await?;

        latest_close(&result).ok_or_else(|| {
            AnalysisError::unavailable(INDEX_SOURCE, format!("no close available for {symbol}"))
        })
    }
}

// -----------------------------------------------------------------------------
// Response model
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
    #[serde(rename = "regularMarketPrice", default)]
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

fn into_result(body: ChartResponse, source: &'static str) -> Result<ChartResult> {
    if let Some(err) = body.chart.error {
        return Err(AnalysisError::unavailable(
            source,
            format!("{}: {}", err.code, err.description),
        ));
    }
    body.chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| AnalysisError::unavailable(source, "empty chart result"))
}

/// Rows sharing a session date collapse to the last one (the live row).
/// A row dated before its predecessor fails the whole window.
fn parse_bars(result: &ChartResult) -> Result<Vec<PriceBar>> {
    let Some(quote) = result.indicators.quote.first() else {
        return Ok(Vec::new());
    };
    let at = |v: &Vec<Option<f64>>, i: usize| v.get(i).copied().flatten();

    let mut bars: Vec<PriceBar> = Vec::with_capacity(result.timestamp.len());
    let mut skipped = 0usize;

    for (i, &ts) in result.timestamp.iter().enumerate() {
        let (Some(open), Some(high), Some(low), Some(close)) = (
            at(&quote.open, i),
            at(&quote.high, i),
            at(&quote.low, i),
            at(&quote.close, i),
        ) else {
            skipped += 1;
            continue;
        };
        let Some(date) = session_date(ts, result.meta.gmtoffset) else {
            skipped += 1;
            continue;
        };

        let bar = PriceBar {
            date,
            open,
            high,
            low,
            close,
            volume: at(&quote.volume, i).unwrap_or(0.0),
        };

        match bars.last_mut() {
            Some(last) if last.date == bar.date => *last = bar,
            Some(last) if last.date > bar.date => {
                warn!(date = %bar.date, previous = %last.date, "out-of-order bar in chart feed");
                return Err(AnalysisError::unavailable(
                    SOURCE,
                    format!("bar dated {} follows {}", bar.date, last.date),
                ));
            }
            _ => bars.push(bar),
        }
    }

    if skipped > 0 {
        debug!(skipped, "chart rows skipped");
    }
    Ok(bars)
}

fn latest_close(result: &ChartResult) -> Option<f64> {
    result.meta.regular_market_price.or_else(|| {
        result
            .indicators
            .quote
            .first()?
            .close
            .iter()
            .rev()
            .find_map(|c| *c)
    })
}

fn session_date(timestamp: i64, gmtoffset: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(timestamp + gmtoffset, 0).map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAIPEI_OFFSET: i64 = 28_800;

    fn chart_json(timestamps: &[i64], closes: &[Option<f64>]) -> String {
        let series: Vec<serde_json::Value> = closes.iter().map(|c| serde_json::json!(c)).collect();
        serde_json::json!({
            "chart": {
                "result": [{
                    "meta": { "gmtoffset": TAIPEI_OFFSET, "regularMarketPrice": null },
                    "timestamp": timestamps,
                    "indicators": { "quote": [{
                        "open": series, "high": series, "low": series,
                        "close": series, "volume": closes.iter().map(|_| 1000).collect::<Vec<_>>()
                    }]}
                }],
                "error": null
            }
        })
        .to_string()
    }

    fn parse(json: &str) -> Result<ChartResult> {
        let body: ChartResponse = serde_json::from_str(json).unwrap();
        into_result(body, SOURCE)
    }

    #[test]
    fn parses_rows_and_skips_nulls() {
        // 2024-06-03 and 2024-06-04 09:00 Taipei (01:00 UTC)
        let json = chart_json(
            &[1_717_376_400, 1_717_462_800, 1_717_549_200],
            &[Some(850.0), None, Some(870.0)],
        );
        let bars = parse_bars(&parse(&json).unwrap()).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
        assert_eq!(bars[1].date, NaiveDate::from_ymd_opt(2024, 6, 5).unwrap());
        assert_eq!(bars[1].close, 870.0);
        assert_eq!(bars[0].volume, 1000.0);
    }

    #[test]
    fn live_row_replaces_same_session() {
        // Second timestamp is 13:30 Taipei on the same day.
        let json = chart_json(&[1_717_376_400, 1_717_392_600], &[Some(850.0), Some(855.0)]);
        let bars = parse_bars(&parse(&json).unwrap()).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 855.0);
    }

    #[test]
    fn descending_timestamps_fail_instead_of_shrinking() {
        // 2024-06-05, 2024-06-03, 2024-06-04
        let json = chart_json(
            &[1_717_549_200, 1_717_376_400, 1_717_462_800],
            &[Some(870.0), Some(850.0), Some(860.0)],
        );
        let err = parse_bars(&parse(&json).unwrap()).unwrap_err();
        assert!(matches!(err, AnalysisError::DataUnavailable { source_name: "bars", .. }));
        assert!(err.to_string().contains("2024-06-03"));
    }

    #[test]
    fn chart_error_is_data_unavailable() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = parse(json).unwrap_err();
        assert!(matches!(err, AnalysisError::DataUnavailable { source_name: "bars", .. }));
        assert!(err.to_string().contains("delisted"));
    }

    #[test]
    fn index_close_falls_back_to_last_non_null_close() {
        let json = chart_json(&[1_717_376_400, 1_717_462_800], &[Some(21_500.0), None]);
        let result = parse(&json).unwrap();
        assert_eq!(latest_close(&result), Some(21_500.0));
    }
}
