// =============================================================================
// TWSE three-institutional net flow (T86) client
// =============================================================================
//
// GET {base}/rwd/zh/fund/T86?date=YYYYMMDD&selectType=ALLBUT0999&response=json
//
// One row per security; all figures are share counts formatted with thousands
// separators.  Columns are located by header name rather than by position,
// since the exchange has reshuffled them before.
// =============================================================================

use std::time::Duration;

use anyhow::Context;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::FlowSource;
use crate::error::{AnalysisError, Result};
use crate::types::FlowFigures;

pub const DEFAULT_BASE_URL: &str = "https://www.twse.com.tw";

const SOURCE: &str = "flow";

const CODE_FIELD: &str = "證券代號";
const FOREIGN_FIELD: &str = "外陸資買賣超股數";
const FOREIGN_DEALER_FIELD: &str = "外資自營商買賣超股數";
const TRUST_FIELD: &str = "投信買賣超股數";
const DEALER_FIELD: &str = "自營商買賣超股數";

#[derive(Clone)]
pub struct TwseFlowClient {
    base_url: String,
    client: reqwest::Client,
}

impl TwseFlowClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build TWSE HTTP client")?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }
}

impl FlowSource for TwseFlowClient {
    #[instrument(skip(self), name = "twse::fetch_flow")]
    async fn fetch_flow(&self, ticker: &str, date: NaiveDate) -> Result<FlowFigures> {
        let code = security_code(ticker)?;
        let url = format!("{}/rwd/zh/fund/T86", self.base_url);
        let query = [
            ("date", date.format("%Y%m%d").to_string()),
            ("selectType", "ALLBUT0999".to_string()),
            ("response", "json".to_string()),
        ];

        let resp = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| AnalysisError::unavailable(SOURCE, format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AnalysisError::unavailable(SOURCE, format!("HTTP {status}")));
        }
        let table: T86Table = resp
            .json()
            .await
            .map_err(|e| AnalysisError::unavailable(SOURCE, format!("malformed response: {e}")))?;

        let flow = table.figures_for(code)?;
        debug!(code, net_total = flow.net_total(), "institutional flow fetched");
        Ok(flow)
    }
}

/// `2330.TW` => `2330`. Only TWSE-listed (`.TW` or bare) codes are covered.
fn security_code(ticker: &str) -> Result<&str> {
    let (code, suffix) = match ticker.split_once('.') {
        Some((code, suffix)) => (code, Some(suffix)),
        None => (ticker, None),
    };
    if let Some(suffix) = suffix {
        if !suffix.eq_ignore_ascii_case("TW") {
            return Err(AnalysisError::unavailable(
                SOURCE,
                format!("{ticker} is not a TWSE-listed security"),
            ));
        }
    }
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AnalysisError::unavailable(
            SOURCE,
            format!("cannot derive a security code from {ticker}"),
        ));
    }
    Ok(code)
}

#[derive(Debug, Deserialize)]
struct T86Table {
    #[serde(default)]
    stat: String,
    #[serde(default)]
    fields: Vec<String>,
    #[serde(default)]
    data: Vec<Vec<String>>,
}

impl T86Table {
    fn column(&self, name: &str) -> Result<usize> {
        self.fields
            .iter()
            .position(|f| f.trim().starts_with(name))
            .ok_or_else(|| AnalysisError::unavailable(SOURCE, format!("column '{name}' missing")))
    }

    fn figures_for(&self, code: &str) -> Result<FlowFigures> {
        if self.stat != "OK" {
            return Err(AnalysisError::unavailable(
                SOURCE,
                format!("exchange returned status '{}'", self.stat),
            ));
        }

        let code_col = self.column(CODE_FIELD)?;
        let foreign_col = self.column(FOREIGN_FIELD)?;
        let trust_col = self.column(TRUST_FIELD)?;
        let dealer_col = self.column(DEALER_FIELD)?;
        // Older tables fold foreign dealers into the foreign column.
        let foreign_dealer_col = self.column(FOREIGN_DEALER_FIELD).ok();

        let row = self
            .data
            .iter()
            .find(|row| row.get(code_col).map(|c| c.trim()) == Some(code))
            .ok_or_else(|| AnalysisError::unavailable(SOURCE, format!("no flow row for {code}")))?;

        let cell = |col: usize| -> Result<i64> {
            let raw = row
                .get(col)
                .ok_or_else(|| AnalysisError::unavailable(SOURCE, "short flow row"))?;
            parse_shares(raw).ok_or_else(|| {
                AnalysisError::unavailable(SOURCE, format!("unparseable share count '{raw}'"))
            })
        };

        let foreign_dealer = match foreign_dealer_col {
            Some(col) => cell(col)?,
            None => 0,
        };

        Ok(FlowFigures::new(
            cell(foreign_col)?.saturating_add(foreign_dealer),
            cell(trust_col)?,
            cell(dealer_col)?,
        ))
    }
}

fn parse_shares(raw: &str) -> Option<i64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    cleaned.parse().ok()
}
