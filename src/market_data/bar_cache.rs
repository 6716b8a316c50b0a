// =============================================================================
// Bar Cache - at most one fetch per (ticker, lookback, session day)
// =============================================================================
//
// Each key owns an async once-cell.  Concurrent requests for the same key all
// await the single in-flight fetch; a failed fetch evicts its empty cell so
// the next request retries and bad keys do not accumulate.  The map lock is only held to look up or insert a
// cell, never across the fetch or the indicator computation.
// =============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::debug;

use super::BarSource;
use crate::error::Result;
use crate::types::{Interval, PriceBar};

#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct BarKey {
    pub ticker: String,
    pub lookback_days: u32,
    pub as_of: NaiveDate,
}

impl std::fmt::Display for BarKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}d/{}", self.ticker, self.lookback_days, self.as_of)
    }
}

type Cell = Arc<OnceCell<Arc<Vec<PriceBar>>>>;

#[derive(Default)]
pub struct BarCache {
    cells: Mutex<HashMap<BarKey, Cell>>,
}

impl BarCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached bars for `key`, fetching them from `source` if this
    /// is the first request for the key.
    pub async fn get_or_fetch<S: BarSource>(
        &self,
        source: &S,
        key: &BarKey,
        interval: Interval,
    ) -> Result<Arc<Vec<PriceBar>>> {
        let cell = {
            let mut cells = self.cells.lock();
            // Entries from earlier sessions can never be hit again.
            cells.retain(|k, _| k.as_of >= key.as_of);
            cells.entry(key.clone()).or_default().clone()
        };

        let fetched = cell
            .get_or_try_init(|| async {
                debug!(key = %key, "bar cache miss");
                source
                    .fetch_bars(&key.ticker, key.lookback_days, interval)
                    .await
                    .map(Arc::new)
            })
            .await;

        match fetched {
            Ok(bars) => Ok(Arc::clone(bars)),
            Err(e) => {
                let mut cells = self.cells.lock();
                // Leave the entry alone if a retry already replaced or filled it.
                let stale = cells
                    .get(key)
                    .is_some_and(|c| Arc::ptr_eq(c, &cell) && !c.initialized());
                if stale {
                    cells.remove(key);
                }
                Err(e)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.cells
            .lock()
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }
}
