// =============================================================================
// MACD (Moving Average Convergence Divergence)
// =============================================================================
//
//   macd      = EMA_fast(close) - EMA_slow(close)
//   signal    = EMA_signal(macd)
//   histogram = macd - signal
//
// All three EMAs are seeded with their first observation, so every bar has a
// value.

use serde::Serialize;

use super::ema::calculate_ema;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MacdPoint {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Compute MACD / signal / histogram for every bar of `closes`.
///
/// Returns an empty vec when `closes` is empty or any span is zero.
pub fn calculate_macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Vec<MacdPoint> {
    let ema_fast = calculate_ema(closes, fast);
    let ema_slow = calculate_ema(closes, slow);
    if ema_fast.len() != closes.len() || ema_slow.len() != closes.len() {
        return Vec::new();
    }

    let macd: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = calculate_ema(&macd, signal);
    if signal_line.len() != macd.len() {
        return Vec::new();
    }

    macd.iter()
        .zip(&signal_line)
        .map(|(&m, &s)| MacdPoint {
            macd: m,
            signal: s,
            histogram: m - s,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macd_defined_from_first_bar() {
        let points = calculate_macd(&[100.0], 12, 26, 9);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].macd, 0.0);
        assert_eq!(points[0].signal, 0.0);
    }

    #[test]
    fn macd_matches_ema_difference() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let points = calculate_macd(&closes, 12, 26, 9);
        let e12 = calculate_ema(&closes, 12);
        let e26 = calculate_ema(&closes, 26);
        assert_eq!(points.len(), closes.len());
        for (i, p) in points.iter().enumerate() {
            assert!((p.macd - (e12[i] - e26[i])).abs() < 1e-12);
            assert!((p.histogram - (p.macd - p.signal)).abs() < 1e-12);
        }
    }

    #[test]
    fn rising_market_has_positive_macd() {
        let closes: Vec<f64> = (1..=60).map(|x| x as f64).collect();
        let last = *calculate_macd(&closes, 12, 26, 9).last().unwrap();
        assert!(last.macd > 0.0);
    }

    #[test]
    fn macd_empty_and_degenerate() {
        assert!(calculate_macd(&[], 12, 26, 9).is_empty());
        assert!(calculate_macd(&[1.0, 2.0], 0, 26, 9).is_empty());
    }
}
