// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Bollinger Bands consist of a middle band (SMA), an upper band (SMA + k*σ),
// and a lower band (SMA - k*σ), where σ is the trailing sample standard
// deviation of the close over the same window.

use serde::Serialize;

use super::sma::{rolling_mean, rolling_std};
use super::Reading;

/// Bands at a single bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BandPoint {
    pub upper: Reading,
    pub middle: Reading,
    pub lower: Reading,
}

/// Calculate Bollinger Bands for every bar of `closes`.
///
/// Bars before the window is full carry `Warmup` in all three bands.
pub fn calculate_bands(closes: &[f64], period: usize, num_std: f64) -> Vec<BandPoint> {
    let middle = rolling_mean(closes, period);
    let sigma = rolling_std(closes, period);

    middle
        .into_iter()
        .zip(sigma)
        .map(|(m, s)| BandPoint {
            upper: m.zip_with(s, |m, s| m + num_std * s),
            middle: m,
            lower: m.zip_with(s, |m, s| m - num_std * s),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bollinger_basic() {
        let closes: Vec<f64> = (1..=20).map(|x| x as f64).collect();
        let bands = calculate_bands(&closes, 20, 2.0);
        assert_eq!(bands.len(), 20);
        let bb = bands[19];
        let (u, m, l) = (
            bb.upper.value().unwrap(),
            bb.middle.value().unwrap(),
            bb.lower.value().unwrap(),
        );
        assert!((m - 10.5).abs() < 1e-12);
        // Sample std of 1..=20 is sqrt(35)
        let sigma = 35.0_f64.sqrt();
        assert!((u - (10.5 + 2.0 * sigma)).abs() < 1e-9);
        assert!((l - (10.5 - 2.0 * sigma)).abs() < 1e-9);
    }

    #[test]
    fn bollinger_insufficient_data() {
        let bands = calculate_bands(&[1.0, 2.0, 3.0], 20, 2.0);
        assert!(bands
            .iter()
            .all(|b| b.upper.is_warmup() && b.lower.is_warmup() && b.middle.is_warmup()));
    }

    #[test]
    fn bollinger_flat_collapses_to_middle() {
        let bands = calculate_bands(&[100.0; 20], 20, 2.0);
        assert_eq!(bands[19].upper, Reading::Value(100.0));
        assert_eq!(bands[19].lower, Reading::Value(100.0));
    }
}
