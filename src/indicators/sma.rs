// =============================================================================
// Rolling-window statistics (Simple Moving Average, sample standard deviation)
// =============================================================================
//
// Window semantics match standard rolling-window libraries: the value at index
// `i` uses the `window` observations ending at `i` and is only defined once
// `i >= window - 1`.  Earlier positions are `Reading::Warmup`.
//
// Standard deviation uses the sample definition (N - 1 denominator).
// =============================================================================

use super::Reading;

/// Trailing simple mean of `values` over `window` observations.
///
/// # Edge cases
/// - `window == 0` => every position is `NoSignal`
/// - `values.len() < window` => every position is `Warmup`
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Reading> {
    if window == 0 {
        return vec![Reading::NoSignal; values.len()];
    }

    (0..values.len())
        .map(|i| match trailing(values, i, window) {
            Some(w) => Reading::from_f64(mean(w)),
            None => Reading::Warmup,
        })
        .collect()
}

/// Trailing sample standard deviation of `values` over `window` observations.
///
/// A window of a single observation has no sample deviation and yields
/// `NoSignal` once full.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<Reading> {
    if window == 0 {
        return vec![Reading::NoSignal; values.len()];
    }

    (0..values.len())
        .map(|i| match trailing(values, i, window) {
            Some(_) if window < 2 => Reading::NoSignal,
            Some(w) => Reading::from_f64(sample_std(w)),
            None => Reading::Warmup,
        })
        .collect()
}

/// The `window` values ending at `i`, or `None` while the window is not full.
fn trailing(values: &[f64], i: usize, window: usize) -> Option<&[f64]> {
    if i + 1 < window {
        None
    } else {
        Some(&values[i + 1 - window..=i])
    }
}

fn mean(window: &[f64]) -> f64 {
    window.iter().sum::<f64>() / window.len() as f64
}

// Two-pass formula; a constant window gives exactly 0.0.
fn sample_std(window: &[f64]) -> f64 {
    let m = mean(window);
    let ss: f64 = window.iter().map(|x| (x - m).powi(2)).sum();
    (ss / (window.len() - 1) as f64).sqrt()
}
