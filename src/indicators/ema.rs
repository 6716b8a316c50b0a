// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Formula:
//   alpha  = 2 / (span + 1)
//   EMA_t  = EMA_{t-1} + alpha * (x_t - EMA_{t-1})
//
// The very first EMA value is seeded with the first observation, so the series
// is defined from index 0 with no warm-up gap.
// =============================================================================

/// Compute the EMA series for `values` with the given `span`.
///
/// The output has the same length as the input.
///
/// # Edge cases
/// - `span == 0` => empty vec
/// - `values.is_empty()` => empty vec
pub fn calculate_ema(values: &[f64], span: usize) -> Vec<f64> {
    if span == 0 {
        return Vec::new();
    }
    let Some(&seed) = values.first() else {
        return Vec::new();
    };

    let alpha = 2.0 / (span as f64 + 1.0);

    let mut result = Vec::with_capacity(values.len());
    result.push(seed);

    let mut prev = seed;
    for &x in &values[1..] {
        let ema = prev + alpha * (x - prev);
        result.push(ema);
        prev = ema;
    }

    result
}
