// =============================================================================
// Price Ladder - tick-aligned price levels around a reference price
// =============================================================================
//
// The ladder is owned by the caller (an ascending `Vec<f64>`); extending it is
// a pure operation on that value, so no session state lives here.
//
// Tick brackets follow the TWSE equity schedule:
//   price <   10  => 0.01
//   price <   50  => 0.05
//   price <  100  => 0.10
//   price <  500  => 0.50
//   price < 1000  => 1.00
//   otherwise     => 5.00
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Upper bound on steps per call.
pub const MAX_STEPS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LadderSide {
    /// Append levels above the current top.
    Up,
    /// Prepend levels below the current bottom.
    Down,
}

/// Tick size for a quote at `price` when moving up from it.
pub fn tick_size(price: f64) -> f64 {
    if price < 10.0 {
        0.01
    } else if price < 50.0 {
        0.05
    } else if price < 100.0 {
        0.1
    } else if price < 500.0 {
        0.5
    } else if price < 1000.0 {
        1.0
    } else {
        5.0
    }
}

/// Tick size when moving down from `price`: the bracket of the level just
/// below it, so 50.0 steps down to 49.95 rather than 49.90.
fn tick_below(price: f64) -> f64 {
    tick_size(price - 1e-9)
}

fn round_price(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

/// Seed a ladder with one level snapped to the tick grid of `price`.
pub fn seed(price: f64) -> Result<Vec<f64>> {
    if !price.is_finite() || price <= 0.0 {
        return Err(AnalysisError::InvalidInput(format!(
            "ladder reference price must be positive, got {price}"
        )));
    }
    let tick = tick_size(price);
    Ok(vec![round_price((price / tick).round() * tick)])
}

/// Extend `ladder` by `steps` tick-aligned levels on `side`.
///
/// # Errors
/// `InvalidInput` when the ladder is empty, not strictly ascending, contains
/// non-positive prices, or `steps` exceeds [`MAX_STEPS`].  The ladder is left
/// untouched on error.  Stepping down stops at the lowest positive tick.
pub fn extend_ladder(ladder: &mut Vec<f64>, steps: usize, side: LadderSide) -> Result<()> {
    if ladder.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "cannot extend an empty ladder".to_string(),
        ));
    }
    if steps > MAX_STEPS {
        return Err(AnalysisError::InvalidInput(format!(
            "at most {MAX_STEPS} steps per extension, got {steps}"
        )));
    }
    if ladder.iter().any(|p| !p.is_finite() || *p <= 0.0) {
        return Err(AnalysisError::InvalidInput(
            "ladder prices must be positive".to_string(),
        ));
    }
    if ladder.windows(2).any(|w| w[1] <= w[0]) {
        return Err(AnalysisError::InvalidInput(
            "ladder must be strictly ascending".to_string(),
        ));
    }

    match side {
        LadderSide::Up => {
            let mut top = ladder[ladder.len() - 1];
            for _ in 0..steps {
                top = round_price(top + tick_size(top));
                ladder.push(top);
            }
        }
        LadderSide::Down => {
            let mut bottom = ladder[0];
            let mut below = Vec::with_capacity(steps);
            for _ in 0..steps {
                let next = round_price(bottom - tick_below(bottom));
                if next <= 0.0 {
                    break;
                }
                below.push(next);
                bottom = next;
            }
            below.reverse();
            ladder.splice(0..0, below);
        }
    }

    Ok(())
}
