// Deltas module - regression-based dynamic features
//
// d[t] = Σ_{n=1..N} n · (c[t+n] − c[t−n]) / (2 · Σ_{n=1..N} n²)
//
// Frames beyond either edge repeat the first/last frame.

use ndarray::{concatenate, Array2, Axis};

use super::Matrix;
use crate::error::EtlError;

/// Append delta (and optionally delta-delta) features along the bin axis
///
/// Returns `[static | delta]` or `[static | delta | delta-delta]`.
///
/// # Arguments
/// * `features` - Time × bins matrix
/// * `order` - Regression half-width N (frames on each side)
/// * `include_delta_delta` - Also append the delta of the deltas
pub fn add_deltas(
    features: &Matrix,
    order: usize,
    include_delta_delta: bool,
) -> Result<Matrix, EtlError> {
    if order == 0 {
        return Err(EtlError::ShapeMismatch {
            reason: "delta order must be at least 1".to_string(),
        });
    }

    let delta = regression_delta(features, order);
    let stacked = if include_delta_delta {
        let delta_delta = regression_delta(&delta, order);
        concatenate(
            Axis(1),
            &[features.view(), delta.view(), delta_delta.view()],
        )
    } else {
        concatenate(Axis(1), &[features.view(), delta.view()])
    };

    stacked.map_err(|err| EtlError::ShapeMismatch {
        reason: err.to_string(),
    })
}

fn regression_delta(features: &Matrix, order: usize) -> Matrix {
    let frames = features.nrows();
    let mut delta = Array2::<f32>::zeros(features.dim());
    if frames == 0 {
        return delta;
    }

    let denom = 2.0 * (1..=order).map(|n| (n * n) as f32).sum::<f32>();
    let last = frames - 1;

    for t in 0..frames {
        let mut row = delta.row_mut(t);
        for n in 1..=order {
            let ahead = features.row((t + n).min(last));
            let behind = features.row(t.saturating_sub(n));
            row.scaled_add(n as f32, &(&ahead - &behind));
        }
        row.mapv_inplace(|v| v / denom);
    }

    delta
}
