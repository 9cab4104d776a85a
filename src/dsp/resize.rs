// Resize module - time-axis resampling for time-scale augmentation
//
// Stretching (factor > 1) uses bicubic convolution so the upsampled frames
// are smooth; compressing (factor < 1) averages the covered source area so
// no frame is skipped outright. A factor of exactly 1.0 returns a copy.
// Only the time (row) axis changes; the bin axis is left untouched.

use ndarray::{Array1, Array2};

use super::Matrix;
use crate::error::EtlError;

/// Keys cubic convolution coefficient
const CUBIC_A: f32 = -0.75;

/// Resample `features` along the time axis by `factor`
///
/// The output has `round(rows × factor)` rows, and at least one row when the
/// input has any.
pub fn resize_time(features: &Matrix, factor: f32) -> Result<Matrix, EtlError> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(EtlError::InvalidScale { factor });
    }

    let (rows, cols) = features.dim();
    if factor == 1.0 {
        return Ok(features.clone());
    }
    if rows == 0 {
        return Ok(Array2::zeros((0, cols)));
    }

    let out_rows = ((rows as f32 * factor).round() as usize).max(1);
    if factor > 1.0 {
        Ok(resize_cubic(features, out_rows, factor))
    } else {
        Ok(resize_area(features, out_rows, factor))
    }
}

fn cubic_weights(t: f32) -> [f32; 4] {
    let kernel = |x: f32| {
        let x = x.abs();
        if x <= 1.0 {
            ((CUBIC_A + 2.0) * x - (CUBIC_A + 3.0)) * x * x + 1.0
        } else if x < 2.0 {
            ((CUBIC_A * x - 5.0 * CUBIC_A) * x + 8.0 * CUBIC_A) * x - 4.0 * CUBIC_A
        } else {
            0.0
        }
    };
    [kernel(1.0 + t), kernel(t), kernel(1.0 - t), kernel(2.0 - t)]
}

fn resize_cubic(features: &Matrix, out_rows: usize, factor: f32) -> Matrix {
    let (rows, cols) = features.dim();
    let last = rows as isize - 1;
    let mut out = Array2::<f32>::zeros((out_rows, cols));

    for (i, mut row) in out.rows_mut().into_iter().enumerate() {
        let src = (i as f32 + 0.5) / factor - 0.5;
        let base = src.floor();
        let weights = cubic_weights(src - base);

        for (offset, weight) in weights.iter().enumerate() {
            let index = (base as isize + offset as isize - 1).clamp(0, last) as usize;
            row.scaled_add(*weight, &features.row(index));
        }
    }

    out
}

fn resize_area(features: &Matrix, out_rows: usize, factor: f32) -> Matrix {
    let (rows, cols) = features.dim();
    let scale = 1.0 / factor;
    let mut out = Array2::<f32>::zeros((out_rows, cols));

    for (i, mut row) in out.rows_mut().into_iter().enumerate() {
        let start = (i as f32 * scale).min(rows as f32);
        let end = ((i + 1) as f32 * scale).min(rows as f32);
        let mut acc = Array1::<f32>::zeros(cols);
        let mut covered = 0.0;

        let mut j = start.floor() as usize;
        while j < rows && (j as f32) < end {
            let overlap = (end.min((j + 1) as f32) - start.max(j as f32)).max(0.0);
            if overlap > 0.0 {
                acc.scaled_add(overlap, &features.row(j));
                covered += overlap;
            }
            j += 1;
        }

        if covered > 0.0 {
            row.assign(&(acc / covered));
        } else {
            row.assign(&features.row(rows - 1));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(frames: usize, bins: usize) -> Matrix {
        Array2::from_shape_fn((frames, bins), |(t, b)| t as f32 + b as f32 * 100.0)
    }

    #[test]
    fn test_unit_factor_is_identity() {
        let features = ramp(17, 5);
        let out = resize_time(&features, 1.0).unwrap();
        assert_eq!(out, features);
    }

    #[test]
    fn test_stretch_row_count() {
        let features = ramp(20, 3);
        assert_eq!(resize_time(&features, 1.5).unwrap().dim(), (30, 3));
        assert_eq!(resize_time(&features, 1.12).unwrap().nrows(), 22);
    }

    #[test]
    fn test_compress_row_count() {
        let features = ramp(20, 3);
        assert_eq!(resize_time(&features, 0.5).unwrap().dim(), (10, 3));
        assert_eq!(resize_time(&features, 0.01).unwrap().nrows(), 1);
    }

    #[test]
    fn test_area_halving_averages_pairs() {
        let features = ramp(8, 2);
        let out = resize_time(&features, 0.5).unwrap();
        for i in 0..4 {
            let expected = (2 * i) as f32 + 0.5;
            assert!((out[[i, 0]] - expected).abs() < 1e-5);
            assert!((out[[i, 1]] - (expected + 100.0)).abs() < 1e-4);
        }
    }

    #[test]
    fn test_cubic_preserves_constant_signal() {
        let features = Array2::<f32>::from_elem((9, 4), 7.0);
        let out = resize_time(&features, 1.7).unwrap();
        assert!(out.iter().all(|&v| (v - 7.0).abs() < 1e-4));
    }

    #[test]
    fn test_cubic_follows_ramp_interior() {
        let features = ramp(10, 1);
        let out = resize_time(&features, 2.0).unwrap();
        // Output row i samples source position (i + 0.5) / 2 - 0.5
        for i in 4..14 {
            let src = (i as f32 + 0.5) / 2.0 - 0.5;
            assert!((out[[i, 0]] - src).abs() < 0.1, "row {}", i);
            assert!(out[[i, 0]] > out[[i - 1, 0]], "row {} not increasing", i);
        }
    }

    #[test]
    fn test_empty_input_and_invalid_factor() {
        let empty = Array2::<f32>::zeros((0, 40));
        assert_eq!(resize_time(&empty, 1.3).unwrap().dim(), (0, 40));
        assert_eq!(resize_time(&empty, 0.7).unwrap().dim(), (0, 40));

        let features = ramp(4, 1);
        assert!(matches!(
            resize_time(&features, 0.0),
            Err(EtlError::InvalidScale { .. })
        ));
        assert!(resize_time(&features, f32::NAN).is_err());
    }
}
