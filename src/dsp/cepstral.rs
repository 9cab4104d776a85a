// Cepstral module - DCT projection of log mel energies

use ndarray::Array2;
use std::f32::consts::PI;

use super::Matrix;
use crate::error::EtlError;

/// Apply an orthonormal DCT-II to each row, keeping the first `num_cepstra`
/// coefficients
pub fn project_cepstral(melspec: &Matrix, num_cepstra: usize) -> Result<Matrix, EtlError> {
    let n = melspec.ncols();
    if num_cepstra > n {
        return Err(EtlError::ShapeMismatch {
            reason: format!(
                "cannot keep {} cepstra from {} filterbank energies",
                num_cepstra, n
            ),
        });
    }

    let dct = Array2::from_shape_fn((num_cepstra, n), |(k, i)| {
        let scale = if k == 0 {
            (1.0 / n as f32).sqrt()
        } else {
            (2.0 / n as f32).sqrt()
        };
        scale * (PI * k as f32 * (2 * i + 1) as f32 / (2 * n) as f32).cos()
    });

    Ok(melspec.dot(&dct.t()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_rows_only_have_dc() {
        let melspec = Array2::<f32>::from_elem((5, 16), 2.0);
        let mfcc = project_cepstral(&melspec, 8).unwrap();
        assert_eq!(mfcc.dim(), (5, 8));

        for row in mfcc.rows() {
            assert!((row[0] - 2.0 * 16f32.sqrt()).abs() < 1e-4);
            assert!(row.iter().skip(1).all(|c| c.abs() < 1e-4));
        }
    }

    #[test]
    fn test_full_dct_preserves_energy() {
        let melspec = Array2::from_shape_fn((1, 12), |(_, i)| (i as f32 * 0.7).sin());
        let mfcc = project_cepstral(&melspec, 12).unwrap();
        let before: f32 = melspec.iter().map(|v| v * v).sum();
        let after: f32 = mfcc.iter().map(|v| v * v).sum();
        assert!((before - after).abs() < 1e-4);
    }

    #[test]
    fn test_too_many_cepstra() {
        let melspec = Array2::<f32>::zeros((2, 4));
        assert!(project_cepstral(&melspec, 5).is_err());
    }

    #[test]
    fn test_zero_frames() {
        let melspec = Array2::<f32>::zeros((0, 40));
        assert_eq!(project_cepstral(&melspec, 13).unwrap().dim(), (0, 13));
    }
}
