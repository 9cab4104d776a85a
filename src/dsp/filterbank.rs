// Filterbank module - mel-spaced triangular filters
//
// Filters are spaced evenly on the mel scale between 0 Hz and Nyquist. Each
// row of the filterbank matrix weights the `frame_length / 2 + 1` STFT bins
// for one filter, rising linearly to 1.0 at the centre bin.
//
// References:
// - Davis, S. & Mermelstein, P. (1980). Comparison of parametric
//   representations for monosyllabic word recognition

use ndarray::Array2;

use super::Matrix;
use crate::error::EtlError;

/// Floor applied before the logarithm so silent frames stay finite
const LOG_FLOOR: f32 = 1e-10;

pub fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

pub fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10f32.powf(mel / 2595.0) - 1.0)
}

/// Build a `num_filters × (frame_length / 2 + 1)` mel filterbank
pub fn make_filterbank(num_filters: usize, frame_length: usize, sample_rate: u32) -> Matrix {
    let num_bins = frame_length / 2 + 1;
    let mut filterbank = Array2::<f32>::zeros((num_filters, num_bins));
    if num_filters == 0 || sample_rate == 0 {
        return filterbank;
    }

    let mel_max = hz_to_mel(sample_rate as f32 / 2.0);
    let bins: Vec<usize> = (0..num_filters + 2)
        .map(|i| {
            let hz = mel_to_hz(mel_max * i as f32 / (num_filters + 1) as f32);
            let bin = ((frame_length + 1) as f32 * hz / sample_rate as f32).floor() as usize;
            bin.min(num_bins - 1)
        })
        .collect();

    for m in 0..num_filters {
        let (left, center, right) = (bins[m], bins[m + 1], bins[m + 2]);

        for k in left..center {
            filterbank[[m, k]] = (k - left) as f32 / (center - left) as f32;
        }
        filterbank[[m, center]] = 1.0;
        for k in center + 1..=right {
            filterbank[[m, k]] = (right - k) as f32 / (right - center) as f32;
        }
    }

    filterbank
}

/// Project a magnitude spectrogram onto the filterbank, returning log energies
pub fn project_filterbank(spectrogram: &Matrix, filterbank: &Matrix) -> Result<Matrix, EtlError> {
    if spectrogram.ncols() != filterbank.ncols() {
        return Err(EtlError::ShapeMismatch {
            reason: format!(
                "spectrogram has {} bins but filterbank expects {}",
                spectrogram.ncols(),
                filterbank.ncols()
            ),
        });
    }

    let energies = spectrogram.dot(&filterbank.t());
    Ok(energies.mapv(|e| e.max(LOG_FLOOR).ln()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mel_scale_roundtrip() {
        for hz in [0.0, 100.0, 1000.0, 4000.0, 8000.0] {
            let back = mel_to_hz(hz_to_mel(hz));
            assert!((back - hz).abs() < 0.5, "{} Hz came back as {}", hz, back);
        }
        assert!((hz_to_mel(1000.0) - 1000.0).abs() < 1.0);
    }

    #[test]
    fn test_filterbank_shape_and_peaks() {
        let filterbank = make_filterbank(40, 400, 16_000);
        assert_eq!(filterbank.dim(), (40, 201));

        for row in filterbank.rows() {
            let peak = row.iter().cloned().fold(f32::MIN, f32::max);
            assert_eq!(peak, 1.0);
            assert!(row.iter().all(|&w| (0.0..=1.0).contains(&w)));
        }
    }

    #[test]
    fn test_filter_centres_increase() {
        let filterbank = make_filterbank(20, 512, 16_000);
        let centres: Vec<usize> = filterbank
            .rows()
            .into_iter()
            .map(|row| row.iter().position(|&w| w == 1.0).unwrap())
            .collect();
        assert!(centres.windows(2).all(|pair| pair[0] <= pair[1]));
        assert!(centres.last().unwrap() > &100);
    }

    #[test]
    fn test_projection_is_log_energy() {
        let filterbank = make_filterbank(4, 16, 8_000);
        let spectrogram = Array2::<f32>::ones((3, 9));
        let projected = project_filterbank(&spectrogram, &filterbank).unwrap();
        assert_eq!(projected.dim(), (3, 4));

        let expected = filterbank.row(0).sum().ln();
        assert!((projected[[0, 0]] - expected).abs() < 1e-5);
    }

    #[test]
    fn test_projection_floors_silence() {
        let filterbank = make_filterbank(4, 16, 8_000);
        let silence = Array2::<f32>::zeros((2, 9));
        let projected = project_filterbank(&silence, &filterbank).unwrap();
        assert!(projected.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_projection_rejects_bin_mismatch() {
        let filterbank = make_filterbank(4, 16, 8_000);
        let spectrogram = Array2::<f32>::ones((3, 5));
        assert!(matches!(
            project_filterbank(&spectrogram, &filterbank),
            Err(EtlError::ShapeMismatch { .. })
        ));
    }
}
