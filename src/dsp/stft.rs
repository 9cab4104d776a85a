// STFT module - framed FFT magnitude spectrogram
//
// Frames of `frame_length` samples are taken every `frame_stride` samples,
// multiplied by the analysis window, and transformed with rustfft. Only the
// non-negative frequency bins (0..=frame_length/2) are kept.

use std::sync::Arc;

use ndarray::{Array2, ArrayView2, Axis};
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use super::{Matrix, Window};
use crate::error::EtlError;

/// Short-time Fourier analyzer with its FFT planned up front
///
/// Built once per config and shared read-only; each call allocates its own
/// scratch buffer, so one instance can serve concurrent items.
pub struct Stft {
    fft: Arc<dyn Fft<f32>>,
    window: Window,
    frame_length: usize,
    frame_stride: usize,
}

impl Stft {
    /// Plan a `frame_length`-point FFT for the given window and stride
    ///
    /// # Arguments
    /// * `window` - Analysis window, one coefficient per frame sample
    /// * `frame_length` - Samples per frame (FFT size)
    /// * `frame_stride` - Samples between frame starts
    pub fn new(window: Window, frame_length: usize, frame_stride: usize) -> Result<Self, EtlError> {
        if frame_length == 0 || frame_stride == 0 {
            return Err(EtlError::ShapeMismatch {
                reason: format!(
                    "frame length {} and stride {} must be non-zero",
                    frame_length, frame_stride
                ),
            });
        }
        if window.len() != frame_length {
            return Err(EtlError::ShapeMismatch {
                reason: format!(
                    "window has {} coefficients for a {}-sample frame",
                    window.len(),
                    frame_length
                ),
            });
        }

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(frame_length);

        Ok(Self {
            fft,
            window,
            frame_length,
            frame_stride,
        })
    }

    /// Magnitude bins per frame
    pub fn num_bins(&self) -> usize {
        self.frame_length / 2 + 1
    }

    /// Compute a `frames × (frame_length / 2 + 1)` magnitude spectrogram
    ///
    /// Multi-channel input is averaged to mono first. Inputs shorter than one
    /// frame (including empty input) produce a spectrogram with zero rows.
    /// At most `max_frames` frames are produced.
    pub fn compute(&self, samples: ArrayView2<f32>, max_frames: usize) -> Matrix {
        let frame_length = self.frame_length;
        let mono = samples
            .mean_axis(Axis(1))
            .unwrap_or_else(|| ndarray::Array1::zeros(0));

        let num_frames = if mono.len() < frame_length {
            0
        } else {
            ((mono.len() - frame_length) / self.frame_stride + 1).min(max_frames)
        };

        let mut spectrogram = Array2::<f32>::zeros((num_frames, self.num_bins()));
        if num_frames == 0 {
            return spectrogram;
        }

        let mut buffer = vec![Complex::new(0.0, 0.0); frame_length];

        for (frame, mut row) in spectrogram.rows_mut().into_iter().enumerate() {
            let start = frame * self.frame_stride;
            let segment = mono.slice(ndarray::s![start..start + frame_length]);

            for ((slot, &sample), &weight) in buffer
                .iter_mut()
                .zip(segment.iter())
                .zip(self.window.iter())
            {
                *slot = Complex::new(sample * weight, 0.0);
            }
            self.fft.process(&mut buffer);

            for (bin, value) in row.iter_mut().enumerate() {
                *value = buffer[bin].norm();
            }
        }

        spectrogram
    }
}

/// One-off spectrogram; plans the FFT for this call only
///
/// Repeated analysis with the same geometry should hold an [`Stft`] instead.
pub fn stft(
    samples: ArrayView2<f32>,
    frame_length: usize,
    frame_stride: usize,
    max_frames: usize,
    window: &Window,
) -> Result<Matrix, EtlError> {
    let analyzer = Stft::new(window.clone(), frame_length, frame_stride)?;
    Ok(analyzer.compute(samples, max_frames))
}
