// Window module - analysis windows for STFT frames

use ndarray::Array1;
use std::f32::consts::PI;

use crate::config::WindowKind;

/// Pre-computed window coefficients, one per sample of a frame
pub type Window = Array1<f32>;

/// Build a symmetric window of `frame_length` samples
///
/// `WindowKind::None` yields a rectangular (all ones) window.
pub fn make_window(kind: WindowKind, frame_length: usize) -> Window {
    let denom = frame_length.saturating_sub(1).max(1) as f32;

    Array1::from_iter((0..frame_length).map(|i| {
        let x = i as f32 / denom;
        match kind {
            WindowKind::Hann => 0.5 * (1.0 - (2.0 * PI * x).cos()),
            WindowKind::Hamming => 0.54 - 0.46 * (2.0 * PI * x).cos(),
            WindowKind::Blackman => {
                0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
            }
            WindowKind::Bartlett => 1.0 - (2.0 * x - 1.0).abs(),
            WindowKind::None => 1.0,
        }
    }))
}
