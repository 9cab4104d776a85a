// Signal library - pure matrix transforms behind the feature pipeline
//
// Every function here is side-effect free and operates on `Matrix` values
// laid out as rows = time frames, columns = frequency/feature bins (or, for
// raw audio, rows = samples, columns = channels).
//
// Module organization:
// - window: analysis window construction
// - filterbank: mel filterbank construction and projection
// - stft: framed FFT magnitude spectrogram (rustfft)
// - cepstral: DCT projection of log mel energies
// - deltas: delta / delta-delta regression features
// - resize: time-axis resampling for time-scale augmentation

mod cepstral;
mod deltas;
mod filterbank;
mod resize;
mod stft;
mod window;

use ndarray::Array2;

pub use cepstral::project_cepstral;
pub use deltas::add_deltas;
pub use filterbank::{hz_to_mel, make_filterbank, mel_to_hz, project_filterbank};
pub use resize::resize_time;
pub use stft::{stft, Stft};
pub use window::{make_window, Window};

/// Row-major feature matrix (time × bins)
pub type Matrix = Array2<f32>;
