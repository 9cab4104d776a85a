// Decoded audio items and the WAV extractor that produces them
//
// A `DecodedAudio` carries the time-domain sample matrix of one dataset
// item together with the feature matrix built from it. The transformer takes
// the item by value, rewrites the feature matrix and `valid_frames`, then
// hands it on to the loader, which only reads it.

use std::io::Cursor;

use ndarray::Array2;

use crate::dsp::Matrix;
use crate::error::EtlError;

/// One item's samples and features
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    time_data: Matrix,
    freq_data: Matrix,
    valid_frames: usize,
    sample_rate: u32,
}

impl DecodedAudio {
    /// Wrap a time-domain matrix (rows = samples, columns = channels)
    pub fn new(time_data: Matrix, sample_rate: u32) -> Self {
        Self {
            time_data,
            freq_data: Array2::zeros((0, 0)),
            valid_frames: 0,
            sample_rate,
        }
    }

    /// Single-channel item from a flat sample slice
    pub fn from_mono(samples: &[f32], sample_rate: u32) -> Self {
        let time_data = Array2::from_shape_fn((samples.len(), 1), |(i, _)| samples[i]);
        Self::new(time_data, sample_rate)
    }

    /// Item whose features were computed elsewhere
    pub fn from_features(features: Matrix, valid_frames: usize) -> Self {
        Self {
            time_data: Array2::zeros((0, 0)),
            freq_data: features,
            valid_frames,
            sample_rate: 0,
        }
    }

    pub fn time_data(&self) -> &Matrix {
        &self.time_data
    }

    pub fn time_data_mut(&mut self) -> &mut Matrix {
        &mut self.time_data
    }

    pub fn freq_data(&self) -> &Matrix {
        &self.freq_data
    }

    /// Rows of the feature matrix holding real (non-padding) frames
    pub fn valid_frames(&self) -> usize {
        self.valid_frames
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn num_samples(&self) -> usize {
        self.time_data.nrows()
    }

    pub fn num_channels(&self) -> usize {
        self.time_data.ncols()
    }

    pub(crate) fn set_features(&mut self, features: Matrix, valid_frames: usize) {
        self.freq_data = features;
        self.valid_frames = valid_frames;
    }
}

/// Decode an in-memory WAV file
///
/// Integer PCM is scaled into [-1.0, 1.0]; float PCM is kept as-is.
pub fn decode(bytes: &[u8]) -> Result<DecodedAudio, EtlError> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels);

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<f32>, hound::Error>>()?,
        hound::SampleFormat::Int => {
            if !(8..=32).contains(&spec.bits_per_sample) {
                return Err(EtlError::Decode {
                    details: format!("unsupported bits per sample {}", spec.bits_per_sample),
                });
            }
            let max = ((1i64 << (spec.bits_per_sample - 1)) - 1) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|value| value as f32 / max))
                .collect::<Result<Vec<f32>, hound::Error>>()?
        }
    };

    let frames = samples.len() / channels;
    let time_data =
        Array2::from_shape_vec((frames, channels), samples).map_err(|err| EtlError::Decode {
            details: format!("interleaved samples do not fill whole frames: {}", err),
        })?;

    Ok(DecodedAudio::new(time_data, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_wav(channels: u16, bits: u16, frames: &[Vec<i32>]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 16_000,
            bits_per_sample: bits,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for frame in frames {
                for &sample in frame {
                    writer.write_sample(sample).unwrap();
                }
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_decode_mono_i16() {
        let bytes = encode_wav(1, 16, &[vec![0], vec![32767], vec![-32767], vec![16384]]);
        let decoded = decode(&bytes).unwrap();

        assert_eq!(decoded.num_samples(), 4);
        assert_eq!(decoded.num_channels(), 1);
        assert_eq!(decoded.sample_rate(), 16_000);
        assert_eq!(decoded.time_data()[[1, 0]], 1.0);
        assert_eq!(decoded.time_data()[[2, 0]], -1.0);
        assert!((decoded.time_data()[[3, 0]] - 0.5).abs() < 1e-4);
        assert_eq!(decoded.valid_frames(), 0);
    }

    #[test]
    fn test_decode_stereo_layout() {
        let bytes = encode_wav(2, 16, &[vec![100, -100], vec![200, -200], vec![300, -300]]);
        let decoded = decode(&bytes).unwrap();

        assert_eq!(decoded.time_data().dim(), (3, 2));
        assert!(decoded.time_data()[[2, 0]] > 0.0);
        assert!(decoded.time_data()[[2, 1]] < 0.0);
    }

    #[test]
    fn test_decode_empty_wav() {
        let bytes = encode_wav(1, 16, &[]);
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.time_data().dim(), (0, 1));
    }

    #[test]
    fn test_decode_garbage_is_error() {
        let err = decode(b"definitely not a wav file").unwrap_err();
        assert!(matches!(err, EtlError::Decode { .. }));
    }

    #[test]
    fn test_from_mono() {
        let decoded = DecodedAudio::from_mono(&[0.1, 0.2, 0.3], 8_000);
        assert_eq!(decoded.time_data().dim(), (3, 1));
        assert_eq!(decoded.time_data()[[2, 0]], 0.3);
    }
}
