// Transformer - turns a decoded waveform into the configured feature matrix
//
// The transformation pipeline is as follows:
// 1. Optionally add noise (controlled by `add_noise`)
// 2. Extract features: raw samples, spectrogram, MFSC or MFCC
// 3. Time-warp the feature matrix (controlled by `time_scale_fraction`)
// 4. Optionally append delta / delta-delta features
// 5. Record how many frames hold real data
//
// Steps 3 and 4 apply to spectral features only. The planned FFT, filterbank
// and noise source are built once per config and only read afterwards, so one
// `Transformer` can serve any number of items concurrently.

use std::sync::Arc;

use crate::config::{AudioConfig, FeatureKind, FrameGeometry};
use crate::decoded::DecodedAudio;
use crate::dsp::{
    add_deltas, make_filterbank, make_window, project_cepstral, project_filterbank, resize_time,
    Matrix, Stft,
};
use crate::error::EtlError;
use crate::noise::{NoisePool, NoiseSource};
use crate::params::AugmentationParams;

/// Regression half-width used for delta features
pub const DELTA_ORDER: usize = 1;

/// Read-only artifacts needed by each feature kind
enum Analysis {
    Samples,
    Specgram {
        stft: Stft,
    },
    Mfsc {
        stft: Stft,
        filterbank: Matrix,
    },
    Mfcc {
        stft: Stft,
        filterbank: Matrix,
        num_cepstra: usize,
    },
}

pub struct Transformer {
    analysis: Analysis,
    geometry: FrameGeometry,
    use_delta: bool,
    use_delta_delta: bool,
    noise: Arc<dyn NoiseSource>,
}

impl Transformer {
    /// Build a transformer, loading noise clips from the config's index file
    pub fn new(config: &AudioConfig) -> Result<Self, EtlError> {
        let pool = NoisePool::open(config.noise_index_file.as_deref())?;
        Self::with_noise_source(config, Arc::new(pool))
    }

    /// Build a transformer around an existing noise source
    pub fn with_noise_source(
        config: &AudioConfig,
        noise: Arc<dyn NoiseSource>,
    ) -> Result<Self, EtlError> {
        config.validate()?;
        let geometry = config.geometry()?;
        let frame_length = geometry.frame_length;
        let frame_stride = geometry.frame_stride;
        let plan_stft = || {
            Stft::new(
                make_window(config.window_type, frame_length),
                frame_length,
                frame_stride,
            )
        };

        let analysis = match config.feature {
            FeatureKind::Samples => Analysis::Samples,
            FeatureKind::Specgram => Analysis::Specgram { stft: plan_stft()? },
            FeatureKind::Mfsc { num_filters } => Analysis::Mfsc {
                stft: plan_stft()?,
                filterbank: make_filterbank(num_filters, frame_length, config.sample_freq_hz),
            },
            FeatureKind::Mfcc {
                num_filters,
                num_cepstra,
            } => Analysis::Mfcc {
                stft: plan_stft()?,
                filterbank: make_filterbank(num_filters, frame_length, config.sample_freq_hz),
                num_cepstra,
            },
        };

        tracing::info!(
            "[Transformer] Ready: feature={:?}, time_steps={}, freq_steps={}, noise_clips={}",
            config.feature,
            geometry.time_steps,
            geometry.freq_steps,
            noise.clip_count()
        );

        Ok(Self {
            analysis,
            geometry,
            use_delta: config.use_delta,
            use_delta_delta: config.use_delta_delta,
            noise,
        })
    }

    pub fn geometry(&self) -> &FrameGeometry {
        &self.geometry
    }

    /// Transform one item, returning it with its feature matrix filled in
    pub fn transform(
        &self,
        params: &AugmentationParams,
        mut decoded: DecodedAudio,
    ) -> Result<DecodedAudio, EtlError> {
        self.add_noise(params, &mut decoded)?;

        let time_steps = self.geometry.time_steps;
        let (features, valid_frames) = match &self.analysis {
            Analysis::Samples => {
                let features = decoded.time_data().clone();
                let valid_frames = features.nrows().min(time_steps);
                (features, valid_frames)
            }
            spectral => {
                let features = self.extract_spectral(spectral, decoded.time_data())?;
                let features = resize_time(&features, params.time_scale_fraction)?;
                let features = if self.use_delta {
                    add_deltas(&features, DELTA_ORDER, self.use_delta_delta)?
                } else {
                    features
                };
                let valid_frames = features.nrows().min(time_steps);
                (features, valid_frames)
            }
        };

        tracing::debug!(
            "[Transformer] {} samples -> {:?} features, {} valid frames",
            decoded.num_samples(),
            features.dim(),
            valid_frames
        );
        decoded.set_features(features, valid_frames);
        Ok(decoded)
    }

    fn add_noise(
        &self,
        params: &AugmentationParams,
        decoded: &mut DecodedAudio,
    ) -> Result<(), EtlError> {
        if !params.add_noise {
            return Ok(());
        }

        let segment = self.noise.sample(
            params.noise_index,
            params.noise_offset_fraction,
            params.noise_level,
            decoded.num_samples(),
        )?;
        let Some(segment) = segment else {
            return Ok(());
        };
        if params.noise_level == 0.0 {
            return Ok(());
        }

        for mut channel in decoded.time_data_mut().columns_mut() {
            for (sample, noise) in channel.iter_mut().zip(segment.iter()) {
                *sample += noise;
            }
        }
        Ok(())
    }

    fn extract_spectral(&self, analysis: &Analysis, samples: &Matrix) -> Result<Matrix, EtlError> {
        let time_steps = self.geometry.time_steps;

        match analysis {
            Analysis::Samples => Ok(samples.clone()),
            Analysis::Specgram { stft } => Ok(stft.compute(samples.view(), time_steps)),
            Analysis::Mfsc { stft, filterbank } => {
                let spectrogram = stft.compute(samples.view(), time_steps);
                project_filterbank(&spectrogram, filterbank)
            }
            Analysis::Mfcc {
                stft,
                filterbank,
                num_cepstra,
            } => {
                let spectrogram = stft.compute(samples.view(), time_steps);
                let melspec = project_filterbank(&spectrogram, filterbank)?;
                project_cepstral(&melspec, *num_cepstra)
            }
        }
    }
}
