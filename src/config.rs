// Configuration for the audio feature-extraction stage
//
// An `AudioConfig` is loaded once per dataset definition from JSON and is
// immutable afterwards. Durations are written with units (`"25 milliseconds"`,
// `"400 samples"`, `"2 seconds"`) and resolved against the sample rate into a
// `FrameGeometry` that fixes the output shape every item is packed into.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{log_config_error, ConfigError};

/// Length of time expressed in one of the supported units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Duration {
    pub value: f64,
    pub unit: DurationUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationUnit {
    Samples,
    Milliseconds,
    Seconds,
}

impl Duration {
    pub fn samples(value: usize) -> Self {
        Self {
            value: value as f64,
            unit: DurationUnit::Samples,
        }
    }

    pub fn milliseconds(value: f64) -> Self {
        Self {
            value,
            unit: DurationUnit::Milliseconds,
        }
    }

    pub fn seconds(value: f64) -> Self {
        Self {
            value,
            unit: DurationUnit::Seconds,
        }
    }

    /// Resolve to a whole number of samples at `sample_rate`
    pub fn to_samples(&self, sample_rate: u32) -> Result<usize, ConfigError> {
        let samples = match self.unit {
            DurationUnit::Samples => self.value,
            DurationUnit::Milliseconds => self.value * f64::from(sample_rate) / 1000.0,
            DurationUnit::Seconds => self.value * f64::from(sample_rate),
        };

        if !samples.is_finite() || samples < 0.0 {
            return Err(ConfigError::InvalidDuration {
                value: self.to_string(),
            });
        }

        Ok(samples.round() as usize)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.unit {
            DurationUnit::Samples => "samples",
            DurationUnit::Milliseconds => "milliseconds",
            DurationUnit::Seconds => "seconds",
        };
        write!(f, "{} {}", self.value, unit)
    }
}

impl FromStr for Duration {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidDuration {
            value: s.to_string(),
        };

        let mut parts = s.split_whitespace();
        let value: f64 = parts
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or_else(invalid)?;
        let unit = match parts.next() {
            Some("samples") | Some("sample") => DurationUnit::Samples,
            Some("milliseconds") | Some("millisecond") | Some("ms") => DurationUnit::Milliseconds,
            Some("seconds") | Some("second") | Some("s") => DurationUnit::Seconds,
            _ => return Err(invalid()),
        };
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self { value, unit })
    }
}

impl TryFrom<String> for Duration {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Duration> for String {
    fn from(duration: Duration) -> Self {
        duration.to_string()
    }
}

/// Feature representation produced for each item
///
/// Each variant owns exactly the fields it needs; the cepstral count only
/// exists on `Mfcc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeatureKind {
    /// Raw time-domain samples, one column per channel
    Samples,
    /// STFT magnitude spectrogram
    Specgram,
    /// Log mel-filterbank energies
    Mfsc { num_filters: usize },
    /// Mel-frequency cepstral coefficients
    Mfcc {
        num_filters: usize,
        num_cepstra: usize,
    },
}

impl FeatureKind {
    pub fn is_samples(&self) -> bool {
        matches!(self, FeatureKind::Samples)
    }

    /// Number of mel filters, for the filterbank-based kinds
    pub fn num_filters(&self) -> Option<usize> {
        match self {
            FeatureKind::Mfsc { num_filters } | FeatureKind::Mfcc { num_filters, .. } => {
                Some(*num_filters)
            }
            FeatureKind::Samples | FeatureKind::Specgram => None,
        }
    }
}

/// Analysis window applied to each STFT frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    #[default]
    Hann,
    Hamming,
    Blackman,
    Bartlett,
    None,
}

/// Element type of the destination buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ElementType {
    #[default]
    #[serde(rename = "uint8")]
    U8,
    #[serde(rename = "int8")]
    I8,
    #[serde(rename = "uint16")]
    U16,
    #[serde(rename = "int16")]
    I16,
    #[serde(rename = "int32")]
    I32,
    #[serde(rename = "float")]
    F32,
    #[serde(rename = "double")]
    F64,
}

impl ElementType {
    /// Size of one element in bytes
    pub fn size(&self) -> usize {
        match self {
            ElementType::U8 | ElementType::I8 => 1,
            ElementType::U16 | ElementType::I16 => 2,
            ElementType::I32 | ElementType::F32 => 4,
            ElementType::F64 => 8,
        }
    }
}

/// Inclusive `[low, high]` bounds of a uniform distribution, written as a
/// two-element JSON array
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds<T>(pub T, pub T);

impl<T: Copy> Bounds<T> {
    pub fn low(&self) -> T {
        self.0
    }

    pub fn high(&self) -> T {
        self.1
    }
}

/// Output shape and frame geometry resolved to samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameGeometry {
    pub frame_length: usize,
    pub frame_stride: usize,
    pub max_duration: usize,
    /// Columns of the destination layout
    pub time_steps: usize,
    /// Rows of the destination layout
    pub freq_steps: usize,
}

/// Complete per-dataset audio configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Longest input kept; longer inputs are truncated
    pub max_duration: Duration,
    #[serde(default = "default_frame_length")]
    pub frame_length: Duration,
    #[serde(default = "default_frame_stride")]
    pub frame_stride: Duration,
    #[serde(default = "default_sample_freq_hz")]
    pub sample_freq_hz: u32,
    #[serde(default = "default_feature")]
    pub feature: FeatureKind,
    #[serde(default)]
    pub window_type: WindowKind,
    /// Channel count for raw-sample features
    #[serde(default = "default_num_channels")]
    pub num_channels: usize,
    #[serde(default)]
    pub use_delta: bool,
    #[serde(default)]
    pub use_delta_delta: bool,
    /// File listing one noise WAV path per line
    #[serde(default)]
    pub noise_index_file: Option<PathBuf>,
    #[serde(default)]
    pub output_type: ElementType,
    /// Global seed; per-item randomness is derived from it
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub add_noise_probability: f64,
    #[serde(default = "default_noise_index")]
    pub noise_index: Bounds<u32>,
    #[serde(default = "default_noise_level")]
    pub noise_level: Bounds<f32>,
    #[serde(default = "default_noise_offset_fraction")]
    pub noise_offset_fraction: Bounds<f32>,
    #[serde(default = "default_time_scale_fraction")]
    pub time_scale_fraction: Bounds<f32>,
}

fn default_frame_length() -> Duration {
    Duration::milliseconds(25.0)
}

fn default_frame_stride() -> Duration {
    Duration::milliseconds(10.0)
}

fn default_sample_freq_hz() -> u32 {
    16_000
}

fn default_feature() -> FeatureKind {
    FeatureKind::Specgram
}

fn default_num_channels() -> usize {
    1
}

fn default_noise_index() -> Bounds<u32> {
    Bounds(0, 0)
}

fn default_noise_level() -> Bounds<f32> {
    Bounds(0.0, 0.5)
}

fn default_noise_offset_fraction() -> Bounds<f32> {
    Bounds(0.0, 1.0)
}

fn default_time_scale_fraction() -> Bounds<f32> {
    Bounds(1.0, 1.0)
}

impl AudioConfig {
    /// Config with defaults for everything but duration and feature kind
    pub fn new(max_duration: Duration, feature: FeatureKind) -> Self {
        Self {
            max_duration,
            frame_length: default_frame_length(),
            frame_stride: default_frame_stride(),
            sample_freq_hz: default_sample_freq_hz(),
            feature,
            window_type: WindowKind::default(),
            num_channels: default_num_channels(),
            use_delta: false,
            use_delta_delta: false,
            noise_index_file: None,
            output_type: ElementType::default(),
            seed: 0,
            add_noise_probability: 0.0,
            noise_index: default_noise_index(),
            noise_level: default_noise_level(),
            noise_offset_fraction: default_noise_offset_fraction(),
            time_scale_fraction: default_time_scale_fraction(),
        }
    }

    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: AudioConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    ///
    /// Unlike interactive settings, a dataset definition that cannot be read
    /// is an error rather than a fallback to defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(&path).map_err(|err| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            details: err.to_string(),
        })?;
        let config =
            Self::from_json(&contents).inspect_err(|err| log_config_error(err, "load_from_file"))?;
        tracing::info!("[Config] Loaded audio configuration from {:?}", path.as_ref());
        Ok(config)
    }

    /// Width of one frame's feature vector before delta augmentation
    pub fn base_feature_width(&self) -> Result<usize, ConfigError> {
        Ok(match self.feature {
            FeatureKind::Samples => self.num_channels,
            FeatureKind::Specgram => self.frame_length.to_samples(self.sample_freq_hz)? / 2 + 1,
            FeatureKind::Mfsc { num_filters } => num_filters,
            FeatureKind::Mfcc { num_cepstra, .. } => num_cepstra,
        })
    }

    /// Multiplier applied to the feature width by delta augmentation
    pub fn delta_multiplier(&self) -> usize {
        match (self.use_delta, self.use_delta_delta) {
            (true, true) => 3,
            (true, false) => 2,
            _ => 1,
        }
    }

    /// Resolve durations to samples and derive the destination shape
    pub fn geometry(&self) -> Result<FrameGeometry, ConfigError> {
        if self.sample_freq_hz == 0 {
            return Err(ConfigError::InvalidSampleRate);
        }

        let max_duration = self.max_duration.to_samples(self.sample_freq_hz)?;
        if max_duration == 0 {
            return Err(ConfigError::InvalidDuration {
                value: self.max_duration.to_string(),
            });
        }

        if self.feature.is_samples() {
            if self.num_channels == 0 {
                return Err(ConfigError::InvalidChannels);
            }
            return Ok(FrameGeometry {
                frame_length: 1,
                frame_stride: 1,
                max_duration,
                time_steps: max_duration,
                freq_steps: self.num_channels,
            });
        }

        let frame_length = self.frame_length.to_samples(self.sample_freq_hz)?;
        let frame_stride = self.frame_stride.to_samples(self.sample_freq_hz)?;
        if frame_length == 0 || frame_stride == 0 {
            return Err(ConfigError::InvalidFrame {
                reason: format!(
                    "frame length {} and stride {} must both be at least one sample",
                    self.frame_length, self.frame_stride
                ),
            });
        }
        if max_duration < frame_length {
            return Err(ConfigError::InvalidFrame {
                reason: format!(
                    "max duration {} is shorter than one frame ({})",
                    self.max_duration, self.frame_length
                ),
            });
        }

        Ok(FrameGeometry {
            frame_length,
            frame_stride,
            max_duration,
            time_steps: (max_duration - frame_length) / frame_stride + 1,
            freq_steps: self.base_feature_width()? * self.delta_multiplier(),
        })
    }

    /// Validate invariant expectations for downstream stages
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.geometry()?;

        match self.feature {
            FeatureKind::Samples => {
                if self.use_delta || self.use_delta_delta {
                    return Err(ConfigError::InvalidFeature {
                        reason: "delta features require a spectral feature type".to_string(),
                    });
                }
            }
            FeatureKind::Specgram => {}
            FeatureKind::Mfsc { num_filters } => {
                if num_filters == 0 {
                    return Err(ConfigError::InvalidFeature {
                        reason: "num_filters must be > 0".to_string(),
                    });
                }
            }
            FeatureKind::Mfcc {
                num_filters,
                num_cepstra,
            } => {
                if num_filters == 0 || num_cepstra == 0 {
                    return Err(ConfigError::InvalidFeature {
                        reason: "num_filters and num_cepstra must be > 0".to_string(),
                    });
                }
                if num_cepstra > num_filters {
                    return Err(ConfigError::InvalidFeature {
                        reason: format!(
                            "num_cepstra ({}) cannot exceed num_filters ({})",
                            num_cepstra, num_filters
                        ),
                    });
                }
            }
        }

        if self.use_delta_delta && !self.use_delta {
            return Err(ConfigError::InvalidFeature {
                reason: "use_delta_delta requires use_delta".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.add_noise_probability) {
            return Err(ConfigError::InvalidDistribution {
                field: "add_noise_probability".to_string(),
                reason: format!("{} is not a probability", self.add_noise_probability),
            });
        }

        if self.noise_index.low() > self.noise_index.high() {
            return Err(reversed("noise_index"));
        }
        check_float_bounds("noise_level", self.noise_level)?;
        if self.noise_level.low() < 0.0 {
            return Err(ConfigError::InvalidDistribution {
                field: "noise_level".to_string(),
                reason: "gain cannot be negative".to_string(),
            });
        }
        check_float_bounds("noise_offset_fraction", self.noise_offset_fraction)?;
        if self.noise_offset_fraction.low() < 0.0 || self.noise_offset_fraction.high() > 1.0 {
            return Err(ConfigError::InvalidDistribution {
                field: "noise_offset_fraction".to_string(),
                reason: "bounds must lie within [0, 1]".to_string(),
            });
        }
        check_float_bounds("time_scale_fraction", self.time_scale_fraction)?;
        if self.time_scale_fraction.low() <= 0.0 {
            return Err(ConfigError::InvalidDistribution {
                field: "time_scale_fraction".to_string(),
                reason: "bounds must be > 0".to_string(),
            });
        }

        Ok(())
    }
}

fn reversed(field: &str) -> ConfigError {
    ConfigError::InvalidDistribution {
        field: field.to_string(),
        reason: "low bound exceeds high bound".to_string(),
    }
}

fn check_float_bounds(field: &str, bounds: Bounds<f32>) -> Result<(), ConfigError> {
    if !bounds.low().is_finite() || !bounds.high().is_finite() {
        return Err(ConfigError::InvalidDistribution {
            field: field.to_string(),
            reason: "bounds must be finite".to_string(),
        });
    }
    if bounds.low() > bounds.high() {
        return Err(reversed(field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mfsc_config() -> AudioConfig {
        AudioConfig::new(
            Duration::milliseconds(1010.0),
            FeatureKind::Mfsc { num_filters: 40 },
        )
    }

    #[test]
    fn test_duration_parsing() {
        let d: Duration = "25 milliseconds".parse().unwrap();
        assert_eq!(d, Duration::milliseconds(25.0));
        assert_eq!(d.to_samples(16_000).unwrap(), 400);

        let d: Duration = "2 seconds".parse().unwrap();
        assert_eq!(d.to_samples(8_000).unwrap(), 16_000);

        let d: Duration = "321 samples".parse().unwrap();
        assert_eq!(d.to_samples(44_100).unwrap(), 321);

        assert!("25".parse::<Duration>().is_err());
        assert!("25 fortnights".parse::<Duration>().is_err());
        assert!("abc samples".parse::<Duration>().is_err());
    }

    #[test]
    fn test_mfsc_geometry() {
        let geometry = mfsc_config().geometry().unwrap();
        assert_eq!(geometry.frame_length, 400);
        assert_eq!(geometry.frame_stride, 160);
        assert_eq!(geometry.max_duration, 16_160);
        assert_eq!(geometry.time_steps, 99);
        assert_eq!(geometry.freq_steps, 40);
    }

    #[test]
    fn test_delta_widens_freq_steps() {
        let mut config = AudioConfig::new(
            Duration::seconds(1.0),
            FeatureKind::Mfcc {
                num_filters: 40,
                num_cepstra: 13,
            },
        );
        assert_eq!(config.geometry().unwrap().freq_steps, 13);

        config.use_delta = true;
        assert_eq!(config.geometry().unwrap().freq_steps, 26);

        config.use_delta_delta = true;
        assert_eq!(config.geometry().unwrap().freq_steps, 39);
    }

    #[test]
    fn test_specgram_and_samples_geometry() {
        let config = AudioConfig::new(Duration::samples(1000), FeatureKind::Specgram);
        let geometry = config.geometry().unwrap();
        assert_eq!(geometry.freq_steps, 201);
        assert_eq!(geometry.time_steps, (1000 - 400) / 160 + 1);

        let mut config = AudioConfig::new(Duration::samples(1000), FeatureKind::Samples);
        config.num_channels = 2;
        let geometry = config.geometry().unwrap();
        assert_eq!(geometry.time_steps, 1000);
        assert_eq!(geometry.freq_steps, 2);
    }

    #[test]
    fn test_validate_rejects_inconsistent_fields() {
        let mut config = mfsc_config();
        config.use_delta_delta = true;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidFeature { .. })
        ));

        let config = AudioConfig::new(
            Duration::seconds(1.0),
            FeatureKind::Mfcc {
                num_filters: 10,
                num_cepstra: 20,
            },
        );
        assert!(config.validate().is_err());

        let mut config = mfsc_config();
        config.time_scale_fraction = Bounds(0.0, 1.2);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDistribution { .. })
        ));

        let mut config = mfsc_config();
        config.noise_level = Bounds(0.5, 0.1);
        assert!(config.validate().is_err());

        let mut config = mfsc_config();
        config.add_noise_probability = 1.5;
        assert!(config.validate().is_err());

        let mut config = mfsc_config();
        config.max_duration = Duration::milliseconds(10.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidFrame { .. })
        ));

        let mut config = mfsc_config();
        config.sample_freq_hz = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidSampleRate));
    }

    #[test]
    fn test_json_parsing_with_defaults() {
        let json = r#"{
            "max_duration": "2000 milliseconds",
            "feature": { "type": "mfcc", "num_filters": 64, "num_cepstra": 40 },
            "window_type": "hamming",
            "output_type": "float",
            "use_delta": true,
            "noise_level": [0.1, 0.3]
        }"#;
        let config = AudioConfig::from_json(json).unwrap();
        assert_eq!(config.sample_freq_hz, 16_000);
        assert_eq!(config.window_type, WindowKind::Hamming);
        assert_eq!(config.output_type, ElementType::F32);
        assert_eq!(config.noise_level, Bounds(0.1, 0.3));
        assert_eq!(config.time_scale_fraction, Bounds(1.0, 1.0));
        assert_eq!(config.geometry().unwrap().freq_steps, 80);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = mfsc_config();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed = AudioConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let err = AudioConfig::load_from_file("/nonexistent/audio_config.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
