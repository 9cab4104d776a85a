// Loader - packs a transformed item into its slot of the batch buffer
//
// The destination layout is fixed: `freq_steps` rows by `time_steps`
// columns, row-major, with frequency descending down the rows and time
// ascending along the columns. Frames past `valid_frames` are zero.
//
// Spectral features are rescaled so the matrix minimum maps to 0 and the
// maximum to 255 before packing. All bands share one scale, including any
// delta / delta-delta bands. Raw samples are never rescaled.

use ndarray::Array2;

use crate::config::{AudioConfig, ElementType};
use crate::decoded::DecodedAudio;
use crate::dsp::Matrix;
use crate::error::{ConfigError, EtlError};

/// Upper end of the normalized range
pub const NORMALIZED_MAX: f32 = 255.0;

/// Element type that can be written into a destination buffer
pub trait OutputElement: bytemuck::Pod {
    /// Convert a feature value, rounding and saturating for integer types
    fn from_f32(value: f32) -> Self;
}

macro_rules! impl_integer_element {
    ($($ty:ty),*) => {
        $(
            impl OutputElement for $ty {
                fn from_f32(value: f32) -> Self {
                    // `as` saturates at the type bounds and maps NaN to 0
                    value.round() as $ty
                }
            }
        )*
    };
}

impl_integer_element!(u8, i8, u16, i16, i32);

impl OutputElement for f32 {
    fn from_f32(value: f32) -> Self {
        value
    }
}

impl OutputElement for f64 {
    fn from_f32(value: f32) -> Self {
        f64::from(value)
    }
}

/// Rescale so the minimum maps to 0 and the maximum to 255
///
/// A constant matrix has no range to stretch and maps entirely to 0.
pub fn normalize_min_max(features: &Matrix) -> Matrix {
    if features.is_empty() {
        return features.clone();
    }

    let (min, max) = features
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    if max > min {
        let scale = NORMALIZED_MAX / (max - min);
        features.mapv(|v| (v - min) * scale)
    } else {
        Array2::zeros(features.dim())
    }
}

pub struct Loader {
    normalize: bool,
    time_steps: usize,
    freq_steps: usize,
    output_type: ElementType,
}

impl Loader {
    pub fn new(config: &AudioConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let geometry = config.geometry()?;

        Ok(Self {
            normalize: !config.feature.is_samples(),
            time_steps: geometry.time_steps,
            freq_steps: geometry.freq_steps,
            output_type: config.output_type,
        })
    }

    /// Elements in one destination slot
    pub fn element_count(&self) -> usize {
        self.time_steps * self.freq_steps
    }

    /// Bytes in one destination slot for the configured element type
    pub fn output_bytes(&self) -> usize {
        self.element_count() * self.output_type.size()
    }

    pub fn output_type(&self) -> ElementType {
        self.output_type
    }

    /// Write `decoded` into an untyped destination slot
    ///
    /// `destination` must hold exactly [`Loader::output_bytes`] bytes; the
    /// element type comes from the config.
    pub fn load(&self, destination: &mut [u8], decoded: &DecodedAudio) -> Result<(), EtlError> {
        if destination.len() != self.output_bytes() {
            return Err(EtlError::BufferSizeMismatch {
                expected: self.output_bytes(),
                actual: destination.len(),
            });
        }

        match self.output_type {
            ElementType::U8 => self.write_bytes::<u8>(destination, decoded),
            ElementType::I8 => self.write_bytes::<i8>(destination, decoded),
            ElementType::U16 => self.write_bytes::<u16>(destination, decoded),
            ElementType::I16 => self.write_bytes::<i16>(destination, decoded),
            ElementType::I32 => self.write_bytes::<i32>(destination, decoded),
            ElementType::F32 => self.write_bytes::<f32>(destination, decoded),
            ElementType::F64 => self.write_bytes::<f64>(destination, decoded),
        }
    }

    /// Write `decoded` into a typed destination slot of
    /// [`Loader::element_count`] elements
    pub fn load_into<T: OutputElement>(
        &self,
        destination: &mut [T],
        decoded: &DecodedAudio,
    ) -> Result<(), EtlError> {
        if destination.len() != self.element_count() {
            return Err(EtlError::BufferSizeMismatch {
                expected: self.element_count(),
                actual: destination.len(),
            });
        }

        let packed = self.pack::<T>(decoded)?;
        for (slot, value) in destination.iter_mut().zip(packed.iter()) {
            *slot = *value;
        }
        Ok(())
    }

    fn write_bytes<T: OutputElement>(
        &self,
        destination: &mut [u8],
        decoded: &DecodedAudio,
    ) -> Result<(), EtlError> {
        let packed = self.pack::<T>(decoded)?;
        let size = std::mem::size_of::<T>();

        for (chunk, value) in destination.chunks_exact_mut(size).zip(packed.iter()) {
            chunk.copy_from_slice(bytemuck::bytes_of(value));
        }
        Ok(())
    }

    /// Normalize, pad and lay out the item as `freq_steps × time_steps`
    fn pack<T: OutputElement>(&self, decoded: &DecodedAudio) -> Result<Array2<T>, EtlError> {
        let valid_frames = decoded.valid_frames();
        let features = decoded.freq_data();

        if valid_frames > self.time_steps || valid_frames > features.nrows() {
            return Err(EtlError::ShapeMismatch {
                reason: format!(
                    "{} valid frames exceed the {} available rows (time_steps {})",
                    valid_frames,
                    features.nrows(),
                    self.time_steps
                ),
            });
        }
        if valid_frames > 0 && features.ncols() != self.freq_steps {
            return Err(EtlError::ShapeMismatch {
                reason: format!(
                    "feature width {} does not match freq_steps {}",
                    features.ncols(),
                    self.freq_steps
                ),
            });
        }

        let scaled;
        let features = if self.normalize {
            scaled = normalize_min_max(features);
            &scaled
        } else {
            features
        };

        // time_steps × freq_steps, zero past the valid frames
        let mut padded = Array2::<T>::from_elem((self.time_steps, self.freq_steps), T::zeroed());
        for (t, row) in features.rows().into_iter().take(valid_frames).enumerate() {
            for (f, &value) in row.iter().enumerate() {
                padded[[t, f]] = T::from_f32(value);
            }
        }

        // Transpose to freq × time, then flip so the highest band comes first
        let last = self.freq_steps.saturating_sub(1);
        Ok(Array2::from_shape_fn(
            (self.freq_steps, self.time_steps),
            |(f, t)| padded[[t, last - f]],
        ))
    }
}
