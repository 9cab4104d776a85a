// Per-item augmentation parameters
//
// Every dataset item gets its own `AugmentationParams`, drawn from the
// distributions in the `AudioConfig`. Randomness is never shared between
// items: each item's generator is seeded from `(global seed, item index)`,
// so an item's parameters do not depend on which worker handles it or in
// what order items are processed.

use rand::distributions::{Bernoulli, Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::AudioConfig;
use crate::error::ConfigError;

/// Augmentation settings for a single item
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AugmentationParams {
    pub add_noise: bool,
    pub noise_index: u32,
    /// Gain applied to the noise segment
    pub noise_level: f32,
    /// Start position within the noise clip, in [0, 1]
    pub noise_offset_fraction: f32,
    /// Time-axis scale factor; 1.0 leaves the frame count unchanged
    pub time_scale_fraction: f32,
}

impl Default for AugmentationParams {
    /// Parameters that leave an item unaugmented
    fn default() -> Self {
        Self {
            add_noise: false,
            noise_index: 0,
            noise_level: 0.0,
            noise_offset_fraction: 0.0,
            time_scale_fraction: 1.0,
        }
    }
}

/// SplitMix64 finalizer
fn mix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Seed for one item's generator, derived from the global seed and index
pub fn derive_item_seed(global_seed: u64, item_index: u64) -> u64 {
    mix64(mix64(global_seed) ^ item_index)
}

/// Draws [`AugmentationParams`] from the configured distributions
#[derive(Debug, Clone)]
pub struct ParamFactory {
    seed: u64,
    add_noise: Bernoulli,
    noise_index: Uniform<u32>,
    noise_level: Uniform<f32>,
    noise_offset_fraction: Uniform<f32>,
    time_scale_fraction: Uniform<f32>,
}

impl ParamFactory {
    pub fn new(config: &AudioConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let add_noise = Bernoulli::new(config.add_noise_probability).map_err(|err| {
            ConfigError::InvalidDistribution {
                field: "add_noise_probability".to_string(),
                reason: err.to_string(),
            }
        })?;

        Ok(Self {
            seed: config.seed,
            add_noise,
            noise_index: Uniform::new_inclusive(config.noise_index.low(), config.noise_index.high()),
            noise_level: Uniform::new_inclusive(config.noise_level.low(), config.noise_level.high()),
            noise_offset_fraction: Uniform::new_inclusive(
                config.noise_offset_fraction.low(),
                config.noise_offset_fraction.high(),
            ),
            time_scale_fraction: Uniform::new_inclusive(
                config.time_scale_fraction.low(),
                config.time_scale_fraction.high(),
            ),
        })
    }

    /// Generator dedicated to `item_index`
    pub fn item_rng(&self, item_index: u64) -> StdRng {
        StdRng::seed_from_u64(derive_item_seed(self.seed, item_index))
    }

    /// Parameters for `item_index`; identical for every call with the same
    /// seed and index
    pub fn make_params(&self, item_index: u64) -> AugmentationParams {
        let params = self.make_params_with(&mut self.item_rng(item_index));
        tracing::debug!("[ParamFactory] item {} -> {:?}", item_index, params);
        params
    }

    /// Draw parameters from an explicit random-state handle
    ///
    /// Fields are drawn in declaration order, so a given generator state
    /// always yields the same record.
    pub fn make_params_with<R: Rng + ?Sized>(&self, rng: &mut R) -> AugmentationParams {
        AugmentationParams {
            add_noise: self.add_noise.sample(rng),
            noise_index: self.noise_index.sample(rng),
            noise_level: self.noise_level.sample(rng),
            noise_offset_fraction: self.noise_offset_fraction.sample(rng),
            time_scale_fraction: self.time_scale_fraction.sample(rng),
        }
    }
}
