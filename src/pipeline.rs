// Audio pipeline - per-item extract, transform and load
//
// An `AudioPipeline` owns everything built once per dataset: the param
// factory, the transformer with its FFT plan / filterbank / noise pool, and
// the loader. Processing an item only reads that state, so the pipeline can
// be shared by reference across worker threads, each writing into its own
// disjoint slot of the batch buffer.

use std::sync::Arc;

use serde::Serialize;

use crate::config::{AudioConfig, FrameGeometry};
use crate::decoded::{decode, DecodedAudio};
use crate::error::{log_etl_error, EtlError};
use crate::loader::Loader;
use crate::noise::NoiseSource;
use crate::params::{AugmentationParams, ParamFactory};
use crate::transform::Transformer;

/// What happened to one item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemReport {
    pub item_index: u64,
    pub params: AugmentationParams,
    pub valid_frames: usize,
}

pub struct AudioPipeline {
    config: AudioConfig,
    factory: ParamFactory,
    transformer: Transformer,
    loader: Loader,
}

impl AudioPipeline {
    /// Build a pipeline, loading the noise pool named by the config
    pub fn new(config: AudioConfig) -> Result<Self, EtlError> {
        let transformer = Transformer::new(&config)?;
        Self::assemble(config, transformer)
    }

    /// Build a pipeline around an existing noise source
    pub fn with_noise_source(
        config: AudioConfig,
        noise: Arc<dyn NoiseSource>,
    ) -> Result<Self, EtlError> {
        let transformer = Transformer::with_noise_source(&config, noise)?;
        Self::assemble(config, transformer)
    }

    fn assemble(config: AudioConfig, transformer: Transformer) -> Result<Self, EtlError> {
        let factory = ParamFactory::new(&config)?;
        let loader = Loader::new(&config)?;

        tracing::info!(
            "[AudioPipeline] Initialized: {} bytes per item ({:?})",
            loader.output_bytes(),
            config.output_type
        );

        Ok(Self {
            config,
            factory,
            transformer,
            loader,
        })
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    pub fn geometry(&self) -> &FrameGeometry {
        self.transformer.geometry()
    }

    /// Size of one item's destination slot in bytes
    pub fn output_bytes(&self) -> usize {
        self.loader.output_bytes()
    }

    pub fn params(&self, item_index: u64) -> AugmentationParams {
        self.factory.make_params(item_index)
    }

    /// Decode a WAV-encoded item and write its features into `destination`
    pub fn process(
        &self,
        item_index: u64,
        encoded: &[u8],
        destination: &mut [u8],
    ) -> Result<ItemReport, EtlError> {
        let decoded = decode(encoded)?;
        self.process_decoded(item_index, decoded, destination)
    }

    /// Transform an already-decoded item and write it into `destination`
    pub fn process_decoded(
        &self,
        item_index: u64,
        decoded: DecodedAudio,
        destination: &mut [u8],
    ) -> Result<ItemReport, EtlError> {
        if decoded.sample_rate() != 0 && decoded.sample_rate() != self.config.sample_freq_hz {
            tracing::warn!(
                "[AudioPipeline] item {}: sample rate {} Hz differs from configured {} Hz",
                item_index,
                decoded.sample_rate(),
                self.config.sample_freq_hz
            );
        }

        let params = self.factory.make_params(item_index);
        let transformed = self
            .transformer
            .transform(&params, decoded)
            .inspect_err(|err| log_etl_error(err, "transform"))?;
        self.loader
            .load(destination, &transformed)
            .inspect_err(|err| log_etl_error(err, "load"))?;

        Ok(ItemReport {
            item_index,
            params,
            valid_frames: transformed.valid_frames(),
        })
    }
}
