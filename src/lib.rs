// Audio ETL - Rust feature extraction for dataset loaders
// Decodes audio items, augments them and packs fixed-shape feature buffers

// Module declarations
pub mod config;
pub mod decoded;
pub mod dsp;
pub mod error;
pub mod loader;
pub mod noise;
pub mod params;
pub mod pipeline;
pub mod transform;

// Re-exports for convenience
pub use config::{
    AudioConfig, Bounds, Duration, DurationUnit, ElementType, FeatureKind, FrameGeometry,
    WindowKind,
};
pub use decoded::{decode, DecodedAudio};
pub use error::{ConfigError, ErrorCode, EtlError};
pub use loader::{Loader, OutputElement};
pub use noise::{NoisePool, NoiseSource};
pub use params::{derive_item_seed, AugmentationParams, ParamFactory};
pub use pipeline::{AudioPipeline, ItemReport};
pub use transform::Transformer;
