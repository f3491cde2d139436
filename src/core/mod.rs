//! Acquisition and inference pipeline stages

pub mod acquisition;
pub mod band_resolver;
pub mod classifier;
pub mod gap_fill;
pub mod normalize;
pub mod pipeline;

// Re-export main types
pub use acquisition::{Acquisition, AcquisitionOrchestrator};
pub use band_resolver::{mean_composite, BandResolver};
pub use classifier::{argmax, Classifier, ClassifierAdapter, PooledLinearModel};
pub use gap_fill::GapFiller;
pub use normalize::{NormalizationStats, Normalizer, TRAINING_BAND_MEANS, TRAINING_BAND_STDS};
pub use pipeline::{preprocess_image, Pipeline};
