//! pollusat: Sentinel-5P pollutant acquisition and air-quality classification
//!
//! Resolves a place name to a 7 km square region, composites the last week of
//! NO2, SO2, O3 and CO observations into a four-band GeoTIFF, and classifies
//! that raster (or any uploaded one) into one of five air-quality labels.

pub mod config;
pub mod core;
pub mod io;
pub mod types;

#[cfg(feature = "python")]
mod python;

// Re-export main types and functions for easier access
pub use crate::config::{AcquisitionParams, FetchStrategy, GeocoderKind, GeocoderParams, PipelineConfig};
pub use crate::core::{
    Acquisition, AcquisitionOrchestrator, BandResolver, Classifier, ClassifierAdapter, GapFiller,
    NormalizationStats, Normalizer, Pipeline, PooledLinearModel,
};
pub use crate::io::{GeoTiffWriter, Geocoder, LocalSceneCatalog, RasterReader, SceneCatalog};
pub use crate::types::{
    guidance_for, BandRaster, DateRange, Label, Location, MultiBandRaster, NormalizedTensor,
    PollutantCode, PollutantSpec, PollutionError, PollutionResult, Prediction, Region, Scene,
    POLLUTANTS,
};
