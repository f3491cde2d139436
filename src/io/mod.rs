//! I/O modules for geocoding, scene catalogs, and GeoTIFF rasters

pub mod catalog;
pub mod geocoder;
pub mod raster;

pub use catalog::{LocalSceneCatalog, SceneCatalog};
pub use geocoder::{geocoder_from_params, Geocoder, NominatimGeocoder, StaticGazetteer};
pub use raster::{GeoTiffWriter, RasterReader, CHANNEL_COUNT};
