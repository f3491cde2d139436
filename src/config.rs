//! Pipeline configuration loaded from TOML.
//!
//! Example:
//! ```toml
//! model_path = "/srv/pollusat/best_model.json"
//!
//! [geocoder]
//! kind = "nominatim"
//! user_agent = "geoapi"
//!
//! [acquisition]
//! catalog_root = "/srv/pollusat/scenes"
//! strategy = "concurrent"
//! ```

use crate::types::{PollutionError, PollutionResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Which gazetteer backs location lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeocoderKind {
    /// OpenStreetMap Nominatim over HTTP
    Nominatim,
    /// Built-in offline city table
    Static,
}

/// Gazetteer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderParams {
    pub kind: GeocoderKind,
    pub endpoint: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for GeocoderParams {
    fn default() -> Self {
        Self {
            kind: GeocoderKind::Nominatim,
            endpoint: "https://nominatim.openstreetmap.org/search".to_string(),
            user_agent: "geoapi".to_string(),
            timeout_secs: 30,
        }
    }
}

/// How the four band queries are issued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStrategy {
    /// One band at a time, stopping at the first band with no scenes
    Sequential,
    /// All bands at once; the all-or-nothing check runs after every query returns
    Concurrent,
}

/// Acquisition parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionParams {
    /// Half-width of the square region in metres
    pub buffer_m: f64,
    /// Export pixel size in metres
    pub scale_m: f64,
    /// Length of the rolling date window ending today
    pub window_days: u32,
    /// Upper bound on exported pixels (width x height x bands)
    pub max_pixels: f64,
    /// Root of the local scene archive
    pub catalog_root: PathBuf,
    pub strategy: FetchStrategy,
}

impl Default for AcquisitionParams {
    fn default() -> Self {
        Self {
            buffer_m: 3500.0,   // 7 km x 7 km region
            scale_m: 875.0,     // ~8x8 pixels over the region
            window_days: 7,
            max_pixels: 1e13,
            catalog_root: PathBuf::from("scenes"),
            strategy: FetchStrategy::Sequential,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pre-trained classifier artifact
    pub model_path: PathBuf,
    pub geocoder: GeocoderParams,
    pub acquisition: AcquisitionParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("best_model.json"),
            geocoder: GeocoderParams::default(),
            acquisition: AcquisitionParams::default(),
        }
    }
}

impl PipelineConfig {
    /// Default config file: `<config_dir>/pollusat/config.toml`
    pub fn default_path() -> PollutionResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("pollusat").join("config.toml"))
            .ok_or_else(|| PollutionError::Config("Could not determine config directory".to_string()))
    }

    /// Load from the default location, falling back to defaults if absent
    pub fn load() -> PollutionResult<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> PollutionResult<Self> {
        log::info!("Reading configuration from: {}", path.as_ref().display());

        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents).map_err(|e| {
            PollutionError::Config(format!("{}: {}", path.as_ref().display(), e))
        })
    }

    pub fn from_toml_str(contents: &str) -> PollutionResult<Self> {
        toml::from_str(contents).map_err(|e| PollutionError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> PollutionResult<String> {
        toml::to_string_pretty(self).map_err(|e| PollutionError::Config(e.to_string()))
    }
}
