use chrono::{Duration, NaiveDate};
use ndarray::{Array2, Array3, Array4};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Single-channel pollutant concentration grid (row x col)
pub type PollutantGrid = Array2<f64>;

/// Channel-first band stack (band x row x col)
pub type BandStack = Array3<f64>;

/// Batch-shaped classifier input (1 x row x col x band)
pub type NormalizedTensor = Array4<f64>;

/// Degrees of latitude per metre (1 degree ≈ 111.32 km)
pub const DEGREES_PER_METER: f64 = 1.0 / 111_320.0;

/// Geographic EPSG code used for every exported raster
pub const EXPORT_EPSG: u32 = 4326;

/// A named place resolved by the gazetteer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }
}

/// Axis-aligned geographic rectangle in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Region {
    /// Square region centred on `location`, `buffer_m` metres to each side
    pub fn around(location: &Location, buffer_m: f64) -> PollutionResult<Self> {
        if buffer_m <= 0.0 || !buffer_m.is_finite() {
            return Err(PollutionError::Config(format!(
                "Region buffer must be a positive distance, got {} m",
                buffer_m
            )));
        }

        let buffer_deg = buffer_m * DEGREES_PER_METER;
        Ok(Self {
            min_lon: location.longitude - buffer_deg,
            min_lat: location.latitude - buffer_deg,
            max_lon: location.longitude + buffer_deg,
            max_lat: location.latitude + buffer_deg,
        })
    }

    pub fn width_deg(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height_deg(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn intersects(&self, other: &Region) -> bool {
        self.min_lon < other.max_lon
            && other.min_lon < self.max_lon
            && self.min_lat < other.max_lat
            && other.min_lat < self.max_lat
    }

    /// Export grid covering this region at roughly `scale_m` metres per pixel
    pub fn pixel_grid(&self, scale_m: f64) -> PollutionResult<PixelGrid> {
        if scale_m <= 0.0 || !scale_m.is_finite() {
            return Err(PollutionError::Config(format!(
                "Export scale must be a positive distance, got {} m",
                scale_m
            )));
        }

        let pixel_deg = scale_m * DEGREES_PER_METER;
        let width = ((self.width_deg() / pixel_deg).round() as usize).max(1);
        let height = ((self.height_deg() / pixel_deg).round() as usize).max(1);

        Ok(PixelGrid {
            width,
            height,
            transform: GeoTransform {
                top_left_x: self.min_lon,
                pixel_width: self.width_deg() / width as f64,
                rotation_x: 0.0,
                top_left_y: self.max_lat,
                rotation_y: 0.0,
                pixel_height: -self.height_deg() / height as f64,
            },
        })
    }
}

/// Geospatial transformation parameters (GDAL ordering)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.top_left_x,
            self.pixel_width,
            self.rotation_x,
            self.top_left_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }

    /// Row/column of the pixel containing (lon, lat) in a `width` x `height` raster.
    /// Rotated transforms are not supported and never match.
    pub fn pixel_at(&self, lon: f64, lat: f64, width: usize, height: usize) -> Option<(usize, usize)> {
        if self.rotation_x != 0.0 || self.rotation_y != 0.0 {
            return None;
        }
        if self.pixel_width == 0.0 || self.pixel_height == 0.0 {
            return None;
        }

        let col = ((lon - self.top_left_x) / self.pixel_width).floor();
        let row = ((lat - self.top_left_y) / self.pixel_height).floor();

        if col < 0.0 || row < 0.0 || col >= width as f64 || row >= height as f64 {
            return None;
        }
        Some((row as usize, col as usize))
    }

    /// Geographic extent of a `width` x `height` raster using this transform
    pub fn footprint(&self, width: usize, height: usize) -> Region {
        let x0 = self.top_left_x;
        let x1 = self.top_left_x + width as f64 * self.pixel_width;
        let y0 = self.top_left_y;
        let y1 = self.top_left_y + height as f64 * self.pixel_height;

        Region {
            min_lon: x0.min(x1),
            min_lat: y0.min(y1),
            max_lon: x0.max(x1),
            max_lat: y0.max(y1),
        }
    }
}

/// Output pixel grid shared by every band of an export
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelGrid {
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
}

impl PixelGrid {
    /// Geographic centre (lon, lat) of a grid cell
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        let t = &self.transform;
        (
            t.top_left_x + (col as f64 + 0.5) * t.pixel_width,
            t.top_left_y + (row as f64 + 0.5) * t.pixel_height,
        )
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }
}

/// Half-open date interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> PollutionResult<Self> {
        if start >= end {
            return Err(PollutionError::Config(format!(
                "Date range must be non-empty: {} is not before {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// `days`-long window ending (exclusively) on `today`
    pub fn rolling_window(today: NaiveDate, days: u32) -> PollutionResult<Self> {
        Self::new(today - Duration::days(i64::from(days)), today)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}_to_{}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

/// Sentinel-5P pollutants used as classifier channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PollutantCode {
    NO2,
    SO2,
    O3,
    CO,
}

impl std::fmt::Display for PollutantCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollutantCode::NO2 => write!(f, "NO2"),
            PollutantCode::SO2 => write!(f, "SO2"),
            PollutantCode::O3 => write!(f, "O3"),
            PollutantCode::CO => write!(f, "CO"),
        }
    }
}

/// Source collection and band for one pollutant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollutantSpec {
    pub code: PollutantCode,
    pub source_collection_id: &'static str,
    pub band_name: &'static str,
}

/// Channel order of every acquired raster and of the classifier input
pub const POLLUTANTS: [PollutantSpec; 4] = [
    PollutantSpec {
        code: PollutantCode::NO2,
        source_collection_id: "COPERNICUS/S5P/NRTI/L3_NO2",
        band_name: "tropospheric_NO2_column_number_density",
    },
    PollutantSpec {
        code: PollutantCode::SO2,
        source_collection_id: "COPERNICUS/S5P/OFFL/L3_SO2",
        band_name: "SO2_column_number_density",
    },
    PollutantSpec {
        code: PollutantCode::O3,
        source_collection_id: "COPERNICUS/S5P/NRTI/L3_O3",
        band_name: "O3_column_number_density",
    },
    PollutantSpec {
        code: PollutantCode::CO,
        source_collection_id: "COPERNICUS/S5P/NRTI/L3_CO",
        band_name: "CO_column_number_density",
    },
];

/// One catalogued acquisition of a single band
#[derive(Debug, Clone)]
pub struct Scene {
    pub acquired: NaiveDate,
    pub data: PollutantGrid,
    pub transform: GeoTransform,
}

impl Scene {
    pub fn footprint(&self) -> Region {
        let (height, width) = self.data.dim();
        self.transform.footprint(width, height)
    }

    /// Value of the source pixel containing (lon, lat), if any
    pub fn sample(&self, lon: f64, lat: f64) -> Option<f64> {
        let (height, width) = self.data.dim();
        self.transform
            .pixel_at(lon, lat, width, height)
            .map(|(row, col)| self.data[[row, col]])
    }
}

/// Time-averaged, clipped composite of one pollutant
#[derive(Debug, Clone)]
pub struct BandRaster {
    pub code: PollutantCode,
    pub region: Region,
    pub range: DateRange,
    pub grid: PixelGrid,
    pub data: PollutantGrid,
}

/// Fixed-order stack of band composites sharing one grid
#[derive(Debug, Clone)]
pub struct MultiBandRaster {
    pub region: Region,
    pub range: DateRange,
    pub grid: PixelGrid,
    pub bands: Vec<BandRaster>,
}

impl MultiBandRaster {
    /// Stack bands, checking they follow `order` and share region and grid
    pub fn stack(bands: Vec<BandRaster>, order: &[PollutantSpec]) -> PollutionResult<Self> {
        if bands.len() != order.len() {
            return Err(PollutionError::Processing(format!(
                "Expected {} bands, got {}",
                order.len(),
                bands.len()
            )));
        }

        let first = bands
            .first()
            .ok_or_else(|| PollutionError::Processing("Cannot stack zero bands".to_string()))?;
        for (band, spec) in bands.iter().zip(order) {
            if band.code != spec.code {
                return Err(PollutionError::Processing(format!(
                    "Band {} found where {} was expected",
                    band.code, spec.code
                )));
            }
            if band.grid != first.grid || band.region != first.region {
                return Err(PollutionError::Processing(format!(
                    "Band {} does not share the grid of band {}",
                    band.code, first.code
                )));
            }
            if band.data.dim() != first.grid.shape() {
                return Err(PollutionError::Processing(format!(
                    "Band {} has shape {:?}, grid is {:?}",
                    band.code,
                    band.data.dim(),
                    first.grid.shape()
                )));
            }
        }

        Ok(Self {
            region: first.region,
            range: first.range,
            grid: first.grid,
            bands,
        })
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }
}

/// Ordinal air-quality category predicted by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    Good,
    Moderate,
    Unhealthy,
    UnhealthySensitive,
    VeryUnhealthy,
}

const NO_GUIDANCE: &str = "No information available for this label.";

impl Label {
    /// Classifier output order
    pub const ALL: [Label; 5] = [
        Label::Good,
        Label::Moderate,
        Label::Unhealthy,
        Label::UnhealthySensitive,
        Label::VeryUnhealthy,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Good => "Good",
            Label::Moderate => "Moderate",
            Label::Unhealthy => "Unhealthy",
            Label::UnhealthySensitive => "Unhealthy (Sensitive)",
            Label::VeryUnhealthy => "Very Unhealthy",
        }
    }

    /// Advisory sentence shown alongside the label
    pub fn guidance(&self) -> &'static str {
        match self {
            Label::Good => "Air quality is considered satisfactory, and air pollution poses little or no risk.",
            Label::Moderate => "Air quality is acceptable; however, some pollutants may be a concern for people who are highly sensitive to air pollution.",
            Label::Unhealthy => "Health alert: everyone may experience health effects. Sensitive groups may experience more serious effects.",
            Label::UnhealthySensitive => "Health warning for sensitive groups. Everyone else should stay alert.",
            Label::VeryUnhealthy => "Health emergency. The entire population is likely to be affected.",
        }
    }
}

/// Guidance keyed by the exact label string, with a generic fallback
pub fn guidance_for(label: &str) -> &'static str {
    label
        .parse::<Label>()
        .map(|l| l.guidance())
        .unwrap_or(NO_GUIDANCE)
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = PollutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Label::ALL
            .iter()
            .find(|l| l.as_str() == s)
            .copied()
            .ok_or_else(|| PollutionError::InvalidFormat(format!("Unknown label: {}", s)))
    }
}

/// Label together with the raw class scores it was chosen from
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: Label,
    pub scores: Vec<f64>,
}

/// Error types for acquisition and classification
#[derive(Debug, thiserror::Error)]
pub enum PollutionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("Location '{0}' not found.")]
    LocationNotFound(String),

    #[error("Geocoding error: {0}")]
    Geocoding(String),

    #[error("No data available for {pollutant} from {range}.")]
    DataUnavailable {
        pollutant: PollutantCode,
        range: DateRange,
    },

    #[error("Unreadable raster: {0}")]
    UnreadableRaster(String),

    #[error("Classifier unavailable: {0}")]
    ClassifierUnavailable(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for acquisition and classification
pub type PollutionResult<T> = Result<T, PollutionError>;
