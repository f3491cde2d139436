use crate::config::{AcquisitionParams, FetchStrategy};
use crate::core::band_resolver::BandResolver;
use crate::io::catalog::SceneCatalog;
use crate::io::geocoder::Geocoder;
use crate::io::raster::GeoTiffWriter;
use crate::types::{
    BandRaster, DateRange, MultiBandRaster, PollutantCode, PollutantSpec, PollutionError,
    PollutionResult, Region, POLLUTANTS,
};
use chrono::{NaiveDate, Utc};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Outcome of one acquisition request
#[derive(Debug, Clone, PartialEq)]
pub enum Acquisition {
    /// All bands resolved and the raster was written here
    Exported(PathBuf),
    /// `pollutant` had no scenes in `range`; nothing was written
    Unavailable {
        pollutant: PollutantCode,
        range: DateRange,
    },
}

impl Acquisition {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Acquisition::Exported(path) => Some(path),
            Acquisition::Unavailable { .. } => None,
        }
    }

    /// Treat missing data as `PollutionError::DataUnavailable`
    pub fn into_result(self) -> PollutionResult<PathBuf> {
        match self {
            Acquisition::Exported(path) => Ok(path),
            Acquisition::Unavailable { pollutant, range } => {
                Err(PollutionError::DataUnavailable { pollutant, range })
            }
        }
    }
}

impl std::fmt::Display for Acquisition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Acquisition::Exported(path) => write!(f, "Multi-band image saved to {}", path.display()),
            Acquisition::Unavailable { pollutant, range } => {
                write!(f, "No data available for {} from {}.", pollutant, range)
            }
        }
    }
}

/// Result of querying every pollutant: all bands in order, or the first gap
enum BandSet {
    Complete(Vec<BandRaster>),
    Missing(PollutantCode),
}

/// Location name in, four-band pollutant GeoTIFF out
pub struct AcquisitionOrchestrator {
    geocoder: Arc<dyn Geocoder>,
    resolver: BandResolver,
    writer: GeoTiffWriter,
    params: AcquisitionParams,
    pollutants: Vec<PollutantSpec>,
}

impl AcquisitionOrchestrator {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        catalog: Arc<dyn SceneCatalog>,
        params: AcquisitionParams,
    ) -> Self {
        Self {
            geocoder,
            resolver: BandResolver::new(catalog, params.scale_m),
            writer: GeoTiffWriter::new(params.max_pixels),
            params,
            pollutants: POLLUTANTS.to_vec(),
        }
    }

    pub fn params(&self) -> &AcquisitionParams {
        &self.params
    }

    /// Acquire over the window ending today (UTC)
    pub fn acquire<P: AsRef<Path>>(&self, location_name: &str, dest_dir: P) -> PollutionResult<Acquisition> {
        self.acquire_on(location_name, dest_dir, Utc::now().date_naive())
    }

    /// Acquire over the `window_days` window ending (exclusively) on `today`.
    ///
    /// All-or-nothing: if any pollutant has no scenes, no file is written and
    /// `Acquisition::Unavailable` names the first such pollutant in channel order.
    pub fn acquire_on<P: AsRef<Path>>(
        &self,
        location_name: &str,
        dest_dir: P,
        today: NaiveDate,
    ) -> PollutionResult<Acquisition> {
        let location = self.geocoder.resolve(location_name)?;
        log::info!(
            "Acquiring pollutants for '{}' at ({:.4}, {:.4})",
            location.name, location.latitude, location.longitude
        );

        let region = Region::around(&location, self.params.buffer_m)?;
        let range = DateRange::rolling_window(today, self.params.window_days)?;

        let bands = match self.params.strategy {
            FetchStrategy::Sequential => self.resolve_sequential(&range, &region)?,
            FetchStrategy::Concurrent => self.resolve_concurrent(&range, &region)?,
        };

        let bands = match bands {
            BandSet::Complete(bands) => bands,
            BandSet::Missing(pollutant) => {
                log::warn!("No {} scenes for '{}' in {}; nothing exported", pollutant, location_name, range);
                return Ok(Acquisition::Unavailable { pollutant, range });
            }
        };

        let raster = MultiBandRaster::stack(bands, &self.pollutants)?;
        let path = self.writer.export(&raster, location_name, dest_dir)?;
        log::info!("Multi-band image saved to {}", path.display());

        Ok(Acquisition::Exported(path))
    }

    /// Query bands in channel order, stopping at the first with no data
    fn resolve_sequential(&self, range: &DateRange, region: &Region) -> PollutionResult<BandSet> {
        let mut bands = Vec::with_capacity(self.pollutants.len());
        for spec in &self.pollutants {
            match self.resolver.resolve_band(spec, range, region)? {
                Some(band) => bands.push(band),
                None => return Ok(BandSet::Missing(spec.code)),
            }
        }
        Ok(BandSet::Complete(bands))
    }

    /// Query all bands at once, then apply the same all-or-nothing check
    fn resolve_concurrent(&self, range: &DateRange, region: &Region) -> PollutionResult<BandSet> {
        let results: Vec<PollutionResult<Option<BandRaster>>> = self
            .pollutants
            .par_iter()
            .map(|spec| self.resolver.resolve_band(spec, range, region))
            .collect();

        let mut bands = Vec::with_capacity(results.len());
        for (spec, result) in self.pollutants.iter().zip(results) {
            match result? {
                Some(band) => bands.push(band),
                None => return Ok(BandSet::Missing(spec.code)),
            }
        }
        Ok(BandSet::Complete(bands))
    }
}
