use crate::io::catalog::SceneCatalog;
use crate::types::{BandRaster, DateRange, PixelGrid, PollutantSpec, PollutionResult, Region, Scene};
use ndarray::Array2;
use std::sync::Arc;

/// Builds the time-averaged, clipped composite of one pollutant band
pub struct BandResolver {
    catalog: Arc<dyn SceneCatalog>,
    scale_m: f64,
}

impl BandResolver {
    pub fn new(catalog: Arc<dyn SceneCatalog>, scale_m: f64) -> Self {
        Self { catalog, scale_m }
    }

    /// Resolve one band over `range` and `region`.
    ///
    /// Returns `Ok(None)` when the collection has no matching scene.
    pub fn resolve_band(
        &self,
        spec: &PollutantSpec,
        range: &DateRange,
        region: &Region,
    ) -> PollutionResult<Option<BandRaster>> {
        let scenes = self.catalog.find_scenes(spec, range, region)?;
        log::info!("{}: {} matching scene(s) for {}", spec.code, scenes.len(), range);

        if scenes.is_empty() {
            return Ok(None);
        }

        let grid = region.pixel_grid(self.scale_m)?;
        let data = mean_composite(&scenes, &grid);

        Ok(Some(BandRaster {
            code: spec.code,
            region: *region,
            range: *range,
            grid,
            data,
        }))
    }
}

/// Unweighted per-pixel mean of all scenes, sampled on `grid`.
///
/// Each output cell averages the finite values of the source pixels that
/// contain its centre. Cells no scene covers stay NaN.
pub fn mean_composite(scenes: &[Scene], grid: &PixelGrid) -> Array2<f64> {
    Array2::from_shape_fn(grid.shape(), |(row, col)| {
        let (lon, lat) = grid.cell_center(row, col);

        let (sum, count) = scenes
            .iter()
            .filter_map(|scene| scene.sample(lon, lat))
            .filter(|v| v.is_finite())
            .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));

        if count == 0 {
            f64::NAN
        } else {
            sum / count as f64
        }
    })
}
