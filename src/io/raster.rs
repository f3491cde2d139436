use crate::types::{
    BandStack, GeoTransform, MultiBandRaster, PollutantGrid, PollutionError, PollutionResult,
    EXPORT_EPSG,
};
use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager, Metadata};
use ndarray::{Array2, Array3};
use std::path::{Path, PathBuf};

/// Number of pollutant channels the classifier consumes
pub const CHANNEL_COUNT: usize = 4;

/// Multi-band pollutant raster reader
pub struct RasterReader;

impl RasterReader {
    /// Read channels 1-4 as a (4, H, W) stack.
    ///
    /// Pixels equal to a band's declared no-data value come back as NaN.
    /// Channel identity is positional; the file must already be in
    /// NO2, SO2, O3, CO order.
    pub fn read_bands<P: AsRef<Path>>(path: P) -> PollutionResult<BandStack> {
        let path = path.as_ref();
        log::info!("Reading pollutant raster: {}", path.display());

        if !path.exists() {
            return Err(PollutionError::UnreadableRaster(format!(
                "{} does not exist",
                path.display()
            )));
        }

        let dataset = Dataset::open(path)
            .map_err(|e| PollutionError::UnreadableRaster(format!("{}: {}", path.display(), e)))?;

        let band_count = dataset.raster_count() as usize;
        if band_count < CHANNEL_COUNT {
            return Err(PollutionError::UnreadableRaster(format!(
                "{} has {} band(s), {} required",
                path.display(),
                band_count,
                CHANNEL_COUNT
            )));
        }

        let (width, height) = dataset.raster_size();
        log::debug!("Raster size: {}x{} with {} bands", width, height, band_count);

        let mut flat = Vec::with_capacity(CHANNEL_COUNT * width * height);
        for index in 1..=CHANNEL_COUNT {
            let band = dataset.rasterband(index as isize)
                .map_err(|e| PollutionError::UnreadableRaster(format!("band {}: {}", index, e)))?;
            let buffer = band.read_as::<f64>((0, 0), (width, height), (width, height), None)
                .map_err(|e| PollutionError::UnreadableRaster(format!("band {}: {}", index, e)))?;

            match band.no_data_value() {
                Some(no_data) if !no_data.is_nan() => {
                    flat.extend(buffer.data.into_iter().map(|v| if v == no_data { f64::NAN } else { v }));
                }
                _ => flat.extend(buffer.data),
            }
        }

        Array3::from_shape_vec((CHANNEL_COUNT, height, width), flat)
            .map_err(|e| PollutionError::UnreadableRaster(format!("Failed to reshape band data: {}", e)))
    }

    /// Read band 1 of a single-band scene file together with its transform
    pub fn read_single_band<P: AsRef<Path>>(path: P) -> PollutionResult<(PollutantGrid, GeoTransform)> {
        let dataset = Dataset::open(path.as_ref())?;
        let geo_transform = GeoTransform::from_gdal(dataset.geo_transform()?);
        let (width, height) = dataset.raster_size();

        let band = dataset.rasterband(1)?;
        let buffer = band.read_as::<f64>((0, 0), (width, height), (width, height), None)?;
        let no_data = band.no_data_value().filter(|v| !v.is_nan());

        let data: Vec<f64> = match no_data {
            Some(nd) => buffer.data.into_iter().map(|v| if v == nd { f64::NAN } else { v }).collect(),
            None => buffer.data,
        };

        let grid = Array2::from_shape_vec((height, width), data)
            .map_err(|e| PollutionError::Processing(format!("Failed to reshape scene data: {}", e)))?;

        Ok((grid, geo_transform))
    }
}

/// GeoTIFF export for acquired rasters
pub struct GeoTiffWriter {
    max_pixels: f64,
}

impl GeoTiffWriter {
    pub fn new(max_pixels: f64) -> Self {
        Self { max_pixels }
    }

    /// `Pollutants_{location}_{start}_to_{end}.tif`.
    ///
    /// Spaces and path separators in the location become underscores, so the
    /// name is always a single component inside the destination directory.
    pub fn file_name(location_name: &str, raster: &MultiBandRaster) -> String {
        let location: String = location_name
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '/' | '\\' => '_',
                other => other,
            })
            .collect();
        format!("Pollutants_{}_{}.tif", location, raster.range)
    }

    /// Write `raster` into `dest_dir` and return the final path.
    ///
    /// The file is built under a temporary name in `dest_dir` and only
    /// renamed into place once every band is written.
    pub fn export<P: AsRef<Path>>(
        &self,
        raster: &MultiBandRaster,
        location_name: &str,
        dest_dir: P,
    ) -> PollutionResult<PathBuf> {
        let dest_dir = dest_dir.as_ref();
        let (height, width) = raster.grid.shape();
        let pixel_count = (width * height * raster.band_count()) as f64;

        if pixel_count > self.max_pixels {
            return Err(PollutionError::Processing(format!(
                "Export of {} pixels exceeds the limit of {}",
                pixel_count, self.max_pixels
            )));
        }

        std::fs::create_dir_all(dest_dir)?;
        let output_path = dest_dir.join(Self::file_name(location_name, raster));
        log::info!("Exporting {}-band raster to: {}", raster.band_count(), output_path.display());

        let temp_path = tempfile::Builder::new()
            .prefix(".pollusat-")
            .suffix(".tif")
            .tempfile_in(dest_dir)?
            .into_temp_path();

        self.write_geotiff(raster, &temp_path)?;

        temp_path
            .persist(&output_path)
            .map_err(|e| PollutionError::Io(e.error))?;

        Ok(output_path)
    }

    /// Write every band as Float64 with NaN no-data in EPSG:4326
    pub fn write_geotiff<P: AsRef<Path>>(&self, raster: &MultiBandRaster, path: P) -> PollutionResult<()> {
        let driver = DriverManager::get_driver_by_name("GTiff")?;
        let (height, width) = raster.grid.shape();

        let mut dataset = driver.create_with_band_type::<f64, _>(
            path.as_ref(),
            width as isize,
            height as isize,
            raster.band_count() as isize,
        )?;

        dataset.set_geo_transform(&raster.grid.transform.to_gdal())?;
        dataset.set_spatial_ref(&SpatialRef::from_epsg(EXPORT_EPSG)?)?;
        dataset.set_metadata_item("DATE_RANGE", &raster.range.to_string(), "")?;

        for (i, band) in raster.bands.iter().enumerate() {
            let mut rasterband = dataset.rasterband(i as isize + 1)?;
            let flat_data: Vec<f64> = band.data.iter().cloned().collect();
            let buffer = Buffer::new((width, height), flat_data);
            rasterband.write((0, 0), (width, height), &buffer)?;
            rasterband.set_no_data_value(Some(f64::NAN))?;
            rasterband.set_metadata_item("POLLUTANT", &band.code.to_string(), "")?;
        }

        log::debug!("GeoTIFF written: {}", path.as_ref().display());
        Ok(())
    }
}
