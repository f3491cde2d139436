use crate::io::raster::RasterReader;
use crate::types::{DateRange, PollutantSpec, PollutionError, PollutionResult, Region, Scene};
use chrono::NaiveDate;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Source of single-band pollutant scenes.
///
/// Implementations return every scene of `spec`'s collection and band that
/// was acquired inside `range` and whose footprint intersects `region`.
/// An empty vector means "no data", not failure.
pub trait SceneCatalog: Send + Sync {
    fn find_scenes(
        &self,
        spec: &PollutantSpec,
        range: &DateRange,
        region: &Region,
    ) -> PollutionResult<Vec<Scene>>;
}

/// Scene archive on local disk.
///
/// Layout: `<root>/<collection id>/<band name>/<file>.tif`, where the
/// collection id keeps its `/` separators as directories and the file name
/// carries the acquisition date as `YYYYMMDD` or `YYYY-MM-DD`.
pub struct LocalSceneCatalog {
    root: PathBuf,
    date_pattern: Regex,
}

impl LocalSceneCatalog {
    pub fn new<P: AsRef<Path>>(root: P) -> PollutionResult<Self> {
        let date_pattern = Regex::new(r"(\d{4})-?(\d{2})-?(\d{2})")
            .map_err(|e| PollutionError::Processing(format!("Regex error: {}", e)))?;

        Ok(Self {
            root: root.as_ref().to_path_buf(),
            date_pattern,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the scenes of one collection band
    pub fn band_dir(&self, spec: &PollutantSpec) -> PathBuf {
        spec.source_collection_id
            .split('/')
            .fold(self.root.clone(), |dir, part| dir.join(part))
            .join(spec.band_name)
    }

    /// First valid calendar date encoded in a scene file name
    pub fn scene_date(&self, file_name: &str) -> Option<NaiveDate> {
        self.date_pattern.captures_iter(file_name).find_map(|captures| {
            let year = captures.get(1)?.as_str().parse().ok()?;
            let month = captures.get(2)?.as_str().parse().ok()?;
            let day = captures.get(3)?.as_str().parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, day)
        })
    }

    /// Scene files in `range`, oldest first
    fn dated_files(&self, spec: &PollutantSpec, range: &DateRange) -> PollutionResult<Vec<(NaiveDate, PathBuf)>> {
        let dir = self.band_dir(spec);
        if !dir.is_dir() {
            log::debug!("No archive directory for {}: {}", spec.code, dir.display());
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            let is_tiff = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"))
                .unwrap_or(false);
            if !is_tiff {
                continue;
            }

            let date = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| self.scene_date(n));

            match date {
                Some(d) if range.contains(d) => files.push((d, path)),
                Some(_) => {}
                None => log::warn!("Skipping scene without a date in its name: {}", path.display()),
            }
        }

        files.sort();
        Ok(files)
    }
}

impl SceneCatalog for LocalSceneCatalog {
    fn find_scenes(
        &self,
        spec: &PollutantSpec,
        range: &DateRange,
        region: &Region,
    ) -> PollutionResult<Vec<Scene>> {
        let mut scenes = Vec::new();

        for (acquired, path) in self.dated_files(spec, range)? {
            let (data, transform) = RasterReader::read_single_band(&path)?;
            let scene = Scene { acquired, data, transform };

            if scene.footprint().intersects(region) {
                scenes.push(scene);
            } else {
                log::debug!("Scene {} does not cover the region", path.display());
            }
        }

        log::debug!("{} {}: {} scene(s) in {}", spec.code, spec.source_collection_id, scenes.len(), range);
        Ok(scenes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GeoTransform, Location, POLLUTANTS};
    use gdal::raster::Buffer;
    use gdal::DriverManager;
    use tempfile::TempDir;

    fn write_scene(path: &Path, transform: GeoTransform, value: f64) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
        let mut dataset = driver.create_with_band_type::<f64, _>(path, 4, 4, 1).unwrap();
        dataset.set_geo_transform(&transform.to_gdal()).unwrap();
        let mut band = dataset.rasterband(1).unwrap();
        band.write((0, 0), (4, 4), &Buffer::new((4, 4), vec![value; 16])).unwrap();
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_scene_date_formats() {
        let catalog = LocalSceneCatalog::new("/tmp").unwrap();
        assert_eq!(catalog.scene_date("S5P_NO2_20240301T051200.tif"), Some(date(2024, 3, 1)));
        assert_eq!(catalog.scene_date("no2_2024-03-05.tif"), Some(date(2024, 3, 5)));
        assert_eq!(catalog.scene_date("no2_20241399.tif"), None);
        assert_eq!(catalog.scene_date("undated.tif"), None);
        // an orbit number ahead of the date is not a date
        assert_eq!(catalog.scene_date("orbit_12345678_20240301.tif"), Some(date(2024, 3, 1)));
        assert_eq!(catalog.scene_date("s5p_99999999_2024-03-07.tif"), Some(date(2024, 3, 7)));
    }

    #[test]
    fn test_band_dir_follows_collection_id() {
        let catalog = LocalSceneCatalog::new("/archive").unwrap();
        assert_eq!(
            catalog.band_dir(&POLLUTANTS[1]),
            PathBuf::from("/archive/COPERNICUS/S5P/OFFL/L3_SO2/SO2_column_number_density")
        );
    }

    #[test]
    fn test_find_scenes_filters_by_date_and_bounds() {
        let root = TempDir::new().unwrap();
        let catalog = LocalSceneCatalog::new(root.path()).unwrap();
        let spec = &POLLUTANTS[0];
        let dir = catalog.band_dir(spec);

        // 4x4 pixels of 0.1 degree over Delhi
        let over_delhi = GeoTransform::from_gdal([77.0, 0.1, 0.0, 28.8, 0.0, -0.1]);
        let elsewhere = GeoTransform::from_gdal([10.0, 0.1, 0.0, 50.0, 0.0, -0.1]);

        write_scene(&dir.join("no2_20240302.tif"), over_delhi, 1.0);
        write_scene(&dir.join("no2_20240305.tif"), over_delhi, 3.0);
        write_scene(&dir.join("no2_20240308.tif"), over_delhi, 9.0); // end is exclusive
        write_scene(&dir.join("no2_20240303.tif"), elsewhere, 5.0);
        std::fs::write(dir.join("README.txt"), "ignored").unwrap();

        let region = Region::around(&Location::new("Delhi", 28.6139, 77.2090), 3500.0).unwrap();
        let range = DateRange::new(date(2024, 3, 1), date(2024, 3, 8)).unwrap();

        let scenes = catalog.find_scenes(spec, &range, &region).unwrap();
        let dates: Vec<_> = scenes.iter().map(|s| s.acquired).collect();
        assert_eq!(dates, vec![date(2024, 3, 2), date(2024, 3, 5)]);
        assert_eq!(scenes[1].data[[0, 0]], 3.0);
    }

    #[test]
    fn test_missing_band_directory_is_empty() {
        let root = TempDir::new().unwrap();
        let catalog = LocalSceneCatalog::new(root.path()).unwrap();
        let region = Region::around(&Location::new("Delhi", 28.6139, 77.2090), 3500.0).unwrap();
        let range = DateRange::new(date(2024, 3, 1), date(2024, 3, 8)).unwrap();

        let scenes = catalog.find_scenes(&POLLUTANTS[3], &range, &region).unwrap();
        assert!(scenes.is_empty());
    }
}
