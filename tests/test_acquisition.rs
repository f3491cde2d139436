use chrono::NaiveDate;
use gdal::raster::Buffer;
use gdal::DriverManager;
use pollusat::io::StaticGazetteer;
use pollusat::types::GeoTransform;
use pollusat::{
    Acquisition, AcquisitionOrchestrator, AcquisitionParams, DateRange, FetchStrategy,
    LocalSceneCatalog, PollutantCode, PollutantSpec, PollutionResult, RasterReader, Region, Scene,
    SceneCatalog, POLLUTANTS,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Wraps a catalog and records which pollutants were queried
struct RecordingCatalog {
    inner: LocalSceneCatalog,
    calls: AtomicUsize,
    queried: Mutex<Vec<PollutantCode>>,
}

impl RecordingCatalog {
    fn new(root: &Path) -> Self {
        Self {
            inner: LocalSceneCatalog::new(root).unwrap(),
            calls: AtomicUsize::new(0),
            queried: Mutex::new(Vec::new()),
        }
    }
}

impl SceneCatalog for RecordingCatalog {
    fn find_scenes(&self, spec: &PollutantSpec, range: &DateRange, region: &Region) -> PollutionResult<Vec<Scene>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queried.lock().unwrap().push(spec.code);
        self.inner.find_scenes(spec, range, region)
    }
}

fn write_band_scene(root: &Path, spec: &PollutantSpec, file: &str, value: f64) {
    let catalog = LocalSceneCatalog::new(root).unwrap();
    let path = catalog.band_dir(spec).join(file);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();

    // 0.5 degree tiles over the Kathmandu valley
    let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
    let mut dataset = driver.create_with_band_type::<f64, _>(&path, 2, 2, 1).unwrap();
    dataset
        .set_geo_transform(&GeoTransform::from_gdal([85.0, 0.5, 0.0, 28.0, 0.0, -0.5]).to_gdal())
        .unwrap();
    let mut band = dataset.rasterband(1).unwrap();
    band.write((0, 0), (2, 2), &Buffer::new((2, 2), vec![value; 4])).unwrap();
}

fn orchestrator(catalog: Arc<RecordingCatalog>, strategy: FetchStrategy) -> AcquisitionOrchestrator {
    AcquisitionOrchestrator::new(
        Arc::new(StaticGazetteer::with_known_locations()),
        catalog,
        AcquisitionParams { strategy, ..AcquisitionParams::default() },
    )
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 20).unwrap()
}

#[test]
fn test_empty_first_pollutant_stops_before_other_queries() {
    let archive = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    for spec in &POLLUTANTS[1..] {
        write_band_scene(archive.path(), spec, "20250115.tif", 1.0);
    }

    let catalog = Arc::new(RecordingCatalog::new(archive.path()));
    let outcome = orchestrator(catalog.clone(), FetchStrategy::Sequential)
        .acquire_on("Kathmandu", dest.path(), today())
        .unwrap();

    assert_eq!(
        outcome.to_string(),
        "No data available for NO2 from 2025-01-13_to_2025-01-20."
    );
    assert_eq!(catalog.calls.load(Ordering::SeqCst), 1);
    assert_eq!(*catalog.queried.lock().unwrap(), vec![PollutantCode::NO2]);
    assert_eq!(std::fs::read_dir(dest.path()).unwrap().count(), 0);
}

#[test]
fn test_one_missing_pollutant_is_all_or_nothing() {
    for strategy in [FetchStrategy::Sequential, FetchStrategy::Concurrent] {
        let archive = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        for spec in POLLUTANTS.iter().filter(|p| p.code != PollutantCode::CO) {
            write_band_scene(archive.path(), spec, "20250118.tif", 1.0);
        }

        let catalog = Arc::new(RecordingCatalog::new(archive.path()));
        let outcome = orchestrator(catalog.clone(), strategy)
            .acquire_on("Kathmandu", dest.path(), today())
            .unwrap();

        match outcome {
            Acquisition::Unavailable { pollutant, range } => {
                assert_eq!(pollutant, PollutantCode::CO);
                assert_eq!(range, DateRange::rolling_window(today(), 7).unwrap());
            }
            other => panic!("expected unavailable, got {:?}", other),
        }
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 4);
        assert_eq!(std::fs::read_dir(dest.path()).unwrap().count(), 0);
    }
}

#[test]
fn test_concurrent_and_sequential_exports_agree() {
    let archive = TempDir::new().unwrap();
    for (i, spec) in POLLUTANTS.iter().enumerate() {
        write_band_scene(archive.path(), spec, "2025-01-14.tif", i as f64);
        write_band_scene(archive.path(), spec, "2025-01-16.tif", i as f64 + 2.0);
    }

    let mut stacks = Vec::new();
    for strategy in [FetchStrategy::Sequential, FetchStrategy::Concurrent] {
        let dest = TempDir::new().unwrap();
        let catalog = Arc::new(RecordingCatalog::new(archive.path()));
        let path = orchestrator(catalog, strategy)
            .acquire_on("Kathmandu", dest.path(), today())
            .unwrap()
            .into_result()
            .unwrap();
        stacks.push(RasterReader::read_bands(&path).unwrap());
    }

    assert_eq!(stacks[0], stacks[1]);
    // mean of the two scenes, channel order preserved
    for (i, channel) in stacks[0].outer_iter().enumerate() {
        assert!(channel.iter().all(|v| *v == i as f64 + 1.0));
    }
}
