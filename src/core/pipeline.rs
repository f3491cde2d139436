use crate::config::PipelineConfig;
use crate::core::acquisition::AcquisitionOrchestrator;
use crate::core::classifier::{Classifier, ClassifierAdapter, PooledLinearModel};
use crate::core::gap_fill::GapFiller;
use crate::core::normalize::{NormalizationStats, Normalizer};
use crate::io::catalog::{LocalSceneCatalog, SceneCatalog};
use crate::io::geocoder::{geocoder_from_params, Geocoder};
use crate::io::raster::RasterReader;
use crate::types::{Label, NormalizedTensor, PollutionResult, Prediction};
use chrono::{NaiveDate, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Read, gap-fill and normalize a four-band raster into classifier input
pub fn preprocess_image<P: AsRef<Path>>(path: P, normalizer: &Normalizer) -> PollutionResult<NormalizedTensor> {
    let bands = RasterReader::read_bands(path)?;
    let filled = GapFiller::fill_channels(&bands)?;
    normalizer.normalize(&filled)
}

/// End-to-end driver: image path or location name in, label out.
///
/// Every collaborator is supplied at construction and never changes
/// afterwards, so one instance can serve any number of requests.
pub struct Pipeline {
    normalizer: Normalizer,
    classifier: ClassifierAdapter,
    acquisition: AcquisitionOrchestrator,
}

impl Pipeline {
    pub fn new(
        stats: NormalizationStats,
        classifier: Arc<dyn Classifier>,
        acquisition: AcquisitionOrchestrator,
    ) -> Self {
        Self {
            normalizer: Normalizer::new(stats),
            classifier: ClassifierAdapter::new(classifier),
            acquisition,
        }
    }

    /// Build from configuration, loading the model artifact.
    ///
    /// A model that fails to load is fatal (`ClassifierUnavailable`).
    pub fn from_config(config: &PipelineConfig) -> PollutionResult<Self> {
        let model: Arc<dyn Classifier> = Arc::new(PooledLinearModel::load(&config.model_path)?);
        let geocoder: Arc<dyn Geocoder> = geocoder_from_params(&config.geocoder)?;
        let catalog: Arc<dyn SceneCatalog> =
            Arc::new(LocalSceneCatalog::new(&config.acquisition.catalog_root)?);

        let acquisition = AcquisitionOrchestrator::new(geocoder, catalog, config.acquisition.clone());
        Ok(Self::new(NormalizationStats::default(), model, acquisition))
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn preprocess<P: AsRef<Path>>(&self, image_path: P) -> PollutionResult<NormalizedTensor> {
        preprocess_image(image_path, &self.normalizer)
    }

    pub fn classify_from_path<P: AsRef<Path>>(&self, image_path: P) -> PollutionResult<Label> {
        Ok(self.predict_from_path(image_path)?.label)
    }

    /// Like `classify_from_path`, keeping the class scores
    pub fn predict_from_path<P: AsRef<Path>>(&self, image_path: P) -> PollutionResult<Prediction> {
        let tensor = self.preprocess(image_path)?;
        self.classifier.classify_with_scores(&tensor)
    }

    /// Acquire today's raster for `name` into `dest_dir`, then classify it
    pub fn classify_from_location<P: AsRef<Path>>(
        &self,
        name: &str,
        dest_dir: P,
    ) -> PollutionResult<(Label, PathBuf)> {
        self.classify_from_location_on(name, dest_dir, Utc::now().date_naive())
    }

    /// Same as `classify_from_location` with an explicit end date for the window
    pub fn classify_from_location_on<P: AsRef<Path>>(
        &self,
        name: &str,
        dest_dir: P,
        today: NaiveDate,
    ) -> PollutionResult<(Label, PathBuf)> {
        let path = self.acquisition.acquire_on(name, dest_dir, today)?.into_result()?;
        let label = self.classify_from_path(&path)?;
        Ok((label, path))
    }
}
