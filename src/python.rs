//! Python bindings for the web front end

use crate::core::{ClassifierAdapter, NormalizationStats, Normalizer, PooledLinearModel};
use crate::types::{guidance_for, PollutionError};
use numpy::{IntoPyArray, PyArray4};
use pyo3::exceptions::{PyFileNotFoundError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use std::sync::Arc;

fn to_py_err(err: PollutionError) -> PyErr {
    match err {
        PollutionError::UnreadableRaster(msg) => PyFileNotFoundError::new_err(msg),
        PollutionError::LocationNotFound(_) | PollutionError::InvalidFormat(_) => {
            PyValueError::new_err(err.to_string())
        }
        other => PyRuntimeError::new_err(other.to_string()),
    }
}

/// Python module definition
#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<PyAirQualityClassifier>()?;
    m.add_function(wrap_pyfunction!(preprocess_image, m)?)?;
    m.add_function(wrap_pyfunction!(label_guidance, m)?)?;
    Ok(())
}

/// Gap-filled, normalized (1, H, W, 4) tensor for a GeoTIFF
#[pyfunction]
fn preprocess_image<'py>(py: Python<'py>, image_path: &str) -> PyResult<&'py PyArray4<f64>> {
    let normalizer = Normalizer::new(NormalizationStats::default());
    let tensor = crate::core::preprocess_image(image_path, &normalizer).map_err(to_py_err)?;
    Ok(tensor.into_pyarray(py))
}

/// Advisory text for a label string
#[pyfunction]
fn label_guidance(label: &str) -> &'static str {
    guidance_for(label)
}

/// Classifier loaded once and reused across requests
#[pyclass(name = "AirQualityClassifier")]
struct PyAirQualityClassifier {
    normalizer: Normalizer,
    adapter: ClassifierAdapter,
}

#[pymethods]
impl PyAirQualityClassifier {
    #[new]
    fn new(model_path: String) -> PyResult<Self> {
        let model = PooledLinearModel::load(&model_path).map_err(to_py_err)?;
        Ok(Self {
            normalizer: Normalizer::new(NormalizationStats::default()),
            adapter: ClassifierAdapter::new(Arc::new(model)),
        })
    }

    fn classify(&self, image_path: &str) -> PyResult<String> {
        let tensor = crate::core::preprocess_image(image_path, &self.normalizer).map_err(to_py_err)?;
        let label = self.adapter.classify(&tensor).map_err(to_py_err)?;
        Ok(label.to_string())
    }

    fn scores(&self, image_path: &str) -> PyResult<Vec<f64>> {
        let tensor = crate::core::preprocess_image(image_path, &self.normalizer).map_err(to_py_err)?;
        let prediction = self.adapter.classify_with_scores(&tensor).map_err(to_py_err)?;
        Ok(prediction.scores)
    }

    fn __repr__(&self) -> String {
        "AirQualityClassifier()".to_string()
    }
}
