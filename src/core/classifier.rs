use crate::types::{Label, NormalizedTensor, PollutionError, PollutionResult, Prediction};
use ndarray::Axis;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Pre-trained model producing one score per label
pub trait Classifier: Send + Sync {
    fn predict(&self, tensor: &NormalizedTensor) -> PollutionResult<Vec<f64>>;
}

/// Dense softmax head over per-channel global average pooling.
///
/// Artifact format (JSON): `{ "weights": [[f64; C]; 5], "bias": [f64; 5] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PooledLinearModel {
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

impl PooledLinearModel {
    pub fn new(weights: Vec<Vec<f64>>, bias: Vec<f64>) -> PollutionResult<Self> {
        let model = Self { weights, bias };
        model.validate()?;
        Ok(model)
    }

    /// Load the artifact once at start-up; any failure is `ClassifierUnavailable`
    pub fn load<P: AsRef<Path>>(path: P) -> PollutionResult<Self> {
        let path = path.as_ref();
        log::info!("Loading classifier from: {}", path.display());

        let contents = std::fs::read_to_string(path)
            .map_err(|e| PollutionError::ClassifierUnavailable(format!("{}: {}", path.display(), e)))?;
        let model: Self = serde_json::from_str(&contents)
            .map_err(|e| PollutionError::ClassifierUnavailable(format!("{}: {}", path.display(), e)))?;

        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> PollutionResult<()> {
        if self.weights.len() != Label::ALL.len() || self.bias.len() != Label::ALL.len() {
            return Err(PollutionError::ClassifierUnavailable(format!(
                "Model must have {} output classes, found {} weight rows and {} biases",
                Label::ALL.len(),
                self.weights.len(),
                self.bias.len()
            )));
        }

        let inputs = self.input_channels();
        if inputs == 0 || self.weights.iter().any(|row| row.len() != inputs) {
            return Err(PollutionError::ClassifierUnavailable(
                "Model weight rows must share a non-zero input width".to_string(),
            ));
        }
        Ok(())
    }

    pub fn input_channels(&self) -> usize {
        self.weights.first().map_or(0, |row| row.len())
    }
}

impl Classifier for PooledLinearModel {
    fn predict(&self, tensor: &NormalizedTensor) -> PollutionResult<Vec<f64>> {
        let (batch, height, width, channels) = tensor.dim();
        if batch != 1 || channels != self.input_channels() || height * width == 0 {
            return Err(PollutionError::InvalidFormat(format!(
                "Model expects (1, H, W, {}), got {:?}",
                self.input_channels(),
                tensor.dim()
            )));
        }

        let pooled = tensor
            .index_axis(Axis(0), 0)
            .mean_axis(Axis(0))
            .and_then(|rows| rows.mean_axis(Axis(0)))
            .ok_or_else(|| PollutionError::Processing("Cannot pool an empty tensor".to_string()))?;

        let logits: Vec<f64> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| b + row.iter().zip(pooled.iter()).map(|(w, x)| w * x).sum::<f64>())
            .collect();

        Ok(softmax(&logits))
    }
}

fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

/// Index of the largest score; the first index wins ties
pub fn argmax(scores: &[f64]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &s)| match best {
            Some((_, b)) if s <= b || s.is_nan() => best,
            _ if s.is_nan() => best,
            _ => Some((i, s)),
        })
        .map(|(i, _)| i)
}

/// Maps model scores to a label
#[derive(Clone)]
pub struct ClassifierAdapter {
    model: Arc<dyn Classifier>,
}

impl ClassifierAdapter {
    pub fn new(model: Arc<dyn Classifier>) -> Self {
        Self { model }
    }

    pub fn classify(&self, tensor: &NormalizedTensor) -> PollutionResult<Label> {
        Ok(self.classify_with_scores(tensor)?.label)
    }

    pub fn classify_with_scores(&self, tensor: &NormalizedTensor) -> PollutionResult<Prediction> {
        let scores = self.model.predict(tensor)?;
        if scores.len() != Label::ALL.len() {
            return Err(PollutionError::Processing(format!(
                "Classifier returned {} scores, expected {}",
                scores.len(),
                Label::ALL.len()
            )));
        }

        let label = argmax(&scores)
            .and_then(Label::from_index)
            .ok_or_else(|| PollutionError::Processing("Classifier returned no finite score".to_string()))?;

        log::info!("Predicted '{}' from scores {:?}", label, scores);
        Ok(Prediction { label, scores })
    }
}
