use crate::types::{BandStack, NormalizedTensor, PollutionError, PollutionResult};
use ndarray::{Axis, Zip};

/// Global per-channel statistics of the training set, in NO2, SO2, O3, CO order
pub const TRAINING_BAND_MEANS: [f64; 4] = [0.00015076, 0.00021958, 0.13130338, 0.03614379];
pub const TRAINING_BAND_STDS: [f64; 4] = [0.00021598, 0.00033735, 0.01487704, 0.0088344];

/// Frozen standardisation constants, one entry per channel
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationStats {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl Default for NormalizationStats {
    fn default() -> Self {
        Self {
            means: TRAINING_BAND_MEANS.to_vec(),
            stds: TRAINING_BAND_STDS.to_vec(),
        }
    }
}

impl NormalizationStats {
    pub fn new(means: Vec<f64>, stds: Vec<f64>) -> PollutionResult<Self> {
        if means.len() != stds.len() || means.is_empty() {
            return Err(PollutionError::Config(format!(
                "Need one mean and one std per channel, got {} and {}",
                means.len(),
                stds.len()
            )));
        }
        Ok(Self { means, stds })
    }

    pub fn channel_count(&self) -> usize {
        self.means.len()
    }

    pub fn mean(&self, channel: usize) -> Option<f64> {
        self.means.get(channel).copied()
    }

    pub fn std(&self, channel: usize) -> Option<f64> {
        self.stds.get(channel).copied()
    }
}

/// Standardises a band stack into the classifier's input layout
pub struct Normalizer {
    stats: NormalizationStats,
}

impl Normalizer {
    pub fn new(stats: NormalizationStats) -> Self {
        Self { stats }
    }

    pub fn stats(&self) -> &NormalizationStats {
        &self.stats
    }

    /// (C, H, W) stack → (1, H, W, C) tensor of `(x - mean) / std`.
    ///
    /// Any value that is not finite afterwards (NaN input, zero std) becomes 0.
    pub fn normalize(&self, stack: &BandStack) -> PollutionResult<NormalizedTensor> {
        let channels = stack.len_of(Axis(0));
        if channels != self.stats.channel_count() {
            return Err(PollutionError::InvalidFormat(format!(
                "Expected {} channels, got {}",
                self.stats.channel_count(),
                channels
            )));
        }

        let mut scaled = stack.to_owned();
        let stats = self.stats.means.iter().zip(&self.stats.stds);
        for (mut channel, (&mean, &std)) in scaled.axis_iter_mut(Axis(0)).zip(stats) {
            channel.mapv_inplace(|x| (x - mean) / std);
        }

        let mut non_finite = 0usize;
        Zip::from(&mut scaled).for_each(|x| {
            if !x.is_finite() {
                *x = 0.0;
                non_finite += 1;
            }
        });
        if non_finite > 0 {
            log::debug!("Zeroed {} non-finite values after normalization", non_finite);
        }

        // channel-first to channel-last, then a leading batch axis
        let channels_last = scaled.permuted_axes([1, 2, 0]);
        Ok(channels_last.as_standard_layout().into_owned().insert_axis(Axis(0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array3;

    #[test]
    fn test_training_constants() {
        let stats = NormalizationStats::default();
        assert_eq!(stats.channel_count(), 4);
        assert_eq!(stats.mean(0), Some(0.00015076));
        assert_eq!(stats.mean(3), Some(0.03614379));
        assert_eq!(stats.std(1), Some(0.00033735));
        assert_eq!(stats.std(2), Some(0.01487704));
        assert_eq!(stats.mean(4), None);
        assert_eq!(stats.std(4), None);
    }

    #[test]
    fn test_channel_at_its_mean_normalizes_to_zero() {
        let mut stack = Array3::<f64>::zeros((4, 3, 5));
        for (i, mut ch) in stack.axis_iter_mut(Axis(0)).enumerate() {
            ch.fill(TRAINING_BAND_MEANS[i]);
        }

        let tensor = Normalizer::new(NormalizationStats::default()).normalize(&stack).unwrap();
        assert_eq!(tensor.dim(), (1, 3, 5, 4));
        for v in tensor.iter() {
            assert_abs_diff_eq!(*v, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_layout_is_channel_last() {
        let mut stack = Array3::<f64>::zeros((4, 2, 3));
        stack[[2, 1, 0]] = TRAINING_BAND_MEANS[2] + 2.0 * TRAINING_BAND_STDS[2];

        let tensor = Normalizer::new(NormalizationStats::default()).normalize(&stack).unwrap();
        assert_abs_diff_eq!(tensor[[0, 1, 0, 2]], 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(
            tensor[[0, 0, 0, 0]],
            -TRAINING_BAND_MEANS[0] / TRAINING_BAND_STDS[0],
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_non_finite_values_become_zero() {
        let stats = NormalizationStats::new(vec![0.0, 1.0], vec![1.0, 0.0]).unwrap();
        let mut stack = Array3::<f64>::ones((2, 2, 2));
        stack[[0, 0, 0]] = f64::NAN;

        let tensor = Normalizer::new(stats).normalize(&stack).unwrap();
        assert!(tensor.iter().all(|v| v.is_finite()));
        assert_eq!(tensor[[0, 0, 0, 0]], 0.0);
        // zero std: (1 - 1) / 0 is NaN
        assert_eq!(tensor[[0, 1, 1, 1]], 0.0);
        assert_eq!(tensor[[0, 1, 1, 0]], 1.0);
    }

    #[test]
    fn test_channel_count_mismatch() {
        let stack = Array3::<f64>::zeros((3, 2, 2));
        let result = Normalizer::new(NormalizationStats::default()).normalize(&stack);
        assert!(matches!(result, Err(PollutionError::InvalidFormat(_))));
    }
}
