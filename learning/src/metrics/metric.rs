use ndarray::ArrayViewD;
use serde::{Deserialize, Serialize};

use super::{
    MaskedCategoricalAccuracy, NumBatchesCounter, NumExamplesCounter, NumTokensCounter,
    SparseCategoricalAccuracy,
};
use crate::{Result, tensor::Tensor};

/// A streaming metric, updated batch by batch.
pub trait Metric: Send {
    /// The key the metric is reported under.
    fn name(&self) -> &'static str;

    /// Accumulates a batch of labels and predictions.
    fn update(&mut self, y_true: ArrayViewD<i64>, y_pred: ArrayViewD<f32>) -> Result<()>;

    /// Returns the metric's value over everything accumulated so far.
    fn result(&self) -> f64;

    /// Returns the raw accumulated state, as reported in a client's local outputs.
    fn state(&self) -> Tensor;

    /// Forgets everything accumulated so far.
    fn reset(&mut self);
}

/// Describes a `Metric` to build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricSpec {
    SparseCategoricalAccuracy,
    NumBatches,
    NumExamples,
    NumTokens { masked_tokens: Vec<i64> },
    MaskedCategoricalAccuracy { masked_tokens: Vec<i64> },
}

impl MetricSpec {
    /// Builds a fresh metric following this spec.
    pub fn build(&self) -> Box<dyn Metric> {
        match self {
            MetricSpec::SparseCategoricalAccuracy => Box::new(SparseCategoricalAccuracy::new()),
            MetricSpec::NumBatches => Box::new(NumBatchesCounter::new()),
            MetricSpec::NumExamples => Box::new(NumExamplesCounter::new()),
            MetricSpec::NumTokens { masked_tokens } => {
                Box::new(NumTokensCounter::new(masked_tokens.clone()))
            }
            MetricSpec::MaskedCategoricalAccuracy { masked_tokens } => {
                Box::new(MaskedCategoricalAccuracy::new(masked_tokens.clone()))
            }
        }
    }
}
