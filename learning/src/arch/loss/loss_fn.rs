use ndarray::ArrayViewD;
use serde::{Deserialize, Serialize};

use super::SparseCategoricalCrossentropy;
use crate::Result;

pub trait LossFn: Send {
    /// Computes the loss of a batch of predictions.
    ///
    /// # Arguments
    /// * `y_true` - The integer labels.
    /// * `y_pred` - The predicted scores, classes on the last axis.
    ///
    /// # Returns
    /// The mean loss over every label position.
    fn loss(&self, y_true: ArrayViewD<i64>, y_pred: ArrayViewD<f32>) -> Result<f32>;
}

/// Describes a `LossFn` to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossSpec {
    SparseCategoricalCrossentropy { from_logits: bool },
}

impl LossSpec {
    /// Builds a fresh loss function following this spec.
    pub fn build(&self) -> Box<dyn LossFn> {
        match *self {
            LossSpec::SparseCategoricalCrossentropy { from_logits } => {
                Box::new(SparseCategoricalCrossentropy::new(from_logits))
            }
        }
    }
}
