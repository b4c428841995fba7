use ndarray::{ArrayView1, ArrayViewD};

use super::LossFn;
use crate::{
    MlErr, Result,
    scores::{self, ClassRows},
};

const EPSILON: f32 = 1e-7;

/// Cross-entropy between integer labels and predicted class scores.
#[derive(Debug, Default, Clone, Copy)]
pub struct SparseCategoricalCrossentropy {
    from_logits: bool,
}

impl SparseCategoricalCrossentropy {
    /// Creates a new `SparseCategoricalCrossentropy`.
    ///
    /// # Arguments
    /// * `from_logits` - Whether the predictions are raw logits (softmax is applied first) or
    ///   probabilities.
    ///
    /// # Returns
    /// A new `SparseCategoricalCrossentropy` instance.
    pub fn new(from_logits: bool) -> Self {
        Self { from_logits }
    }

    fn probability(&self, row: ArrayView1<f32>, label: usize) -> f32 {
        let p = if self.from_logits {
            let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
            let sum: f32 = row.iter().map(|&v| (v - max).exp()).sum();
            (row[label] - max).exp() / sum
        } else {
            row[label]
        };

        p.clamp(EPSILON, 1.0 - EPSILON)
    }
}

impl LossFn for SparseCategoricalCrossentropy {
    fn loss(&self, y_true: ArrayViewD<i64>, y_pred: ArrayViewD<f32>) -> Result<f32> {
        let ClassRows { scores, labels } = scores::class_rows(&y_true, &y_pred)?;
        let num_classes = scores.ncols();

        if labels.is_empty() {
            return Ok(0.0);
        }

        let mut total = 0.0;
        for (row, &label) in scores.rows().into_iter().zip(&labels) {
            if label < 0 || label as usize >= num_classes {
                return Err(MlErr::LabelOutOfRange { label, num_classes });
            }

            total -= self.probability(row, label as usize).ln();
        }

        Ok(total / labels.len() as f32)
    }
}
