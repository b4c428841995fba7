use ndarray::{Array1, ArrayViewD};

use super::Metric;
use crate::{
    Result,
    scores::{self, ClassRows},
    tensor::Tensor,
};

/// Running counts of correct predictions over contributing label positions.
#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    correct: u64,
    count: u64,
}

impl Tally {
    fn update(
        &mut self,
        y_true: ArrayViewD<i64>,
        y_pred: ArrayViewD<f32>,
        masked_tokens: &[i64],
    ) -> Result<()> {
        let ClassRows { scores, labels } = scores::class_rows(&y_true, &y_pred)?;

        for (row, &label) in scores.rows().into_iter().zip(&labels) {
            if masked_tokens.contains(&label) {
                continue;
            }

            self.count += 1;
            if label >= 0 && scores::argmax(row) == label as usize {
                self.correct += 1;
            }
        }

        Ok(())
    }

    // No contributing positions reports zero instead of NaN.
    fn result(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }

        self.correct as f64 / self.count as f64
    }

    fn state(&self) -> Tensor {
        let raw = Array1::from(vec![self.correct as i64, self.count as i64]);
        Tensor::I64(raw.into_dyn())
    }
}

/// The fraction of positions where the highest scored class is the label.
#[derive(Debug, Default, Clone)]
pub struct SparseCategoricalAccuracy {
    tally: Tally,
}

impl SparseCategoricalAccuracy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Metric for SparseCategoricalAccuracy {
    fn name(&self) -> &'static str {
        "sparse_categorical_accuracy"
    }

    fn update(&mut self, y_true: ArrayViewD<i64>, y_pred: ArrayViewD<f32>) -> Result<()> {
        self.tally.update(y_true, y_pred, &[])
    }

    fn result(&self) -> f64 {
        self.tally.result()
    }

    fn state(&self) -> Tensor {
        self.tally.state()
    }

    fn reset(&mut self) {
        self.tally = Tally::default();
    }
}

/// Categorical accuracy that ignores the positions whose label is a masked token.
#[derive(Debug, Default, Clone)]
pub struct MaskedCategoricalAccuracy {
    masked_tokens: Vec<i64>,
    tally: Tally,
}

impl MaskedCategoricalAccuracy {
    /// Creates a new `MaskedCategoricalAccuracy`.
    ///
    /// # Arguments
    /// * `masked_tokens` - Labels whose positions do not take part in the accuracy.
    ///
    /// # Returns
    /// A new `MaskedCategoricalAccuracy` instance.
    pub fn new(masked_tokens: Vec<i64>) -> Self {
        Self {
            masked_tokens,
            tally: Tally::default(),
        }
    }

    /// Returns the amount of positions that contributed to the accuracy so far.
    pub fn count(&self) -> u64 {
        self.tally.count
    }
}

impl Metric for MaskedCategoricalAccuracy {
    fn name(&self) -> &'static str {
        "accuracy"
    }

    fn update(&mut self, y_true: ArrayViewD<i64>, y_pred: ArrayViewD<f32>) -> Result<()> {
        self.tally.update(y_true, y_pred, &self.masked_tokens)
    }

    fn result(&self) -> f64 {
        self.tally.result()
    }

    fn state(&self) -> Tensor {
        self.tally.state()
    }

    fn reset(&mut self) {
        self.tally = Tally::default();
    }
}
