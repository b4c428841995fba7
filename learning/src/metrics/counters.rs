use ndarray::{ArrayD, ArrayViewD, IxDyn};

use super::Metric;
use crate::{Result, tensor::Tensor};

fn count_tensor(count: u64) -> Tensor {
    Tensor::I64(ArrayD::from_elem(IxDyn(&[1]), count as i64))
}

/// Counts the batches seen.
#[derive(Debug, Default, Clone)]
pub struct NumBatchesCounter {
    count: u64,
}

impl NumBatchesCounter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Metric for NumBatchesCounter {
    fn name(&self) -> &'static str {
        "num_batches"
    }

    fn update(&mut self, _y_true: ArrayViewD<i64>, _y_pred: ArrayViewD<f32>) -> Result<()> {
        self.count += 1;
        Ok(())
    }

    fn result(&self) -> f64 {
        self.count as f64
    }

    fn state(&self) -> Tensor {
        count_tensor(self.count)
    }

    fn reset(&mut self) {
        self.count = 0;
    }
}

/// Counts the examples seen, that is, the size of the leading dimension of every batch.
#[derive(Debug, Default, Clone)]
pub struct NumExamplesCounter {
    count: u64,
}

impl NumExamplesCounter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Metric for NumExamplesCounter {
    fn name(&self) -> &'static str {
        "num_examples"
    }

    fn update(&mut self, y_true: ArrayViewD<i64>, _y_pred: ArrayViewD<f32>) -> Result<()> {
        self.count += y_true.shape().first().copied().unwrap_or(0) as u64;
        Ok(())
    }

    fn result(&self) -> f64 {
        self.count as f64
    }

    fn state(&self) -> Tensor {
        count_tensor(self.count)
    }

    fn reset(&mut self) {
        self.count = 0;
    }
}

/// Counts the label tokens seen, skipping the masked ones.
#[derive(Debug, Default, Clone)]
pub struct NumTokensCounter {
    masked_tokens: Vec<i64>,
    count: u64,
}

impl NumTokensCounter {
    /// Creates a new `NumTokensCounter`.
    ///
    /// # Arguments
    /// * `masked_tokens` - The tokens that are not counted (e.g. padding).
    ///
    /// # Returns
    /// A new `NumTokensCounter` instance.
    pub fn new(masked_tokens: Vec<i64>) -> Self {
        Self {
            masked_tokens,
            count: 0,
        }
    }
}

impl Metric for NumTokensCounter {
    fn name(&self) -> &'static str {
        "num_tokens"
    }

    fn update(&mut self, y_true: ArrayViewD<i64>, _y_pred: ArrayViewD<f32>) -> Result<()> {
        self.count += y_true
            .iter()
            .filter(|&token| !self.masked_tokens.contains(token))
            .count() as u64;
        Ok(())
    }

    fn result(&self) -> f64 {
        self.count as f64
    }

    fn state(&self) -> Tensor {
        count_tensor(self.count)
    }

    fn reset(&mut self) {
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array, array};

    use super::*;

    #[test]
    fn counters_track_batches_examples_and_unmasked_tokens() {
        let y_true = array![[5i64, 3, 0, 0], [7, 0, 0, 0]].into_dyn();
        let y_pred = Array::<f32, _>::zeros(IxDyn(&[2, 4, 9]));

        let mut batches = NumBatchesCounter::new();
        let mut examples = NumExamplesCounter::new();
        let mut tokens = NumTokensCounter::new(vec![0]);

        for _ in 0..2 {
            batches.update(y_true.view(), y_pred.view()).unwrap();
            examples.update(y_true.view(), y_pred.view()).unwrap();
            tokens.update(y_true.view(), y_pred.view()).unwrap();
        }

        assert_eq!(batches.result(), 2.0);
        assert_eq!(examples.result(), 4.0);
        assert_eq!(tokens.result(), 6.0);
    }

    #[test]
    fn counter_state_is_a_single_integer() {
        let mut tokens = NumTokensCounter::new(vec![0]);
        tokens
            .update(
                array![[1i64, 2, 3]].into_dyn().view(),
                Array::<f32, _>::zeros(IxDyn(&[1, 3, 4])).view(),
            )
            .unwrap();

        assert_eq!(
            tokens.state(),
            Tensor::I64(ArrayD::from_elem(IxDyn(&[1]), 3))
        );

        tokens.reset();
        assert_eq!(tokens.result(), 0.0);
    }
}
