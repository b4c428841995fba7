use std::{fmt, num::NonZeroUsize, sync::Arc};

use learning::{ClientData, Dataset, Metrics, ModelFactory, arch::ModelWeights};
use log::{debug, info};
use rand::{SeedableRng, rngs::StdRng, seq::index};

use crate::{Result, TaskErr};

/// Samples the clients taking part in each round and materializes their datasets.
#[derive(Clone)]
pub struct ClientDatasetsFn {
    data: Arc<dyn ClientData>,
    clients_per_round: NonZeroUsize,
    random_seed: Option<u64>,
}

impl ClientDatasetsFn {
    /// Creates a new `ClientDatasetsFn`.
    ///
    /// # Arguments
    /// * `data` - The federated training data.
    /// * `clients_per_round` - The amount of distinct clients sampled each round.
    /// * `random_seed` - Makes every round's sample reproducible, `None` samples from OS
    ///   randomness.
    ///
    /// # Returns
    /// A new `ClientDatasetsFn` instance.
    pub fn new(
        data: Arc<dyn ClientData>,
        clients_per_round: NonZeroUsize,
        random_seed: Option<u64>,
    ) -> Self {
        Self {
            data,
            clients_per_round,
            random_seed,
        }
    }

    /// Samples the ids of the clients taking part in a round, without replacement.
    ///
    /// # Arguments
    /// * `round_num` - The round, mixed into the seed so rounds differ from each other.
    ///
    /// # Returns
    /// The sampled ids or an error if there are fewer clients than asked for.
    pub fn sample_client_ids(&self, round_num: u64) -> Result<Vec<String>> {
        let ids = self.data.client_ids();
        let requested = self.clients_per_round.get();
        if requested > ids.len() {
            return Err(TaskErr::NotEnoughClients {
                requested,
                available: ids.len(),
            });
        }

        let mut rng = match self.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(round_num)),
            None => StdRng::from_os_rng(),
        };

        let sampled = index::sample(&mut rng, ids.len(), requested)
            .iter()
            .map(|i| ids[i].clone())
            .collect();

        debug!(round_num = round_num; "sampled clients {sampled:?}");
        Ok(sampled)
    }

    /// Returns the datasets of the clients sampled for a round.
    pub fn call(&self, round_num: u64) -> Result<Vec<Dataset>> {
        self.sample_client_ids(round_num)?
            .iter()
            .map(|id| Ok(self.data.dataset_for_client(id)?))
            .collect()
    }
}

impl fmt::Debug for ClientDatasetsFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientDatasetsFn")
            .field("clients", &self.data.client_ids().len())
            .field("clients_per_round", &self.clients_per_round)
            .field("random_seed", &self.random_seed)
            .finish()
    }
}

/// Evaluates model weights on a centralized dataset.
#[derive(Debug, Clone)]
pub struct EvaluateFn {
    eval_dataset: Arc<Dataset>,
    model_fn: ModelFactory,
}

impl EvaluateFn {
    /// Creates a new `EvaluateFn`.
    ///
    /// # Arguments
    /// * `eval_dataset` - The dataset the weights are evaluated on.
    /// * `model_fn` - Builds the model the weights are loaded into; its input spec is replaced
    ///   by the evaluation dataset's.
    ///
    /// # Returns
    /// A new `EvaluateFn` instance.
    pub fn new(eval_dataset: Dataset, model_fn: &ModelFactory) -> Self {
        let model_fn = model_fn.with_input_spec(eval_dataset.element_spec().clone());
        Self {
            eval_dataset: Arc::new(eval_dataset),
            model_fn,
        }
    }

    /// Evaluates the given weights.
    ///
    /// # Arguments
    /// * `model_weights` - The weights to evaluate.
    ///
    /// # Returns
    /// The mean `loss` over every example together with every metric of the model.
    pub fn call(&self, model_weights: &ModelWeights) -> Result<Metrics> {
        let mut model = self.model_fn.build()?;
        model.assign_weights(model_weights)?;

        info!(num_params = model_weights.num_params(); "evaluating the current model");
        let mut loss_sum = 0.0;
        let mut num_examples = 0;
        for batch in self.eval_dataset.batches() {
            let output = model.forward_pass(batch)?;
            loss_sum += f64::from(output.loss) * output.num_examples as f64;
            num_examples += output.num_examples;
        }

        let loss = if num_examples == 0 {
            0.0
        } else {
            loss_sum / num_examples as f64
        };

        let mut metrics = model.metrics();
        metrics.insert("loss".to_string(), loss);
        Ok(metrics)
    }

    pub fn eval_dataset(&self) -> &Dataset {
        &self.eval_dataset
    }
}

/// Validation during training, the same evaluation as the test one regardless of the round.
#[derive(Debug, Clone)]
pub struct ValidationFn {
    test_fn: EvaluateFn,
}

impl ValidationFn {
    pub fn new(test_fn: EvaluateFn) -> Self {
        Self { test_fn }
    }

    /// Evaluates the given weights, `_round_num` does not take part.
    pub fn call(&self, model_weights: &ModelWeights, _round_num: u64) -> Result<Metrics> {
        self.test_fn.call(model_weights)
    }
}

#[cfg(test)]
mod tests {
    use learning::{
        Batch, DType, ElementSpec, Tensor, TensorSpec,
        arch::{Architecture, Network, NetworkProvider, loss::LossSpec},
        metrics::MetricSpec,
    };
    use ndarray::{Array, Array2, ArrayD, IxDyn};

    use super::*;

    /// Gives every example the same probabilities: three quarters for class 0.
    struct Constant;

    impl Network for Constant {
        fn weights(&self) -> ModelWeights {
            ModelWeights::default()
        }

        fn assign_weights(&mut self, _weights: &ModelWeights) -> learning::Result<()> {
            Ok(())
        }

        fn predict(&mut self, x: &Tensor) -> learning::Result<ArrayD<f32>> {
            let mut out = Array2::from_elem((x.shape()[0], 2), 0.25f32);
            out.column_mut(0).fill(0.75);
            Ok(out.into_dyn())
        }
    }

    struct ConstantProvider;

    impl NetworkProvider for ConstantProvider {
        fn build(&self, _architecture: &Architecture) -> learning::Result<Box<dyn Network>> {
            Ok(Box::new(Constant))
        }
    }

    fn spec() -> ElementSpec {
        ElementSpec {
            x: TensorSpec::new(DType::F32, [None, Some(1)]),
            y: TensorSpec::new(DType::I64, [None, Some(1)]),
        }
    }

    fn model_fn() -> ModelFactory {
        ModelFactory::new(
            Arc::new(ConstantProvider),
            Architecture::TwoHiddenLayer {
                num_classes: 2,
                hidden_units: 1,
            },
            spec(),
            LossSpec::SparseCategoricalCrossentropy { from_logits: false },
            vec![MetricSpec::SparseCategoricalAccuracy],
        )
    }

    fn batch(labels: Vec<i64>) -> Batch {
        let n = labels.len();
        Batch::new(
            Array::<f32, _>::zeros(IxDyn(&[n, 1])),
            Array::from_shape_vec(IxDyn(&[n, 1]), labels).unwrap(),
        )
    }

    #[test]
    fn loss_is_weighted_by_the_examples_of_each_batch() {
        let full: Vec<i64> = (0..500).map(|i| i % 2).collect();
        let dataset = Dataset::new(spec(), vec![batch(full), batch(vec![1])]).unwrap();
        let metrics = EvaluateFn::new(dataset, &model_fn())
            .call(&ModelWeights::default())
            .unwrap();

        // 250 examples at -ln(0.75) and 251 at -ln(0.25)
        let expected = (250.0 * -(0.75f64.ln()) + 251.0 * -(0.25f64.ln())) / 501.0;
        let unweighted = ((-(0.75f64.ln()) - 0.25f64.ln()) / 2.0 - 0.25f64.ln()) / 2.0;

        assert!((metrics["loss"] - expected).abs() < 1e-5);
        assert!((metrics["loss"] - unweighted).abs() > 1e-2);
        assert!((metrics["sparse_categorical_accuracy"] - 250.0 / 501.0).abs() < 1e-9);
    }

    #[test]
    fn empty_evaluation_set_reports_zero() {
        let dataset = Dataset::new(spec(), vec![]).unwrap();
        let test_fn = EvaluateFn::new(dataset, &model_fn());
        let metrics = test_fn.call(&ModelWeights::default()).unwrap();

        assert_eq!(metrics["loss"], 0.0);
        assert_eq!(metrics["sparse_categorical_accuracy"], 0.0);
        assert_eq!(
            ValidationFn::new(test_fn).call(&ModelWeights::default(), 5).unwrap(),
            metrics
        );
    }
}
