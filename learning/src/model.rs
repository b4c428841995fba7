use std::{collections::BTreeMap, fmt, sync::Arc};

use log::debug;
use ndarray::ArrayD;

use crate::{
    MlErr, Result,
    arch::{
        Architecture, ModelWeights, Network, NetworkProvider,
        loss::{LossFn, LossSpec},
    },
    metrics::{Metric, MetricSpec},
    tensor::{Batch, DType, ElementSpec, Tensor, TensorSpec},
};

/// Metric results keyed by metric name.
pub type Metrics = BTreeMap<String, f64>;

/// Raw metric states keyed by metric name, what a client reports after local training.
pub type LocalOutputs = BTreeMap<String, Tensor>;

/// The outcome of a single forward pass.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub loss: f32,
    pub predictions: ArrayD<f32>,
    pub num_examples: usize,
}

/// A network bundled with the spec of its input, its loss and its metrics; what an iterative
/// process trains and evaluates.
pub struct LearningModel {
    network: Box<dyn Network>,
    input_spec: ElementSpec,
    loss: Box<dyn LossFn>,
    metrics: Vec<Box<dyn Metric>>,
}

impl LearningModel {
    /// Creates a new `LearningModel`.
    ///
    /// # Arguments
    /// * `network` - The network that makes the predictions.
    /// * `input_spec` - The spec every batch fed to the model must conform to.
    /// * `loss` - The loss function.
    /// * `metrics` - The metrics updated on each forward pass.
    ///
    /// # Returns
    /// A new `LearningModel` instance.
    pub fn from_network(
        network: Box<dyn Network>,
        input_spec: ElementSpec,
        loss: Box<dyn LossFn>,
        metrics: Vec<Box<dyn Metric>>,
    ) -> Self {
        Self {
            network,
            input_spec,
            loss,
            metrics,
        }
    }

    pub fn input_spec(&self) -> &ElementSpec {
        &self.input_spec
    }

    pub fn weights(&self) -> ModelWeights {
        self.network.weights()
    }

    pub fn assign_weights(&mut self, weights: &ModelWeights) -> Result<()> {
        weights.assign_to(self.network.as_mut())
    }

    /// Runs a batch through the network, computing its loss and updating the metrics.
    ///
    /// # Arguments
    /// * `batch` - The batch of examples, must conform to the input spec.
    ///
    /// # Returns
    /// The loss, the predictions and the amount of examples in the batch.
    pub fn forward_pass(&mut self, batch: &Batch) -> Result<BatchOutput> {
        self.input_spec.check(batch)?;

        let y_true = batch.y.as_i64().ok_or_else(|| MlErr::SpecMismatch {
            what: "labels",
            got: batch.y.spec(),
            expected: TensorSpec::new(DType::I64, batch.y.shape().iter().map(|&d| Some(d))),
        })?;

        let predictions = self.network.predict(&batch.x)?;
        let loss = self.loss.loss(y_true.view(), predictions.view())?;

        for metric in &mut self.metrics {
            metric.update(y_true.view(), predictions.view())?;
        }

        let num_examples = batch.num_examples();
        debug!(num_examples = num_examples, loss = loss; "forward pass");

        Ok(BatchOutput {
            loss,
            predictions,
            num_examples,
        })
    }

    /// Returns the raw state of every metric.
    pub fn report_local_outputs(&self) -> LocalOutputs {
        self.metrics
            .iter()
            .map(|metric| (metric.name().to_string(), metric.state()))
            .collect()
    }

    /// Returns the result of every metric.
    pub fn metrics(&self) -> Metrics {
        self.metrics
            .iter()
            .map(|metric| (metric.name().to_string(), metric.result()))
            .collect()
    }

    pub fn reset_metrics(&mut self) {
        for metric in &mut self.metrics {
            metric.reset();
        }
    }
}

/// Everything needed to build fresh `LearningModel`s, called as many times as the process needs.
#[derive(Clone)]
pub struct ModelFactory {
    networks: Arc<dyn NetworkProvider>,
    architecture: Architecture,
    input_spec: ElementSpec,
    loss: LossSpec,
    metrics: Vec<MetricSpec>,
}

impl ModelFactory {
    /// Creates a new `ModelFactory`.
    ///
    /// # Arguments
    /// * `networks` - The provider of untrained networks.
    /// * `architecture` - The architecture every network is built with.
    /// * `input_spec` - The spec of the batches the models are fed.
    /// * `loss` - The loss every model is built with.
    /// * `metrics` - The metrics every model is built with.
    ///
    /// # Returns
    /// A new `ModelFactory` instance.
    pub fn new(
        networks: Arc<dyn NetworkProvider>,
        architecture: Architecture,
        input_spec: ElementSpec,
        loss: LossSpec,
        metrics: Vec<MetricSpec>,
    ) -> Self {
        Self {
            networks,
            architecture,
            input_spec,
            loss,
            metrics,
        }
    }

    /// Builds a new model with an untrained network and fresh metrics.
    pub fn build(&self) -> Result<LearningModel> {
        let network = self.networks.build(&self.architecture)?;
        let metrics = self.metrics.iter().map(MetricSpec::build).collect();

        Ok(LearningModel::from_network(
            network,
            self.input_spec.clone(),
            self.loss.build(),
            metrics,
        ))
    }

    /// Returns a copy of this factory whose models expect a different input spec.
    pub fn with_input_spec(&self, input_spec: ElementSpec) -> Self {
        Self {
            input_spec,
            ..self.clone()
        }
    }

    pub fn architecture(&self) -> &Architecture {
        &self.architecture
    }

    pub fn input_spec(&self) -> &ElementSpec {
        &self.input_spec
    }

    pub fn loss(&self) -> LossSpec {
        self.loss
    }

    pub fn metrics(&self) -> &[MetricSpec] {
        &self.metrics
    }
}

impl fmt::Debug for ModelFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelFactory")
            .field("architecture", &self.architecture)
            .field("input_spec", &self.input_spec)
            .field("loss", &self.loss)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array, Array2, IxDyn, array};

    use super::*;

    /// Scores every class equally except the one it's told to favor.
    struct Favoring {
        num_classes: usize,
        class: usize,
    }

    impl Network for Favoring {
        fn weights(&self) -> ModelWeights {
            ModelWeights::new(vec![array![self.class as f32].into_dyn()], vec![])
        }

        fn assign_weights(&mut self, weights: &ModelWeights) -> Result<()> {
            self.class = weights.trainable[0].iter().next().copied().unwrap_or(0.0) as usize;
            Ok(())
        }

        fn predict(&mut self, x: &Tensor) -> Result<ArrayD<f32>> {
            let mut out = Array2::zeros((x.shape()[0], self.num_classes));
            out.column_mut(self.class).fill(1.0);
            Ok(out.into_dyn())
        }
    }

    struct Provider;

    impl NetworkProvider for Provider {
        fn build(&self, architecture: &Architecture) -> Result<Box<dyn Network>> {
            Ok(Box::new(Favoring {
                num_classes: architecture.num_classes(),
                class: 0,
            }))
        }
    }

    fn factory() -> ModelFactory {
        ModelFactory::new(
            Arc::new(Provider),
            Architecture::TwoHiddenLayer {
                num_classes: 3,
                hidden_units: 4,
            },
            ElementSpec {
                x: TensorSpec::new(DType::F32, [None, Some(2)]),
                y: TensorSpec::new(DType::I64, [None, Some(1)]),
            },
            LossSpec::SparseCategoricalCrossentropy { from_logits: true },
            vec![MetricSpec::SparseCategoricalAccuracy, MetricSpec::NumExamples],
        )
    }

    fn batch() -> Batch {
        Batch::new(
            Array::<f32, _>::zeros(IxDyn(&[4, 2])),
            array![[0i64], [0], [1], [2]].into_dyn(),
        )
    }

    #[test]
    fn forward_pass_updates_every_metric() {
        let mut model = factory().build().unwrap();
        let out = model.forward_pass(&batch()).unwrap();

        assert_eq!(out.num_examples, 4);
        assert_eq!(out.predictions.shape(), [4, 3]);

        let metrics = model.metrics();
        assert_eq!(metrics["sparse_categorical_accuracy"], 0.5);
        assert_eq!(metrics["num_examples"], 4.0);

        let outputs = model.report_local_outputs();
        assert_eq!(outputs["num_examples"].as_i64().unwrap().sum(), 4);
    }

    #[test]
    fn assigned_weights_drive_predictions() {
        let mut model = factory().build().unwrap();
        model
            .assign_weights(&ModelWeights::new(vec![array![2.0f32].into_dyn()], vec![]))
            .unwrap();
        model.forward_pass(&batch()).unwrap();

        assert_eq!(model.metrics()["sparse_categorical_accuracy"], 0.25);
        assert_eq!(model.weights().trainable[0].sum(), 2.0);
    }

    #[test]
    fn batches_outside_the_input_spec_are_rejected() {
        let mut model = factory().build().unwrap();
        let bad = Batch::new(
            Array::<f32, _>::zeros(IxDyn(&[4, 3])),
            Array::<i64, _>::zeros(IxDyn(&[4, 1])),
        );
        assert!(matches!(
            model.forward_pass(&bad),
            Err(MlErr::SpecMismatch { what: "input", .. })
        ));
    }

    #[test]
    fn every_build_yields_fresh_metrics() {
        let factory = factory();
        let mut first = factory.build().unwrap();
        first.forward_pass(&batch()).unwrap();

        let second = factory.build().unwrap();
        assert_eq!(second.metrics()["num_examples"], 0.0);
    }
}
