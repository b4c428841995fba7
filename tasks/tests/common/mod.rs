#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    num::NonZeroUsize,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use datasets::{
    EmnistDatasets, EmnistExample, LeafEmnist, LeafShakespeare, RawClientData,
    ShakespeareDatasets, ShakespeareExample, emnist::NUM_PIXELS,
};
use learning::{
    ClientData, ClientWeightFn, Dataset, IterativeProcess, IterativeProcessBuilder, Metrics,
    ModelFactory, Result, ServerState, Tensor,
    arch::{Architecture, ModelWeights, Network, NetworkProvider},
};
use ndarray::{Array, ArrayD, Axis, IxDyn, array};
use tasks::TaskSpec;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn nz(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

/// Scores the class stored in its single weight higher than every other class.
pub struct FavoringNetwork {
    num_classes: usize,
    class: usize,
}

impl Network for FavoringNetwork {
    fn weights(&self) -> ModelWeights {
        ModelWeights::new(vec![array![self.class as f32].into_dyn()], vec![])
    }

    fn assign_weights(&mut self, weights: &ModelWeights) -> Result<()> {
        self.class = weights.trainable[0].iter().next().copied().unwrap_or(0.0) as usize;
        Ok(())
    }

    fn predict(&mut self, x: &Tensor) -> Result<ArrayD<f32>> {
        // images score once per example, token sequences once per position
        let mut shape = match x {
            Tensor::F32(_) => vec![x.shape()[0]],
            Tensor::I64(_) => x.shape().to_vec(),
        };
        shape.push(self.num_classes);

        let last = Axis(shape.len() - 1);
        let mut out = Array::zeros(IxDyn(&shape));
        out.index_axis_mut(last, self.class).fill(1.0);
        Ok(out)
    }
}

/// Builds favoring networks and records every architecture it is asked for.
#[derive(Default)]
pub struct RecordingProvider {
    pub built: Mutex<Vec<Architecture>>,
}

impl RecordingProvider {
    pub fn built(&self) -> Vec<Architecture> {
        self.built.lock().unwrap().clone()
    }
}

impl NetworkProvider for RecordingProvider {
    fn build(&self, architecture: &Architecture) -> Result<Box<dyn Network>> {
        self.built.lock().unwrap().push(*architecture);
        Ok(Box::new(FavoringNetwork {
            num_classes: architecture.num_classes(),
            class: 0,
        }))
    }
}

/// What a `RecordingBuilder` was built with.
#[derive(Debug, Clone)]
pub struct BuildCall {
    pub model_fn: ModelFactory,
    pub client_weight_fn: Option<ClientWeightFn>,
}

/// Records every build call and hands out `SummingProcess`es.
#[derive(Default)]
pub struct RecordingBuilder {
    pub calls: Mutex<Vec<BuildCall>>,
}

impl RecordingBuilder {
    pub fn calls(&self) -> Vec<BuildCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl IterativeProcessBuilder for RecordingBuilder {
    fn build(
        &self,
        model_fn: ModelFactory,
        client_weight_fn: Option<ClientWeightFn>,
    ) -> Result<Box<dyn IterativeProcess>> {
        self.calls.lock().unwrap().push(BuildCall {
            model_fn: model_fn.clone(),
            client_weight_fn,
        });
        Ok(Box::new(SummingProcess {
            model_fn,
            client_weight_fn,
        }))
    }
}

/// Runs every client's data through the model without training and reports the summed client
/// weights.
pub struct SummingProcess {
    model_fn: ModelFactory,
    client_weight_fn: Option<ClientWeightFn>,
}

impl IterativeProcess for SummingProcess {
    fn initialize(&self) -> Result<ServerState> {
        Ok(ServerState {
            model: self.model_fn.build()?.weights(),
            round_num: 0,
        })
    }

    fn next(
        &mut self,
        state: ServerState,
        client_datasets: &[Dataset],
    ) -> Result<(ServerState, Metrics)> {
        let mut model = self.model_fn.build()?;
        model.assign_weights(&state.model)?;

        let mut total_weight = 0.0;
        for dataset in client_datasets {
            // each client reports only its own outputs
            model.reset_metrics();
            for batch in dataset.batches() {
                model.forward_pass(batch)?;
            }

            total_weight += match self.client_weight_fn {
                Some(weight_fn) => weight_fn(&model.report_local_outputs())?,
                None => dataset.num_examples() as f32,
            };
        }

        let metrics = Metrics::from([
            ("clients".to_string(), client_datasets.len() as f64),
            ("total_weight".to_string(), f64::from(total_weight)),
        ]);
        let state = ServerState {
            round_num: state.round_num + 1,
            ..state
        };
        Ok((state, metrics))
    }
}

pub fn task_spec(builder: Arc<RecordingBuilder>, seed: Option<u64>) -> TaskSpec {
    TaskSpec {
        client_batch_size: nz(2),
        client_epochs_per_round: nz(1),
        clients_per_round: nz(2),
        client_datasets_random_seed: seed,
        iterative_process_builder: builder,
    }
}

pub fn favoring(class: usize) -> ModelWeights {
    ModelWeights::new(vec![array![class as f32].into_dyn()], vec![])
}

/// Delegates to real datasets and counts every call it serves.
pub struct CountingDatasets<D> {
    inner: D,
    pub calls: AtomicUsize,
}

impl<D> CountingDatasets<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<D: EmnistDatasets> EmnistDatasets for CountingDatasets<D> {
    fn federated_train(
        &self,
        batch_size: NonZeroUsize,
        epochs: NonZeroUsize,
        only_digits: bool,
    ) -> datasets::Result<Arc<dyn ClientData>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.federated_train(batch_size, epochs, only_digits)
    }

    fn centralized_test(&self, only_digits: bool) -> datasets::Result<Dataset> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.centralized_test(only_digits)
    }
}

impl<D: ShakespeareDatasets> ShakespeareDatasets for CountingDatasets<D> {
    fn federated_train(
        &self,
        batch_size: NonZeroUsize,
        epochs: NonZeroUsize,
        sequence_length: NonZeroUsize,
    ) -> datasets::Result<Arc<dyn ClientData>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner
            .federated_train(batch_size, epochs, sequence_length)
    }

    fn centralized_test(&self, sequence_length: NonZeroUsize) -> datasets::Result<Dataset> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.centralized_test(sequence_length)
    }
}

/// EMNIST clients `f0..f{num_clients}`, the i-th holding `i + 1` examples labelled `i`.
pub fn emnist(num_clients: usize) -> CountingDatasets<LeafEmnist> {
    let clients = |labels: std::ops::Range<i64>| {
        let clients = labels
            .map(|label| {
                let examples: Vec<EmnistExample> = (0..=label)
                    .map(|_| EmnistExample {
                        pixels: vec![0.5; NUM_PIXELS],
                        label,
                    })
                    .collect();
                (format!("f{label}"), examples)
            })
            .collect::<BTreeMap<_, _>>();
        RawClientData::new(clients)
    };

    let emnist =
        LeafEmnist::new(clients(0..num_clients as i64), clients(0..3)).with_shuffle_seed(0);
    CountingDatasets::new(emnist)
}

fn speakers(lines: Vec<(&str, Vec<&str>)>) -> RawClientData<ShakespeareExample> {
    RawClientData::new(
        lines
            .into_iter()
            .map(|(speaker, lines)| {
                let lines: Vec<ShakespeareExample> =
                    lines.into_iter().map(ShakespeareExample::new).collect();
                (speaker.to_string(), lines)
            })
            .collect(),
    )
}

/// Shakespeare characters, each speaking a few short lines.
pub fn shakespeare() -> CountingDatasets<LeafShakespeare> {
    let train = speakers(vec![
        ("HAMLET", vec!["To be, or not to be", "that is the question"]),
        ("OPHELIA", vec!["Good my lord"]),
        ("POLONIUS", vec!["Though this be madness", "yet there is method in't"]),
    ]);
    let test = speakers(vec![(
        "HORATIO",
        vec!["So have I heard and do in part believe it"],
    )]);

    CountingDatasets::new(LeafShakespeare::new(train, test).with_shuffle_seed(0))
}
