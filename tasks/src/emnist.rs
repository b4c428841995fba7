use std::{str::FromStr, sync::Arc};

use datasets::{EmnistDatasets, emnist};
use learning::{
    ModelFactory,
    arch::{Architecture, NetworkProvider, loss::LossSpec},
    metrics::MetricSpec,
};
use log::{debug, info};

use crate::{
    Result, TaskErr,
    specs::{RunnerSpec, TaskSpec},
    training_utils::{ClientDatasetsFn, EvaluateFn, ValidationFn},
};

/// The model flags `configure_training` accepts.
pub const EMNIST_MODELS: &[&str] = &["cnn", "2nn"];

pub const DEFAULT_MODEL: &str = "cnn";

/// Units in each hidden layer of the `2nn` model.
const HIDDEN_UNITS: usize = 200;

/// The models the EMNIST task can be trained with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmnistModel {
    /// Convolutional network with dropout.
    Cnn,
    /// Two hidden dense layers.
    TwoNn,
}

impl EmnistModel {
    /// Returns the architecture of this model over digits and letters.
    pub fn architecture(self) -> Architecture {
        let num_classes = emnist::num_classes(false);
        match self {
            EmnistModel::Cnn => Architecture::ConvDropout { num_classes },
            EmnistModel::TwoNn => Architecture::TwoHiddenLayer {
                num_classes,
                hidden_units: HIDDEN_UNITS,
            },
        }
    }
}

impl FromStr for EmnistModel {
    type Err = TaskErr;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cnn" => Ok(EmnistModel::Cnn),
            "2nn" => Ok(EmnistModel::TwoNn),
            _ => Err(TaskErr::InvalidModel {
                got: s.to_string(),
                expected: EMNIST_MODELS,
            }),
        }
    }
}

/// Configures federated training of an EMNIST character recognition model.
///
/// # Arguments
/// * `task_spec` - The client batching, sampling and iterative process settings.
/// * `model` - The model flag, one of `EMNIST_MODELS`.
/// * `datasets` - The provider of the EMNIST data.
/// * `networks` - Builds the networks for the chosen architecture.
///
/// # Returns
/// The iterative process together with the client sampling, validation and test functions.
///
/// # Errors
/// `TaskErr::InvalidModel` if `model` is not supported, before any dataset is loaded.
pub fn configure_training(
    task_spec: &TaskSpec,
    model: &str,
    datasets: &dyn EmnistDatasets,
    networks: Arc<dyn NetworkProvider>,
) -> Result<RunnerSpec> {
    let model: EmnistModel = model.parse()?;
    let architecture = model.architecture();
    info!("configuring emnist with {architecture:?}");

    let train = datasets.federated_train(
        task_spec.client_batch_size,
        task_spec.client_epochs_per_round,
        false,
    )?;
    let test = datasets.centralized_test(false)?;

    let first = train.client_ids().first().ok_or(TaskErr::NoClients)?;
    let input_spec = train.dataset_for_client(first)?.element_spec().clone();
    debug!(clients = train.client_ids().len(); "emnist input spec {input_spec:?}");

    let model_fn = ModelFactory::new(
        networks,
        architecture,
        input_spec,
        LossSpec::SparseCategoricalCrossentropy { from_logits: false },
        vec![MetricSpec::SparseCategoricalAccuracy],
    );

    let iterative_process = task_spec
        .iterative_process_builder
        .build(model_fn.clone(), None)?;
    info!("built the emnist iterative process");

    let client_datasets_fn = ClientDatasetsFn::new(
        train,
        task_spec.clients_per_round,
        task_spec.client_datasets_random_seed,
    );
    let test_fn = EvaluateFn::new(test, &model_fn);
    let validation_fn = ValidationFn::new(test_fn.clone());

    Ok(RunnerSpec {
        iterative_process,
        client_datasets_fn,
        validation_fn,
        test_fn,
    })
}
