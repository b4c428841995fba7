use std::{num::NonZeroUsize, sync::Arc};

use datasets::{
    ShakespeareDatasets,
    shakespeare::{CHAR_VOCAB, special_tokens, vocab_size},
};
use learning::{
    DType, LocalOutputs, MlErr, ModelFactory, TensorSpec,
    arch::{Architecture, NetworkProvider, loss::LossSpec},
    metrics::MetricSpec,
};
use log::{debug, info};

use crate::{
    Result,
    specs::{RunnerSpec, TaskSpec},
    training_utils::{ClientDatasetsFn, EvaluateFn, ValidationFn},
};

pub const DEFAULT_SEQUENCE_LENGTH: NonZeroUsize = NonZeroUsize::new(80).unwrap();

/// Size of the character embeddings.
pub const EMBEDDING_DIM: usize = 8;

/// Units in each LSTM layer.
pub const LSTM_UNITS: usize = 256;

/// The local output every client's update is weighted by.
const NUM_TOKENS: &str = "num_tokens";

/// Returns the metrics of the Shakespeare model, padding excluded from the token based ones.
pub fn metrics_builder() -> Vec<MetricSpec> {
    let pad = special_tokens(CHAR_VOCAB).pad;
    vec![
        MetricSpec::NumBatches,
        MetricSpec::NumExamples,
        MetricSpec::NumTokens {
            masked_tokens: vec![pad],
        },
        MetricSpec::MaskedCategoricalAccuracy {
            masked_tokens: vec![pad],
        },
    ]
}

/// Weighs a client's update by the amount of non padding tokens it trained on.
///
/// # Arguments
/// * `local_outputs` - The client's local outputs, must hold a single integer `num_tokens`.
///
/// # Returns
/// The token count as `f32`.
pub fn client_weight_fn(local_outputs: &LocalOutputs) -> learning::Result<f32> {
    let num_tokens = local_outputs
        .get(NUM_TOKENS)
        .ok_or(MlErr::MissingLocalOutput { name: NUM_TOKENS })?;

    let mismatch = || MlErr::SpecMismatch {
        what: NUM_TOKENS,
        got: num_tokens.spec(),
        expected: TensorSpec::new(DType::I64, [Some(1)]),
    };

    let values = num_tokens.as_i64().ok_or_else(mismatch)?;
    if values.len() != 1 {
        return Err(mismatch());
    }

    Ok(values.sum() as f32)
}

/// Configures federated training of a next character prediction model over Shakespeare lines.
///
/// # Arguments
/// * `task_spec` - The client batching, sampling and iterative process settings.
/// * `sequence_length` - The length of the character sequences the model reads.
/// * `datasets` - The provider of the Shakespeare data.
/// * `networks` - Builds the recurrent networks.
///
/// # Returns
/// The iterative process together with the client sampling, validation and test functions.
pub fn configure_training(
    task_spec: &TaskSpec,
    sequence_length: NonZeroUsize,
    datasets: &dyn ShakespeareDatasets,
    networks: Arc<dyn NetworkProvider>,
) -> Result<RunnerSpec> {
    let train = datasets.federated_train(
        task_spec.client_batch_size,
        task_spec.client_epochs_per_round,
        sequence_length,
    )?;
    let test = datasets.centralized_test(sequence_length)?;

    let architecture = Architecture::Recurrent {
        vocab_size: vocab_size(CHAR_VOCAB),
        sequence_length: sequence_length.get(),
        embedding_dim: EMBEDDING_DIM,
        lstm_units: LSTM_UNITS,
    };
    info!("configuring shakespeare with {architecture:?}");

    let input_spec = train.element_spec().clone();
    debug!(clients = train.client_ids().len(); "shakespeare input spec {input_spec:?}");

    let model_fn = ModelFactory::new(
        networks,
        architecture,
        input_spec,
        LossSpec::SparseCategoricalCrossentropy { from_logits: true },
        metrics_builder(),
    );

    let iterative_process = task_spec
        .iterative_process_builder
        .build(model_fn.clone(), Some(client_weight_fn))?;
    info!("built the shakespeare iterative process");

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
