use std::{fmt, num::NonZeroUsize, sync::Arc};

use learning::{IterativeProcess, IterativeProcessBuilder};

use crate::training_utils::{ClientDatasetsFn, EvaluateFn, ValidationFn};

/// What every task configurator needs to set up a federated training task.
#[derive(Clone)]
pub struct TaskSpec {
    pub client_batch_size: NonZeroUsize,
    pub client_epochs_per_round: NonZeroUsize,
    pub clients_per_round: NonZeroUsize,
    pub client_datasets_random_seed: Option<u64>,
    pub iterative_process_builder: Arc<dyn IterativeProcessBuilder>,
}

impl fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSpec")
            .field("client_batch_size", &self.client_batch_size)
            .field("client_epochs_per_round", &self.client_epochs_per_round)
            .field("clients_per_round", &self.clients_per_round)
            .field(
                "client_datasets_random_seed",
                &self.client_datasets_random_seed,
            )
            .finish_non_exhaustive()
    }
}

/// Everything a training loop needs to run a configured task.
pub struct RunnerSpec {
    pub iterative_process: Box<dyn IterativeProcess>,
    pub client_datasets_fn: ClientDatasetsFn,
    pub validation_fn: ValidationFn,
    pub test_fn: EvaluateFn,
}
