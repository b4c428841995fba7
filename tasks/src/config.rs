use std::{io::Read, num::NonZeroUsize, sync::Arc};

use datasets::{EmnistDatasets, ShakespeareDatasets};
use learning::{IterativeProcessBuilder, arch::NetworkProvider};
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    Result, TaskErr, emnist, shakespeare,
    specs::{RunnerSpec, TaskSpec},
};

/// The task an experiment trains on, with its task specific settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskConfig {
    Emnist {
        #[serde(default = "default_model")]
        model: String,
    },
    Shakespeare {
        #[serde(default = "default_sequence_length")]
        sequence_length: NonZeroUsize,
    },
}

impl TaskConfig {
    pub fn name(&self) -> &'static str {
        match self {
            TaskConfig::Emnist { .. } => "emnist",
            TaskConfig::Shakespeare { .. } => "shakespeare",
        }
    }
}

fn default_model() -> String {
    emnist::DEFAULT_MODEL.to_string()
}

fn default_sequence_length() -> NonZeroUsize {
    shakespeare::DEFAULT_SEQUENCE_LENGTH
}

/// The datasets an experiment is configured with.
#[derive(Clone, Copy)]
pub enum TaskDatasets<'a> {
    Emnist(&'a dyn EmnistDatasets),
    Shakespeare(&'a dyn ShakespeareDatasets),
}

impl TaskDatasets<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            TaskDatasets::Emnist(_) => "emnist",
            TaskDatasets::Shakespeare(_) => "shakespeare",
        }
    }
}

/// A description of a federated training run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExperimentConfig {
    pub task: TaskConfig,
    pub client_batch_size: NonZeroUsize,
    pub client_epochs_per_round: NonZeroUsize,
    pub clients_per_round: NonZeroUsize,
    #[serde(default)]
    pub client_datasets_random_seed: Option<u64>,
}

impl ExperimentConfig {
    /// Reads the config from json.
    pub fn from_json<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Returns the task spec of this experiment.
    ///
    /// # Arguments
    /// * `iterative_process_builder` - Builds the process the task is trained with.
    pub fn task_spec(&self, iterative_process_builder: Arc<dyn IterativeProcessBuilder>) -> TaskSpec {
        TaskSpec {
            client_batch_size: self.client_batch_size,
            client_epochs_per_round: self.client_epochs_per_round,
            clients_per_round: self.clients_per_round,
            client_datasets_random_seed: self.client_datasets_random_seed,
            iterative_process_builder,
        }
    }

    /// Configures the task this experiment names.
    ///
    /// # Arguments
    /// * `iterative_process_builder` - Builds the process the task is trained with.
    /// * `datasets` - The datasets of the task, must be for the same task as the config.
    /// * `networks` - Builds the networks of the task's model.
    ///
    /// # Returns
    /// The configured task or `TaskErr::TaskMismatch` if the datasets are for another task.
    pub fn configure(
        &self,
        iterative_process_builder: Arc<dyn IterativeProcessBuilder>,
        datasets: TaskDatasets<'_>,
        networks: Arc<dyn NetworkProvider>,
    ) -> Result<RunnerSpec> {
        let task_spec = self.task_spec(iterative_process_builder);
        info!(
            clients_per_round = self.clients_per_round.get();
            "configuring the {} task", self.task.name()
        );

        match (&self.task, datasets) {
            (TaskConfig::Emnist { model }, TaskDatasets::Emnist(datasets)) => {
                emnist::configure_training(&task_spec, model, datasets, networks)
            }
            (TaskConfig::Shakespeare { sequence_length }, TaskDatasets::Shakespeare(datasets)) => {
                shakespeare::configure_training(&task_spec, *sequence_length, datasets, networks)
            }
            (task, datasets) => Err(TaskErr::TaskMismatch {
                config: task.name(),
                datasets: datasets.name(),
            }),
        }
    }
}
