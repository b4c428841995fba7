pub mod config;
pub mod emnist;
pub mod error;
pub mod shakespeare;
pub mod specs;
pub mod training_utils;

pub use config::{ExperimentConfig, TaskConfig, TaskDatasets};
pub use error::{Result, TaskErr};
pub use specs::{RunnerSpec, TaskSpec};
pub use training_utils::{ClientDatasetsFn, EvaluateFn, ValidationFn};
