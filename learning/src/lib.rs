pub mod arch;
pub mod dataset;
pub mod error;
pub mod metrics;
pub mod model;
pub mod process;
mod scores;
pub mod tensor;

pub use dataset::{ClientData, Dataset, InMemoryClientData};
pub use error::{MlErr, Result};
pub use model::{BatchOutput, LearningModel, LocalOutputs, Metrics, ModelFactory};
pub use process::{ClientWeightFn, IterativeProcess, IterativeProcessBuilder, ServerState};
pub use tensor::{Batch, DType, ElementSpec, Tensor, TensorSpec};
