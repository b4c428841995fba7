use crate::{
    Result,
    arch::ModelWeights,
    dataset::Dataset,
    model::{LocalOutputs, Metrics, ModelFactory},
};

/// Maps a client's local outputs to the weight its update carries in the aggregate.
pub type ClientWeightFn = fn(&LocalOutputs) -> Result<f32>;

/// The state an iterative process threads from one round to the next.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerState {
    pub model: ModelWeights,
    pub round_num: u64,
}

/// A stateful federated training procedure, run round by round.
pub trait IterativeProcess: Send {
    /// Builds the state the first round starts from.
    fn initialize(&self) -> Result<ServerState>;

    /// Runs a single round.
    ///
    /// # Arguments
    /// * `state` - The state the round starts from.
    /// * `client_datasets` - The datasets of the clients taking part in the round.
    ///
    /// # Returns
    /// The updated state and the round's training metrics.
    fn next(
        &mut self,
        state: ServerState,
        client_datasets: &[Dataset],
    ) -> Result<(ServerState, Metrics)>;
}

/// Builds iterative processes around a model factory.
pub trait IterativeProcessBuilder: Send + Sync {
    /// Builds a new iterative process.
    ///
    /// # Arguments
    /// * `model_fn` - Builds the models the process trains.
    /// * `client_weight_fn` - Overrides how much each client's update weighs, `None` keeps the
    ///   process' default.
    ///
    /// # Returns
    /// The trainable process.
    fn build(
        &self,
        model_fn: ModelFactory,
        client_weight_fn: Option<ClientWeightFn>,
    ) -> Result<Box<dyn IterativeProcess>>;
}
