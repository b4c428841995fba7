use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

use super::ModelWeights;
use crate::{Result, tensor::Tensor};

/// The supported model architectures, each one carrying the parameters it is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Architecture {
    /// Two convolutions, max pooling, dropout and two dense layers over 28x28 images.
    ConvDropout { num_classes: usize },
    /// Two densely connected hidden layers over flattened 28x28 images.
    TwoHiddenLayer {
        num_classes: usize,
        hidden_units: usize,
    },
    /// Character embedding followed by stacked LSTMs predicting the next token at every step.
    Recurrent {
        vocab_size: usize,
        sequence_length: usize,
        embedding_dim: usize,
        lstm_units: usize,
    },
}

impl Architecture {
    /// Returns the amount of classes the network scores on its last axis.
    pub fn num_classes(&self) -> usize {
        match *self {
            Architecture::ConvDropout { num_classes } => num_classes,
            Architecture::TwoHiddenLayer { num_classes, .. } => num_classes,
            Architecture::Recurrent { vocab_size, .. } => vocab_size,
        }
    }
}

/// An untrained neural network.
pub trait Network: Send {
    /// Returns a copy of the network's current weights.
    fn weights(&self) -> ModelWeights;

    /// Replaces the network's weights.
    ///
    /// # Arguments
    /// * `weights` - The new weights, in the same layout `weights` returns them.
    fn assign_weights(&mut self, weights: &ModelWeights) -> Result<()>;

    /// Makes a forward pass through the network.
    ///
    /// # Arguments
    /// * `x` - The input batch.
    ///
    /// # Returns
    /// The class scores for every input position, classes on the last axis.
    fn predict(&mut self, x: &Tensor) -> Result<ArrayD<f32>>;
}

/// Builds untrained networks.
pub trait NetworkProvider: Send + Sync {
    /// Builds a fresh network following the given architecture.
    fn build(&self, architecture: &Architecture) -> Result<Box<dyn Network>>;
}
