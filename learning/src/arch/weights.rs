use ndarray::ArrayD;

use super::Network;
use crate::Result;

/// The weights of a model, split in the ones updated by training and the ones that are not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelWeights {
    pub trainable: Vec<ArrayD<f32>>,
    pub non_trainable: Vec<ArrayD<f32>>,
}

impl ModelWeights {
    pub fn new(trainable: Vec<ArrayD<f32>>, non_trainable: Vec<ArrayD<f32>>) -> Self {
        Self {
            trainable,
            non_trainable,
        }
    }

    /// Returns the amount of scalar parameters across every tensor.
    pub fn num_params(&self) -> usize {
        self.trainable
            .iter()
            .chain(&self.non_trainable)
            .map(ArrayD::len)
            .sum()
    }

    /// Writes these weights into a network.
    pub fn assign_to(&self, network: &mut dyn Network) -> Result<()> {
        network.assign_weights(self)
    }
}
