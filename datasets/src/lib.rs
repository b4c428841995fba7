mod batching;
pub mod emnist;
pub mod error;
pub mod leaf;
pub mod shakespeare;

pub use emnist::{EmnistDatasets, EmnistExample, LeafEmnist};
pub use error::{DatasetErr, Result};
pub use leaf::RawClientData;
pub use shakespeare::{LeafShakespeare, ShakespeareDatasets, ShakespeareExample};
