pub mod loss;
mod network;
mod weights;

pub use network::{Architecture, Network, NetworkProvider};
pub use weights::ModelWeights;
