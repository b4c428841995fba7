use std::collections::BTreeMap;

use crate::{
    MlErr, Result,
    tensor::{Batch, ElementSpec},
};

/// A finite, already batched, in-memory dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    element_spec: ElementSpec,
    batches: Vec<Batch>,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Arguments
    /// * `element_spec` - The spec every batch must conform to.
    /// * `batches` - The batches of data.
    ///
    /// # Returns
    /// A new `Dataset` or an error if any batch does not match the spec.
    pub fn new(element_spec: ElementSpec, batches: Vec<Batch>) -> Result<Self> {
        for batch in &batches {
            element_spec.check(batch)?;
        }

        Ok(Self {
            element_spec,
            batches,
        })
    }

    pub fn element_spec(&self) -> &ElementSpec {
        &self.element_spec
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn num_batches(&self) -> usize {
        self.batches.len()
    }

    /// Returns the amount of examples across all batches.
    pub fn num_examples(&self) -> usize {
        self.batches.iter().map(Batch::num_examples).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

/// A federated dataset: one dataset per client, all sharing the same element spec.
pub trait ClientData: Send + Sync {
    /// Returns the ids of every client, in a stable order.
    fn client_ids(&self) -> &[String];

    /// Returns the spec shared by every client's elements.
    fn element_spec(&self) -> &ElementSpec;

    /// Materializes the dataset of a single client.
    ///
    /// # Arguments
    /// * `client_id` - The id of the client.
    ///
    /// # Returns
    /// The client's dataset or `MlErr::UnknownClient`.
    fn dataset_for_client(&self, client_id: &str) -> Result<Dataset>;
}

/// A `ClientData` holding every client's dataset in memory.
#[derive(Debug, Clone)]
pub struct InMemoryClientData {
    element_spec: ElementSpec,
    client_ids: Vec<String>,
    clients: BTreeMap<String, Dataset>,
}

impl InMemoryClientData {
    /// Creates a new `InMemoryClientData`.
    ///
    /// # Arguments
    /// * `element_spec` - The spec shared by every client.
    /// * `clients` - The datasets keyed by client id.
    ///
    /// # Returns
    /// A new `InMemoryClientData` or an error if a client's dataset has a different spec.
    pub fn new(element_spec: ElementSpec, clients: BTreeMap<String, Dataset>) -> Result<Self> {
        for dataset in clients.values() {
            let got = dataset.element_spec();
            if got.x != element_spec.x {
                return Err(MlErr::SpecMismatch {
                    what: "client input",
                    got: got.x.clone(),
                    expected: element_spec.x,
                });
            }
            if got.y != element_spec.y {
                return Err(MlErr::SpecMismatch {
                    what: "client labels",
                    got: got.y.clone(),
                    expected: element_spec.y,
                });
            }
        }

        Ok(Self {
            element_spec,
            client_ids: clients.keys().cloned().collect(),
            clients,
        })
    }
}

impl ClientData for InMemoryClientData {
    fn client_ids(&self) -> &[String] {
        &self.client_ids
    }

    fn element_spec(&self) -> &ElementSpec {
        &self.element_spec
    }

    fn dataset_for_client(&self, client_id: &str) -> Result<Dataset> {
        self.clients
            .get(client_id)
            .cloned()
            .ok_or_else(|| MlErr::UnknownClient {
                id: client_id.to_string(),
            })
    }
}
