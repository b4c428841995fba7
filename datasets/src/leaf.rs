use std::{
    collections::{BTreeMap, HashMap},
    io::Read,
};

use log::info;
use serde::{Deserialize, de::DeserializeOwned};

use crate::{DatasetErr, Result};

/// An example that can be read from a LEAF `(x, y)` pair.
pub trait LeafExample: Sized {
    type X: DeserializeOwned;
    type Y: DeserializeOwned;

    fn from_leaf(x: Self::X, y: Self::Y) -> Self;
}

#[derive(Deserialize)]
struct LeafFile<X, Y> {
    users: Vec<String>,
    user_data: HashMap<String, LeafUser<X, Y>>,
}

#[derive(Deserialize)]
struct LeafUser<X, Y> {
    x: Vec<X>,
    y: Vec<Y>,
}

/// Unprocessed examples grouped by the client that owns them.
#[derive(Debug, Clone, PartialEq)]
pub struct RawClientData<E> {
    clients: BTreeMap<String, Vec<E>>,
}

impl<E> RawClientData<E> {
    pub fn new(clients: BTreeMap<String, Vec<E>>) -> Self {
        Self { clients }
    }

    pub fn client_ids(&self) -> impl Iterator<Item = &String> {
        self.clients.keys()
    }

    pub fn examples(&self, client_id: &str) -> Option<&[E]> {
        self.clients.get(client_id).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<E>)> {
        self.clients.iter()
    }

    /// Returns the amount of clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Returns the amount of examples across every client.
    pub fn num_examples(&self) -> usize {
        self.clients.values().map(Vec::len).sum()
    }
}

impl<E: LeafExample> RawClientData<E> {
    /// Reads a LEAF json file: `{"users": [...], "user_data": {id: {"x": [...], "y": [...]}}}`.
    ///
    /// # Arguments
    /// * `reader` - The source of the json document.
    ///
    /// # Returns
    /// The examples of every listed user or an error if the document is malformed.
    pub fn from_leaf_json<R: Read>(reader: R) -> Result<Self> {
        let LeafFile {
            users,
            mut user_data,
        } = serde_json::from_reader::<_, LeafFile<E::X, E::Y>>(reader)?;

        let mut clients = BTreeMap::new();
        for id in users {
            let LeafUser { x, y } = user_data
                .remove(&id)
                .ok_or_else(|| DatasetErr::MissingClient { id: id.clone() })?;

            if x.len() != y.len() {
                return Err(DatasetErr::MalformedExample {
                    client: id,
                    index: x.len().min(y.len()),
                    reason: format!("{} inputs but {} labels", x.len(), y.len()),
                });
            }

            let examples = x.into_iter().zip(y).map(|(x, y)| E::from_leaf(x, y));
            clients.insert(id, examples.collect());
        }

        let data = Self::new(clients);
        info!(
            clients = data.len(),
            examples = data.num_examples();
            "loaded leaf client data"
        );
        Ok(data)
    }
}
