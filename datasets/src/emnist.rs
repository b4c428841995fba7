use std::{
    collections::BTreeMap,
    fs::File,
    io::BufReader,
    num::NonZeroUsize,
    path::Path,
    sync::Arc,
};

use learning::{
    Batch, ClientData, DType, Dataset, ElementSpec, InMemoryClientData, TensorSpec,
};
use log::info;

use crate::{
    DatasetErr, Result, batching,
    leaf::{LeafExample, RawClientData},
};

pub const IMAGE_SIZE: usize = 28;
pub const NUM_PIXELS: usize = IMAGE_SIZE * IMAGE_SIZE;
pub const NUM_DIGIT_CLASSES: usize = 10;
pub const NUM_CLASSES: usize = 62;

/// Batch size of the centralized test dataset.
pub const TEST_BATCH_SIZE: usize = 500;

/// A single handwritten character: a flattened 28x28 image and its class.
#[derive(Debug, Clone, PartialEq)]
pub struct EmnistExample {
    pub pixels: Vec<f32>,
    pub label: i64,
}

impl LeafExample for EmnistExample {
    type X = Vec<f32>;
    type Y = i64;

    fn from_leaf(pixels: Vec<f32>, label: i64) -> Self {
        Self { pixels, label }
    }
}

/// Returns the amount of classes, digits only or digits and letters.
pub fn num_classes(only_digits: bool) -> usize {
    if only_digits {
        NUM_DIGIT_CLASSES
    } else {
        NUM_CLASSES
    }
}

/// The spec of a preprocessed EMNIST batch: `f32[?, 28, 28, 1]` images, `i64[?, 1]` labels.
pub fn element_spec() -> ElementSpec {
    ElementSpec {
        x: TensorSpec::new(
            DType::F32,
            [None, Some(IMAGE_SIZE), Some(IMAGE_SIZE), Some(1)],
        ),
        y: TensorSpec::new(DType::I64, [None, Some(1)]),
    }
}

/// Provides the EMNIST datasets.
pub trait EmnistDatasets {
    /// Returns the federated training data.
    ///
    /// # Arguments
    /// * `batch_size` - The batch size of every client's dataset.
    /// * `epochs` - The amount of passes over its examples each client makes per round.
    /// * `only_digits` - Whether the data holds digits only or digits and letters.
    fn federated_train(
        &self,
        batch_size: NonZeroUsize,
        epochs: NonZeroUsize,
        only_digits: bool,
    ) -> Result<Arc<dyn ClientData>>;

    /// Returns the centralized test data, every test client's examples together.
    fn centralized_test(&self, only_digits: bool) -> Result<Dataset>;
}

/// EMNIST backed by LEAF client data.
#[derive(Debug, Clone)]
pub struct LeafEmnist {
    train: RawClientData<EmnistExample>,
    test: RawClientData<EmnistExample>,
    shuffle_seed: Option<u64>,
}

impl LeafEmnist {
    /// Creates a new `LeafEmnist`.
    ///
    /// # Arguments
    /// * `train` - The raw training examples of every client.
    /// * `test` - The raw test examples of every client.
    ///
    /// # Returns
    /// A new `LeafEmnist` that shuffles clients' examples with OS randomness.
    pub fn new(train: RawClientData<EmnistExample>, test: RawClientData<EmnistExample>) -> Self {
        Self {
            train,
            test,
            shuffle_seed: None,
        }
    }

    /// Reads the train and test splits from LEAF json files.
    pub fn from_leaf_files<P: AsRef<Path>>(train: P, test: P) -> Result<Self> {
        let train = RawClientData::from_leaf_json(BufReader::new(File::open(train)?))?;
        let test = RawClientData::from_leaf_json(BufReader::new(File::open(test)?))?;
        Ok(Self::new(train, test))
    }

    /// Makes the shuffling of clients' examples reproducible.
    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }
}

impl EmnistDatasets for LeafEmnist {
    fn federated_train(
        &self,
        batch_size: NonZeroUsize,
        epochs: NonZeroUsize,
        only_digits: bool,
    ) -> Result<Arc<dyn ClientData>> {
        let num_classes = num_classes(only_digits);
        let mut clients = BTreeMap::new();

        for (i, (id, examples)) in self.train.iter().enumerate() {
            validate(id, examples, num_classes)?;

            let mut rng = batching::client_rng(self.shuffle_seed, i);
            let order = batching::epoch_order(examples.len(), epochs, Some(&mut rng));
            let batches = order
                .chunks(batch_size.get())
                .map(|chunk| to_batch(chunk.iter().map(|&j| &examples[j])))
                .collect::<Result<Vec<_>>>()?;

            clients.insert(id.clone(), Dataset::new(element_spec(), batches)?);
        }

        info!(
            clients = clients.len(),
            batch_size = batch_size.get(),
            epochs = epochs.get();
            "preprocessed federated emnist"
        );
        Ok(Arc::new(InMemoryClientData::new(element_spec(), clients)?))
    }

    fn centralized_test(&self, only_digits: bool) -> Result<Dataset> {
        let num_classes = num_classes(only_digits);
        for (id, examples) in self.test.iter() {
            validate(id, examples, num_classes)?;
        }

        let examples: Vec<&EmnistExample> = self.test.iter().flat_map(|(_, e)| e).collect();
        let batches = examples
            .chunks(TEST_BATCH_SIZE)
            .map(|chunk| to_batch(chunk.iter().copied()))
            .collect::<Result<Vec<_>>>()?;

        info!(examples = examples.len(); "preprocessed centralized emnist");
        Ok(Dataset::new(element_spec(), batches)?)
    }
}

fn validate(client: &str, examples: &[EmnistExample], num_classes: usize) -> Result<()> {
    for (index, example) in examples.iter().enumerate() {
        let reason = if example.pixels.len() != NUM_PIXELS {
            format!("{} pixels, expected {NUM_PIXELS}", example.pixels.len())
        } else if example.label < 0 || example.label as usize >= num_classes {
            format!("label {} outside of {num_classes} classes", example.label)
        } else {
            continue;
        };

        return Err(DatasetErr::MalformedExample {
            client: client.to_string(),
            index,
            reason,
        });
    }

    Ok(())
}

fn to_batch<'a, I>(examples: I) -> Result<Batch>
where
    I: Iterator<Item = &'a EmnistExample>,
{
    let (pixels, labels): (Vec<&[f32]>, Vec<i64>) = examples
        .map(|example| (example.pixels.as_slice(), example.label))
        .unzip();
    let labels: Vec<&[i64]> = labels.iter().map(std::slice::from_ref).collect();

    let x = batching::stack(&pixels, &[IMAGE_SIZE, IMAGE_SIZE, 1])?;
    let y = batching::stack(&labels, &[1])?;
    Ok(Batch::new(x, y))
}
