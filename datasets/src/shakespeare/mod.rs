mod vocab;

use std::{
    collections::BTreeMap,
    fs::File,
    io::BufReader,
    num::NonZeroUsize,
    path::Path,
    sync::Arc,
};

use learning::{Batch, ClientData, DType, Dataset, ElementSpec, InMemoryClientData, TensorSpec};
use log::info;

use crate::{
    Result, batching,
    leaf::{LeafExample, RawClientData},
};

pub use vocab::{
    CHAR_VOCAB, NUM_SPECIAL_TOKENS, SpecialTokens, Tokenizer, special_tokens, vocab_size,
};

/// Batch size of the centralized test dataset.
pub const TEST_BATCH_SIZE: usize = 100;

/// A line (or several joined lines) spoken by a character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShakespeareExample {
    pub snippets: String,
}

impl ShakespeareExample {
    pub fn new(snippets: impl Into<String>) -> Self {
        Self {
            snippets: snippets.into(),
        }
    }
}

impl LeafExample for ShakespeareExample {
    type X = String;
    type Y = String;

    // LEAF splits each line into a context and the character that follows it.
    fn from_leaf(x: String, y: String) -> Self {
        Self::new(x + &y)
    }
}

/// The spec of a preprocessed Shakespeare batch: token ids for the input and its targets.
pub fn element_spec(sequence_length: NonZeroUsize) -> ElementSpec {
    let tokens = TensorSpec::new(DType::I64, [None, Some(sequence_length.get())]);
    ElementSpec {
        x: tokens.clone(),
        y: tokens,
    }
}

/// Cuts tokenized snippets into `(input, target)` pairs of `sequence_length` tokens, the target
/// being the input shifted by one.
///
/// # Arguments
/// * `ids` - The tokenized snippet.
/// * `sequence_length` - The length of every input and target.
/// * `pad` - The token the last chunk is padded with.
///
/// # Returns
/// Chunks of `sequence_length + 1` tokens.
pub fn to_chunks(ids: &[i64], sequence_length: NonZeroUsize, pad: i64) -> Vec<Vec<i64>> {
    let chunk_len = sequence_length.get() + 1;
    ids.chunks(chunk_len)
        .map(|chunk| {
            let mut chunk = chunk.to_vec();
            chunk.resize(chunk_len, pad);
            chunk
        })
        .collect()
}

/// Provides the Shakespeare datasets.
pub trait ShakespeareDatasets {
    /// Returns the federated training data.
    ///
    /// # Arguments
    /// * `batch_size` - The batch size of every client's dataset.
    /// * `epochs` - The amount of passes over its examples each client makes per round.
    /// * `sequence_length` - The length of the character sequences.
    fn federated_train(
        &self,
        batch_size: NonZeroUsize,
        epochs: NonZeroUsize,
        sequence_length: NonZeroUsize,
    ) -> Result<Arc<dyn ClientData>>;

    /// Returns the centralized test data, every test client's sequences together.
    fn centralized_test(&self, sequence_length: NonZeroUsize) -> Result<Dataset>;
}

/// Shakespeare backed by LEAF client data.
#[derive(Debug, Clone)]
pub struct LeafShakespeare {
    train: RawClientData<ShakespeareExample>,
    test: RawClientData<ShakespeareExample>,
    tokenizer: Tokenizer,
    shuffle_seed: Option<u64>,
}

impl LeafShakespeare {
    /// Creates a new `LeafShakespeare`.
    ///
    /// # Arguments
    /// * `train` - The raw training snippets of every client.
    /// * `test` - The raw test snippets of every client.
    ///
    /// # Returns
    /// A new `LeafShakespeare` over the default character vocabulary.
    pub fn new(
        train: RawClientData<ShakespeareExample>,
        test: RawClientData<ShakespeareExample>,
    ) -> Self {
        Self {
            train,
            test,
            tokenizer: Tokenizer::default(),
            shuffle_seed: None,
        }
    }

    /// Reads the train and test splits from LEAF json files.
    pub fn from_leaf_files<P: AsRef<Path>>(train: P, test: P) -> Result<Self> {
        let train = RawClientData::from_leaf_json(BufReader::new(File::open(train)?))?;
        let test = RawClientData::from_leaf_json(BufReader::new(File::open(test)?))?;
        Ok(Self::new(train, test))
    }

    /// Makes the shuffling of clients' sequences reproducible.
    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    fn chunks(
        &self,
        examples: &[ShakespeareExample],
        sequence_length: NonZeroUsize,
    ) -> Vec<Vec<i64>> {
        let pad = self.tokenizer.special_tokens().pad;
        examples
            .iter()
            .flat_map(|example| {
                let ids = self.tokenizer.to_ids(&example.snippets);
                to_chunks(&ids, sequence_length, pad)
            })
            .collect()
    }
}

impl ShakespeareDatasets for LeafShakespeare {
    fn federated_train(
        &self,
        batch_size: NonZeroUsize,
        epochs: NonZeroUsize,
        sequence_length: NonZeroUsize,
    ) -> Result<Arc<dyn ClientData>> {
        let spec = element_spec(sequence_length);
        let mut clients = BTreeMap::new();

        for (i, (id, examples)) in self.train.iter().enumerate() {
            let chunks = self.chunks(examples, sequence_length);

            let mut rng = batching::client_rng(self.shuffle_seed, i);
            let order = batching::epoch_order(chunks.len(), epochs, Some(&mut rng));
            let batches = order
                .chunks(batch_size.get())
                .map(|batch| to_batch(batch.iter().map(|&j| chunks[j].as_slice())))
                .collect::<Result<Vec<_>>>()?;

            clients.insert(id.clone(), Dataset::new(spec.clone(), batches)?);
        }

        info!(
            clients = clients.len(),
            batch_size = batch_size.get(),
            epochs = epochs.get(),
            sequence_length = sequence_length.get();
            "preprocessed federated shakespeare"
        );
        Ok(Arc::new(InMemoryClientData::new(spec, clients)?))
    }

    fn centralized_test(&self, sequence_length: NonZeroUsize) -> Result<Dataset> {
        let chunks: Vec<Vec<i64>> = self
            .test
            .iter()
            .flat_map(|(_, examples)| self.chunks(examples, sequence_length))
            .collect();

        let batches = chunks
            .chunks(TEST_BATCH_SIZE)
            .map(|batch| to_batch(batch.iter().map(Vec::as_slice)))
            .collect::<Result<Vec<_>>>()?;

        info!(sequences = chunks.len(); "preprocessed centralized shakespeare");
        Ok(Dataset::new(element_spec(sequence_length), batches)?)
    }
}

fn to_batch<'a, I>(chunks: I) -> Result<Batch>
where
    I: Iterator<Item = &'a [i64]>,
{
    let (inputs, targets): (Vec<&[i64]>, Vec<&[i64]>) = chunks
        .map(|chunk| (&chunk[..chunk.len() - 1], &chunk[1..]))
        .unzip();

    let row_len = inputs.first().map_or(0, |row| row.len());
    let x = batching::stack(&inputs, &[row_len])?;
    let y = batching::stack(&targets, &[row_len])?;
    Ok(Batch::new(x, y))
}
