use std::collections::HashMap;

/// The characters of the Shakespeare vocabulary, in id order starting at 1.
pub const CHAR_VOCAB: &str = concat!(
    "dhlptx@DHLPTX $(,048cgkoswCGKOSW[_#'/37;?bfjnrvzBFJNRVZ\"&*.26:\n",
    "aeimquyAEIMQUY]!%)-159\r",
);

/// Padding, out of vocabulary, beginning and end of sequence.
pub const NUM_SPECIAL_TOKENS: usize = 4;

/// The ids reserved outside of the character range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTokens {
    pub pad: i64,
    pub oov: i64,
    pub bos: i64,
    pub eos: i64,
}

/// Returns the special tokens for a base vocabulary: padding is 0, the rest follow the
/// characters.
pub fn special_tokens(vocab: &str) -> SpecialTokens {
    let len = vocab.chars().count() as i64;
    SpecialTokens {
        pad: 0,
        oov: len + 1,
        bos: len + 2,
        eos: len + 3,
    }
}

/// Returns the size of the model vocabulary: the base characters plus the special tokens.
pub fn vocab_size(vocab: &str) -> usize {
    vocab.chars().count() + NUM_SPECIAL_TOKENS
}

/// Maps characters to token ids.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    ids: HashMap<char, i64>,
    special: SpecialTokens,
}

impl Tokenizer {
    /// Creates a new `Tokenizer`.
    ///
    /// # Arguments
    /// * `vocab` - The characters of the vocabulary, the i-th one gets id `i + 1`.
    ///
    /// # Returns
    /// A new `Tokenizer` instance.
    pub fn new(vocab: &str) -> Self {
        let ids = vocab.chars().zip(1..).collect();
        Self {
            ids,
            special: special_tokens(vocab),
        }
    }

    pub fn special_tokens(&self) -> SpecialTokens {
        self.special
    }

    /// Tokenizes a snippet, wrapping it with the beginning and end of sequence tokens.
    pub fn to_ids(&self, snippet: &str) -> Vec<i64> {
        let SpecialTokens { oov, bos, eos, .. } = self.special;

        let mut ids = Vec::with_capacity(snippet.len() + 2);
        ids.push(bos);
        ids.extend(
            snippet
                .chars()
                .map(|c| self.ids.get(&c).copied().unwrap_or(oov)),
        );
        ids.push(eos);
        ids
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(CHAR_VOCAB)
    }
}
