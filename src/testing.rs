// Shared fixtures for unit tests.

use burn::backend::{Autodiff, NdArray};

use crate::domain::traits::SequenceTokenizer;
use crate::error::Result;
use crate::ml::encoder::EncoderConfig;

pub type TestBackend = NdArray;
pub type TestAutodiffBackend = Autodiff<NdArray>;

pub const TEST_CLS_ID: u32 = 1;
pub const TEST_SEP_ID: u32 = 2;
const FIRST_WORD_ID: u32 = 3;

/// Whitespace tokenizer: `[CLS] word... [SEP]`, each word hashed
/// into `FIRST_WORD_ID..vocab_size`.
pub struct WordTokenizer {
    vocab_size: u32,
}

impl WordTokenizer {
    pub fn new(vocab_size: u32) -> Self {
        assert!(vocab_size > FIRST_WORD_ID);
        Self { vocab_size }
    }

    fn word_id(&self, word: &str) -> u32 {
        let sum: u32 = word.bytes().map(u32::from).sum();
        FIRST_WORD_ID + sum % (self.vocab_size - FIRST_WORD_ID)
    }
}

impl SequenceTokenizer for WordTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let mut ids = vec![TEST_CLS_ID];
        ids.extend(text.split_whitespace().map(|w| self.word_id(w)));
        ids.push(TEST_SEP_ID);
        Ok(ids)
    }
}

/// hidden 8, 2 heads, 1 layer, vocab 64, 16 positions
pub fn tiny_encoder_config() -> EncoderConfig {
    EncoderConfig::new(64, 8, 1, 2, 16, 16)
}
