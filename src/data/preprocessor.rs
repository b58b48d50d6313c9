// ============================================================
// Data - Sequence Preprocessor
// ============================================================
// Turns raw texts (and optional labels) into fixed-length
// samples ready for batching.
//
// Steps per text:
//   1. Tokenise with special tokens added, no truncation
//   2. Keep the first max_len ids, or right-pad with PAD_ID
//   3. Record the true (post-truncation) length
//   4. Attention mask = 1 for positions < length, 0 after
//   5. Attach the label (or the NaN placeholder)
//
// The mask comes from the recorded length, not from the id
// values, so a vocabulary that uses id 0 for a real token
// still gets a correct mask. With a vocabulary size set, any
// kept id outside the embedding table is a tokenizer error.

use crate::data::dataset::EncodedText;
use crate::domain::labels::{LabelKind, MISSING_LABEL};
use crate::domain::traits::SequenceTokenizer;
use crate::error::{HarnessError, Result};

/// Id written into padding positions.
pub const PAD_ID: u32 = 0;

#[derive(Debug, Clone)]
pub struct Preprocessor {
    max_len:    usize,
    vocab_size: Option<usize>,
}

impl Preprocessor {
    pub fn new(max_len: usize) -> Result<Self> {
        if max_len == 0 {
            return Err(HarnessError::config("max_len must be positive"));
        }
        Ok(Self { max_len, vocab_size: None })
    }

    /// Reject token ids that do not fit an embedding table of this size.
    pub fn with_vocab_size(mut self, vocab_size: usize) -> Self {
        self.vocab_size = Some(vocab_size);
        self
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Truncate or right-pad `ids` to exactly max_len.
    /// Returns the padded ids and the number of real tokens kept.
    pub fn pad(&self, mut ids: Vec<u32>) -> (Vec<u32>, usize) {
        ids.truncate(self.max_len);
        let length = ids.len();
        ids.resize(self.max_len, PAD_ID);
        (ids, length)
    }

    /// Attention mask for a sequence of `length` real tokens.
    pub fn attention_mask(&self, length: usize) -> Vec<u32> {
        (0..self.max_len)
            .map(|position| u32::from(position < length))
            .collect()
    }

    /// Encode a single text with an already-resolved label value.
    pub fn encode_text(
        &self,
        tokenizer: &dyn SequenceTokenizer,
        text:      &str,
        label:     f32,
    ) -> Result<EncodedText> {
        let ids = tokenizer.encode(text)?;
        let (input_ids, length) = self.pad(ids);
        if let Some(vocab_size) = self.vocab_size {
            if let Some(&id) = input_ids[..length].iter().find(|&&id| id as usize >= vocab_size) {
                return Err(HarnessError::Tokenizer(format!(
                    "token id {id} is outside the encoder vocabulary of {vocab_size}"
                )));
            }
        }
        let attention_mask = self.attention_mask(length);
        Ok(EncodedText { input_ids, attention_mask, length, label })
    }

    /// Encode every text, resolving labels against the head's LabelKind.
    ///
    /// `kind` must be Some whenever `labels` is Some: labels can only
    /// be typed once the width of the classification head is known.
    pub fn encode_all<S: AsRef<str>>(
        &self,
        tokenizer: &dyn SequenceTokenizer,
        texts:     &[S],
        labels:    Option<&[usize]>,
        kind:      Option<LabelKind>,
    ) -> Result<Vec<EncodedText>> {
        let values: Vec<f32> = match labels {
            None => vec![MISSING_LABEL; texts.len()],
            Some(labels) => {
                let kind = kind.ok_or_else(|| {
                    HarnessError::label("labels were given but the model has no classification head")
                })?;
                if labels.len() != texts.len() {
                    return Err(HarnessError::label(format!(
                        "{} texts but {} labels",
                        texts.len(),
                        labels.len()
                    )));
                }
                labels
                    .iter()
                    .map(|&label| kind.encode(label))
                    .collect::<Result<_>>()?
            }
        };

        let samples = texts
            .iter()
            .zip(values)
            .map(|(text, label)| self.encode_text(tokenizer, text.as_ref(), label))
            .collect::<Result<Vec<_>>>()?;

        let truncated = samples.iter().filter(|s| s.length == self.max_len).count();
        tracing::debug!(
            "Encoded {} texts (max_len={}, {} at full length)",
            samples.len(),
            self.max_len,
            truncated
        );
        Ok(samples)
    }
}
