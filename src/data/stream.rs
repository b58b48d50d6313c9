// ============================================================
// Data - Batch Stream
// ============================================================
// A finite, restartable, in-order stream of TextBatches built
// on burn's DataLoader. No shuffling and no worker threads:
// every call to iter() replays the same batches in the same
// order, the last one possibly short.

use std::sync::Arc;

use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    prelude::*,
};

use crate::data::{
    batcher::{TextBatch, TextBatcher},
    dataset::{EncodedText, TextDataset},
};
use crate::domain::labels::LabelKind;
use crate::error::{HarnessError, Result};

pub struct BatchStream<B: Backend> {
    loader:     Arc<dyn DataLoader<TextBatch<B>>>,
    examples:   usize,
    batch_size: usize,
    kind:       Option<LabelKind>,
}

impl<B: Backend> std::fmt::Debug for BatchStream<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchStream")
            .field("examples", &self.examples)
            .field("batch_size", &self.batch_size)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl<B: Backend> BatchStream<B> {
    pub fn new(
        samples:    Vec<EncodedText>,
        batch_size: usize,
        kind:       Option<LabelKind>,
        device:     B::Device,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(HarnessError::config("batch_size must be positive"));
        }
        // Unlabeled samples never carry a label kind
        let kind = if samples.iter().any(|s| !s.is_labeled()) { None } else { kind };

        let dataset  = TextDataset::new(samples);
        let examples = dataset.sample_count();
        let batcher  = TextBatcher::<B>::new(device, kind);
        let loader   = DataLoaderBuilder::new(batcher)
            .batch_size(batch_size)
            .build(dataset);

        Ok(Self { loader, examples, batch_size, kind })
    }

    /// Iterate the batches from the start.
    pub fn iter(&self) -> impl Iterator<Item = TextBatch<B>> + '_ {
        self.loader.iter()
    }

    /// Number of batches one pass yields.
    pub fn num_batches(&self) -> usize {
        self.examples.div_ceil(self.batch_size)
    }

    /// Number of examples.
    pub fn len(&self) -> usize {
        self.examples
    }

    pub fn is_empty(&self) -> bool {
        self.examples == 0
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn label_kind(&self) -> Option<LabelKind> {
        self.kind
    }
}
