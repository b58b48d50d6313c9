use burn::data::dataset::Dataset;

/// One tokenised, padded example.
/// `label` is a class value (0/1 for binary heads, an index for
/// multi-class heads) or NaN when the example is unlabeled.
#[derive(Debug, Clone)]
pub struct EncodedText {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub length:         usize,
    pub label:          f32,
}

impl EncodedText {
    pub fn is_labeled(&self) -> bool {
        !self.label.is_nan()
    }
}

pub struct TextDataset {
    samples: Vec<EncodedText>,
}

impl TextDataset {
    pub fn new(samples: Vec<EncodedText>) -> Self { Self { samples } }

    pub fn sample_count(&self) -> usize { self.samples.len() }
}

impl Dataset<EncodedText> for TextDataset {
    fn get(&self, index: usize) -> Option<EncodedText> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
