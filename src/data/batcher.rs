// ============================================================
// Data - Text Batcher
// ============================================================
// Implements burn's Batcher trait to stack EncodedText samples
// into device tensors.
//
//   Input:  N samples, each padded to max_len
//   Output: TextBatch with ids/mask [N, max_len] and targets [N]
//
// Targets are typed by the batcher's LabelKind:
//   Binary     → float tensor (BCE-with-logits)
//   MultiClass → int tensor   (cross-entropy)
//   unlabeled  → float tensor of NaN placeholders

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::EncodedText;
use crate::domain::labels::LabelKind;

// ─── Targets ──────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub enum Targets<B: Backend> {
    /// [batch] floats in {0.0, 1.0}
    Binary(Tensor<B, 1>),
    /// [batch] class indices
    Classes(Tensor<B, 1, Int>),
    /// [batch] NaN placeholders; never valid for a loss
    Missing(Tensor<B, 1>),
}

impl<B: Backend> Targets<B> {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing(_))
    }
}

// ─── TextBatch ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct TextBatch<B: Backend> {
    /// Token ids - shape: [batch_size, max_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// 1 = real token, 0 = padding - shape: [batch_size, max_len]
    pub attention_mask: Tensor<B, 2, Int>,

    pub targets: Targets<B>,
}

// ─── TextBatcher ──────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct TextBatcher<B: Backend> {
    device: B::Device,
    /// None when the stream carries no labels
    kind:   Option<LabelKind>,
}

impl<B: Backend> TextBatcher<B> {
    pub fn new(device: B::Device, kind: Option<LabelKind>) -> Self {
        Self { device, kind }
    }
}

impl<B: Backend> Batcher<EncodedText, TextBatch<B>> for TextBatcher<B> {
    fn batch(&self, items: Vec<EncodedText>) -> TextBatch<B> {
        let batch_size = items.len();
        let seq_len    = items.first().map(|s| s.input_ids.len()).unwrap_or(0);

        let input_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.input_ids.iter().map(|&x| x as i32))
            .collect();

        let mask_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.attention_mask.iter().map(|&x| x as i32))
            .collect();

        let input_ids = Tensor::<B, 1, Int>::from_ints(
            input_flat.as_slice(), &self.device
        ).reshape([batch_size, seq_len]);

        let attention_mask = Tensor::<B, 1, Int>::from_ints(
            mask_flat.as_slice(), &self.device
        ).reshape([batch_size, seq_len]);

        let labels: Vec<f32> = items.iter().map(|s| s.label).collect();

        let targets = match self.kind {
            Some(LabelKind::Binary) => Targets::Binary(
                Tensor::<B, 1>::from_floats(labels.as_slice(), &self.device),
            ),
            Some(LabelKind::MultiClass { .. }) => {
                let classes: Vec<i32> = labels.iter().map(|&l| l as i32).collect();
                Targets::Classes(Tensor::<B, 1, Int>::from_ints(
                    classes.as_slice(), &self.device,
                ))
            }
            None => Targets::Missing(
                Tensor::<B, 1>::from_floats(labels.as_slice(), &self.device),
            ),
        };

        TextBatch { input_ids, attention_mask, targets }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestBackend;

    fn sample(ids: &[u32], len: usize, label: f32) -> EncodedText {
        EncodedText {
            input_ids:      ids.to_vec(),
            attention_mask: (0..ids.len()).map(|i| u32::from(i < len)).collect(),
            length:         len,
            label,
        }
    }

    #[test]
    fn test_ids_and_mask_share_shape() {
        let batcher = TextBatcher::<TestBackend>::new(Default::default(), None);
        let batch = batcher.batch(vec![
            sample(&[1, 5, 2, 0], 3, f32::NAN),
            sample(&[1, 6, 7, 2], 4, f32::NAN),
        ]);
        assert_eq!(batch.input_ids.dims(), [2, 4]);
        assert_eq!(batch.attention_mask.dims(), [2, 4]);
        assert!(batch.targets.is_missing());
    }

    #[test]
    fn test_binary_targets_are_float() {
        let batcher = TextBatcher::<TestBackend>::new(Default::default(), Some(LabelKind::Binary));
        let batch = batcher.batch(vec![sample(&[1, 2], 2, 1.0), sample(&[1, 2], 2, 0.0)]);
        match batch.targets {
            Targets::Binary(t) => {
                let values = t.into_data().convert::<f32>().to_vec::<f32>().unwrap();
                assert_eq!(values, vec![1.0, 0.0]);
            }
            other => panic!("expected binary targets, got {other:?}"),
        }
    }

    #[test]
    fn test_multiclass_targets_are_int() {
        let kind = Some(LabelKind::MultiClass { classes: 3 });
        let batcher = TextBatcher::<TestBackend>::new(Default::default(), kind);
        let batch = batcher.batch(vec![sample(&[1, 2], 2, 2.0), sample(&[1, 2], 2, 0.0)]);
        match batch.targets {
            Targets::Classes(t) => {
                let values = t.into_data().convert::<i64>().to_vec::<i64>().unwrap();
                assert_eq!(values, vec![2, 0]);
            }
            other => panic!("expected class targets, got {other:?}"),
        }
    }
}
