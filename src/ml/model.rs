// ============================================================
// ML - Text Encoder Model
// ============================================================
// The trainable unit: encoder + optional dropout + optional
// linear classification head. Its record is the flat
// parameter-name → tensor mapping that checkpoints persist.
//
// A head built for 2 classes has a single output unit (binary
// framing, BCE-with-logits); any other class count gets one
// logit per class.

use burn::{
    nn::{Dropout, DropoutConfig, Linear, LinearConfig},
    prelude::*,
};

use crate::domain::labels::LabelKind;
// Not the crate Result alias: the Config derive expands serde impls over `Result<_, E>`
use crate::error::HarnessError;
use crate::ml::encoder::{BertEncoder, EncoderConfig};
use crate::ml::params::{linear_params, NamedParam};
use crate::ml::pooling::{cls_pool, mean_pool, Pooled, PostOp};

#[derive(Config, Debug)]
pub struct TextEncoderModelConfig {
    pub encoder: EncoderConfig,
    #[config(default = "None")]
    pub num_classes: Option<usize>,
    #[config(default = "None")]
    pub dropout: Option<f64>,
}

impl TextEncoderModelConfig {
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.num_classes == Some(0) {
            return Err(HarnessError::config("num_classes must be at least 1"));
        }
        if let Some(p) = self.dropout {
            if !(0.0..1.0).contains(&p) {
                return Err(HarnessError::config(format!(
                    "dropout probability must be in [0, 1), got {p}"
                )));
            }
        }
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> TextEncoderModel<B> {
        let encoder = self.encoder.init(device);
        let head = self.num_classes.map(|classes| {
            LinearConfig::new(self.encoder.hidden_size, LabelKind::head_width(classes))
                .init(device)
        });
        let dropout = self.dropout.map(|p| DropoutConfig::new(p).init());
        TextEncoderModel { encoder, dropout, head }
    }
}

#[derive(Module, Debug)]
pub struct TextEncoderModel<B: Backend> {
    pub encoder: BertEncoder<B>,
    pub dropout: Option<Dropout>,
    pub head:    Option<Linear<B>>,
}

impl<B: Backend> TextEncoderModel<B> {
    /// Output width of the classification head, if any.
    pub fn head_width(&self) -> Option<usize> {
        self.head.as_ref().map(|head| head.weight.val().dims()[1])
    }

    /// Label kind implied by the head (None without a head).
    pub fn label_kind(&self) -> Option<LabelKind> {
        self.head_width().map(LabelKind::from_head_width)
    }

    pub fn dropout_prob(&self) -> Option<f64> {
        self.dropout.as_ref().map(|d| d.prob)
    }

    /// input_ids, attention_mask: [batch, seq_len]
    pub fn forward(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
        post_op:        PostOp,
    ) -> crate::error::Result<Pooled<B>> {
        let output = self.encoder.forward(input_ids, attention_mask.clone());

        match post_op {
            PostOp::Sequence => Ok(Pooled::Sequence(output.hidden_states)),
            PostOp::Default  => Ok(Pooled::Embedding(output.pooled)),
            PostOp::Cls      => Ok(Pooled::Embedding(cls_pool(output.hidden_states))),
            PostOp::Mean     => Ok(Pooled::Embedding(mean_pool(output.hidden_states, attention_mask)?)),
            PostOp::Predict  => self.predict(output.pooled),
        }
    }

    fn predict(&self, pooled: Tensor<B, 2>) -> crate::error::Result<Pooled<B>> {
        let head = self.head.as_ref().ok_or_else(|| {
            HarnessError::config("post_op 'predict' needs a classification head (set num_classes)")
        })?;
        let pooled = match &self.dropout {
            Some(dropout) => dropout.forward(pooled),
            None => pooled,
        };
        let logits = head.forward(pooled);
        let [batch_size, width] = logits.dims();
        if width == 1 {
            Ok(Pooled::Scores(logits.reshape([batch_size])))
        } else {
            Ok(Pooled::Logits(logits))
        }
    }

    /// Every trainable parameter with its flat name.
    pub fn named_params(&self) -> Vec<NamedParam> {
        let mut params = Vec::new();
        self.encoder.named_params("encoder.", &mut params);
        if let Some(head) = &self.head {
            linear_params("head", head, &mut params);
        }
        params
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{tiny_encoder_config, TestBackend};

    fn batch(device: &<TestBackend as Backend>::Device) -> (Tensor<TestBackend, 2, Int>, Tensor<TestBackend, 2, Int>) {
        let ids  = Tensor::from_ints([[1, 5, 6, 2], [1, 7, 2, 0], [1, 9, 2, 0]], device);
        let mask = Tensor::from_ints([[1, 1, 1, 1], [1, 1, 1, 0], [1, 1, 1, 0]], device);
        (ids, mask)
    }

    fn model(num_classes: Option<usize>) -> TextEncoderModel<TestBackend> {
        TextEncoderModelConfig::new(tiny_encoder_config())
            .with_num_classes(num_classes)
            .init(&Default::default())
    }

    #[test]
    fn test_predict_binary_head_is_one_dimensional() {
        let device = Default::default();
        let (ids, mask) = batch(&device);
        match model(Some(2)).forward(ids, mask, PostOp::Predict).unwrap() {
            Pooled::Scores(scores) => assert_eq!(scores.dims(), [3]),
            other => panic!("expected scores, got {other:?}"),
        }
    }

    #[test]
    fn test_predict_multiclass_head_keeps_classes() {
        let device = Default::default();
        let (ids, mask) = batch(&device);
        match model(Some(4)).forward(ids, mask, PostOp::Predict).unwrap() {
            Pooled::Logits(logits) => assert_eq!(logits.dims(), [3, 4]),
            other => panic!("expected logits, got {other:?}"),
        }
    }

    #[test]
    fn test_predict_without_head_is_config_error() {
        let device = Default::default();
        let (ids, mask) = batch(&device);
        let err = model(None).forward(ids, mask, PostOp::Predict).unwrap_err();
        assert!(matches!(err, HarnessError::Config(_)));
    }

    #[test]
    fn test_embedding_modes_shapes() {
        let device = Default::default();
        let m = model(None);
        for op in [PostOp::Mean, PostOp::Default, PostOp::Cls] {
            let (ids, mask) = batch(&device);
            let emb = m.forward(ids, mask, op).unwrap().into_embedding().unwrap();
            assert_eq!(emb.dims(), [3, 8]);
        }
        let (ids, mask) = batch(&device);
        match m.forward(ids, mask, PostOp::Sequence).unwrap() {
            Pooled::Sequence(h) => assert_eq!(h.dims(), [3, 4, 8]),
            other => panic!("expected sequence, got {other:?}"),
        }
    }

    #[test]
    fn test_label_kind_follows_head() {
        assert_eq!(model(Some(2)).label_kind(), Some(LabelKind::Binary));
        assert_eq!(
            model(Some(3)).label_kind(),
            Some(LabelKind::MultiClass { classes: 3 })
        );
        assert_eq!(model(None).label_kind(), None);
    }

    #[test]
    fn test_invalid_num_classes_rejected() {
        let cfg = TextEncoderModelConfig::new(tiny_encoder_config()).with_num_classes(Some(0));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_config_json_round_trip() {
        let cfg = TextEncoderModelConfig::new(tiny_encoder_config())
            .with_num_classes(Some(3))
            .with_dropout(Some(0.1));
        let json = serde_json::to_string(&cfg).unwrap();
        let back: TextEncoderModelConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.num_classes, Some(3));
        assert_eq!(back.dropout, Some(0.1));
        assert_eq!(back.encoder.hidden_size, cfg.encoder.hidden_size);
    }
}
