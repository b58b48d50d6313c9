// ============================================================
// ML - Loss functions
// ============================================================
//   BinaryCrossEntropy → single-logit heads, float targets
//   CrossEntropy       → k-logit heads, integer class targets
//   triplet margin     → embedding training, Euclidean distance

use burn::{
    nn::loss::{BinaryCrossEntropyLossConfig, CrossEntropyLossConfig},
    prelude::*,
};

use crate::data::batcher::Targets;
use crate::domain::labels::LabelKind;
use crate::error::{HarnessError, Result};
use crate::ml::pooling::Pooled;

/// Margin used by triplet training.
pub const TRIPLET_MARGIN: f64 = 1.0;

/// Added to the embedding difference before the norm, like the usual
/// pairwise distance, so the gradient stays finite at zero distance.
const DISTANCE_EPS: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossKind {
    BinaryCrossEntropy,
    CrossEntropy,
}

impl From<LabelKind> for LossKind {
    fn from(kind: LabelKind) -> Self {
        match kind {
            LabelKind::Binary => Self::BinaryCrossEntropy,
            LabelKind::MultiClass { .. } => Self::CrossEntropy,
        }
    }
}

/// Loss between a Predict-mode forward output and the batch targets.
pub fn classification_loss<B: Backend>(
    kind:    LossKind,
    output:  Pooled<B>,
    targets: Targets<B>,
) -> Result<Tensor<B, 1>> {
    match (kind, output, targets) {
        (_, _, Targets::Missing(_)) => Err(HarnessError::MissingLabels),
        (LossKind::BinaryCrossEntropy, Pooled::Scores(scores), Targets::Binary(labels)) => {
            Ok(bce_with_logits(scores, labels))
        }
        (LossKind::CrossEntropy, Pooled::Logits(logits), Targets::Classes(labels)) => {
            let ce = CrossEntropyLossConfig::new().init(&logits.device());
            Ok(ce.forward(logits, labels))
        }
        (kind, _, _) => Err(HarnessError::label(format!(
            "targets and head output do not match the {kind:?} loss"
        ))),
    }
}

/// Mean binary cross-entropy on raw logits; targets hold 0.0 / 1.0.
pub fn bce_with_logits<B: Backend>(logits: Tensor<B, 1>, targets: Tensor<B, 1>) -> Tensor<B, 1> {
    let bce = BinaryCrossEntropyLossConfig::new()
        .with_logits(true)
        .init(&logits.device());
    bce.forward(logits, targets.int())
}

/// Euclidean distance between matching rows: [batch, dim] → [batch]
pub fn pairwise_distance<B: Backend>(a: Tensor<B, 2>, b: Tensor<B, 2>) -> Tensor<B, 1> {
    let diff = (a - b).add_scalar(DISTANCE_EPS);
    (diff.clone() * diff).sum_dim(1).sqrt().flatten::<1>(0, 1)
}

/// mean(max(d(a, p) - d(a, n) + margin, 0))
pub fn triplet_margin_loss<B: Backend>(
    anchor:   Tensor<B, 2>,
    positive: Tensor<B, 2>,
    negative: Tensor<B, 2>,
    margin:   f64,
) -> Tensor<B, 1> {
    let d_pos = pairwise_distance(anchor.clone(), positive);
    let d_neg = pairwise_distance(anchor, negative);
    (d_pos - d_neg).add_scalar(margin).clamp_min(0.0).mean()
}
