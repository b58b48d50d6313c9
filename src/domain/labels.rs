// ============================================================
// Domain - Label rules
// ============================================================
// A classification head with one output unit is a binary head
// (float targets, BCE-with-logits). Any wider head is a
// multi-class head (integer targets, cross-entropy).
//
// The same LabelKind is used when labels are turned into
// tensors and when the loss is chosen, so the target dtype
// always matches the loss.

use crate::error::{HarnessError, Result};

/// Placeholder label emitted for unlabeled (inference-only) examples.
pub const MISSING_LABEL: f32 = f32::NAN;

/// Binary scores at or above this value are predicted as class 1.
pub const BINARY_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    /// Single-logit head; labels are 0.0 / 1.0 floats.
    Binary,
    /// k-logit head; labels are class indices in 0..classes.
    MultiClass { classes: usize },
}

impl LabelKind {
    /// Resolve the label kind from the width of the classification head.
    pub fn from_head_width(width: usize) -> Self {
        if width == 1 {
            Self::Binary
        } else {
            Self::MultiClass { classes: width }
        }
    }

    /// Output width of the head built for `num_classes` classes.
    /// Two classes collapse to a single logit.
    pub fn head_width(num_classes: usize) -> usize {
        if num_classes == 2 {
            1
        } else {
            num_classes
        }
    }

    /// Convert a class label into the value stored in the batch.
    pub fn encode(&self, label: usize) -> Result<f32> {
        match *self {
            Self::Binary if label > 1 => Err(HarnessError::label(format!(
                "binary head expects labels 0 or 1, got {label}"
            ))),
            Self::MultiClass { classes } if label >= classes => Err(HarnessError::label(format!(
                "label {label} is out of range for a {classes}-class head"
            ))),
            _ => Ok(label as f32),
        }
    }
}

/// Inclusive threshold on a binary score.
pub fn binary_decision(score: f32) -> i64 {
    if score >= BINARY_THRESHOLD {
        1
    } else {
        0
    }
}
