// ============================================================
// ML - Pooling Dispatcher
// ============================================================
// Converts raw encoder output into the representation a caller
// asked for:
//
//   PostOp::Sequence → hidden states            [batch, seq, hidden]
//   PostOp::Default  → encoder pooled summary   [batch, hidden]
//   PostOp::Cls      → hidden state at token 0  [batch, hidden]
//   PostOp::Mean     → masked mean over tokens  [batch, hidden]
//   PostOp::Predict  → classification head      [batch] or [batch, k]
//
// The Predict branch needs the head, so it is dispatched by the
// model (ml::model); everything else lives here.

use std::{fmt, str::FromStr};

use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostOp {
    #[default]
    Mean,
    Default,
    Cls,
    #[serde(rename = "none")]
    Sequence,
    Predict,
}

impl PostOp {
    /// Whether this mode yields one [batch, hidden] vector per example.
    pub fn is_embedding(&self) -> bool {
        matches!(self, Self::Mean | Self::Default | Self::Cls)
    }
}

impl FromStr for PostOp {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mean"    => Ok(Self::Mean),
            "default" => Ok(Self::Default),
            "cls"     => Ok(Self::Cls),
            "none"    => Ok(Self::Sequence),
            "predict" => Ok(Self::Predict),
            other => Err(HarnessError::config(format!(
                "invalid post_op '{other}'; must be one of: mean, default, cls, none, predict"
            ))),
        }
    }
}

impl fmt::Display for PostOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mean     => "mean",
            Self::Default  => "default",
            Self::Cls      => "cls",
            Self::Sequence => "none",
            Self::Predict  => "predict",
        };
        f.write_str(name)
    }
}

// ─── Pooled ───────────────────────────────────────────────────────────────────
/// Result of a forward pass under one PostOp.
#[derive(Debug, Clone)]
pub enum Pooled<B: Backend> {
    /// [batch, seq, hidden]
    Sequence(Tensor<B, 3>),
    /// [batch, hidden]
    Embedding(Tensor<B, 2>),
    /// [batch] scores from a single-logit head
    Scores(Tensor<B, 1>),
    /// [batch, k] logits from a k-logit head
    Logits(Tensor<B, 2>),
}

impl<B: Backend> Pooled<B> {
    pub fn into_embedding(self) -> Result<Tensor<B, 2>> {
        match self {
            Self::Embedding(t) => Ok(t),
            _ => Err(HarnessError::config(
                "expected a pooled embedding (mean, default or cls post_op)",
            )),
        }
    }
}

// ─── Pooling functions ────────────────────────────────────────────────────────
/// Hidden state of the first token of every sequence.
pub fn cls_pool<B: Backend>(hidden_states: Tensor<B, 3>) -> Tensor<B, 2> {
    let [batch_size, _, hidden] = hidden_states.dims();
    hidden_states
        .slice([0..batch_size, 0..1, 0..hidden])
        .reshape([batch_size, hidden])
}

/// Average of the hidden states at unmasked positions.
///
/// Fails with EmptySequence when an example has no unmasked token.
pub fn mean_pool<B: Backend>(
    hidden_states:  Tensor<B, 3>,
    attention_mask: Tensor<B, 2, Int>,
) -> Result<Tensor<B, 2>> {
    let [batch_size, seq_len, hidden] = hidden_states.dims();
    let mask = attention_mask.float();

    // [batch, 1]
    let counts = mask.clone().sum_dim(1);
    let count_values = counts
        .clone()
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(HarnessError::tensor_data)?;
    if let Some(index) = count_values.iter().position(|&c| c <= 0.0) {
        return Err(HarnessError::EmptySequence { index });
    }

    let expanded = mask
        .unsqueeze_dim::<3>(2)
        .expand([batch_size, seq_len, hidden]);
    let summed = (hidden_states * expanded)
        .sum_dim(1)
        .reshape([batch_size, hidden]);

    Ok(summed / counts.expand([batch_size, hidden]))
}
