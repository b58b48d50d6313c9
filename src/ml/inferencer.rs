// ============================================================
// ML - Inference / Evaluation
// ============================================================
// Runs a model over a BatchStream under one PostOp:
//
//   Predict, 1-unit head → score >= 0.5 → class 1, else 0
//   Predict, k-unit head → arg-max over the k logits
//   Mean / Default / Cls → embeddings       [n, hidden]
//   Sequence             → hidden states    [n, seq, hidden]
//
// Callers pass an inference-mode model (`model.valid()`):
// dropout is off and no autodiff graph is recorded.
//
// Evaluation concatenates predictions and true labels over
// every batch, then scores accuracy and macro-F1.

use burn::prelude::*;

use crate::data::{batcher::Targets, stream::BatchStream};
use crate::domain::{
    labels::binary_decision,
    metrics::{accuracy, macro_f1},
};
use crate::error::{HarnessError, Result};
use crate::ml::model::TextEncoderModel;
use crate::ml::pooling::{Pooled, PostOp};

// ─── Output ───────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub enum Output<B: Backend> {
    /// One predicted class per example
    Classes(Vec<i64>),
    /// [n, hidden]
    Embeddings(Tensor<B, 2>),
    /// [n, seq_len, hidden]
    Sequences(Tensor<B, 3>),
}

impl<B: Backend> Output<B> {
    /// Join per-batch outputs along the example axis.
    pub fn concat(outputs: Vec<Self>) -> Result<Self> {
        let mut outputs = outputs.into_iter();
        let first = outputs
            .next()
            .ok_or_else(|| HarnessError::config("cannot predict over an empty stream"))?;

        match first {
            Self::Classes(mut classes) => {
                for output in outputs {
                    classes.extend(output.into_classes()?);
                }
                Ok(Self::Classes(classes))
            }
            Self::Embeddings(first) => {
                let mut parts = vec![first];
                for output in outputs {
                    match output {
                        Self::Embeddings(t) => parts.push(t),
                        _ => return Err(mixed_outputs()),
                    }
                }
                Ok(Self::Embeddings(Tensor::cat(parts, 0)))
            }
            Self::Sequences(first) => {
                let mut parts = vec![first];
                for output in outputs {
                    match output {
                        Self::Sequences(t) => parts.push(t),
                        _ => return Err(mixed_outputs()),
                    }
                }
                Ok(Self::Sequences(Tensor::cat(parts, 0)))
            }
        }
    }

    pub fn into_classes(self) -> Result<Vec<i64>> {
        match self {
            Self::Classes(classes) => Ok(classes),
            _ => Err(HarnessError::config("expected class predictions (post_op 'predict')")),
        }
    }

    pub fn into_embeddings(self) -> Result<Tensor<B, 2>> {
        match self {
            Self::Embeddings(t) => Ok(t),
            _ => Err(HarnessError::config("expected embeddings (post_op mean, default or cls)")),
        }
    }

    /// Number of examples covered.
    pub fn len(&self) -> usize {
        match self {
            Self::Classes(c)    => c.len(),
            Self::Embeddings(t) => t.dims()[0],
            Self::Sequences(t)  => t.dims()[0],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn mixed_outputs() -> HarnessError {
    HarnessError::config("batches produced different output kinds")
}

// ─── Prediction ───────────────────────────────────────────────────────────────
pub fn predict_batch<B: Backend>(
    model:          &TextEncoderModel<B>,
    input_ids:      Tensor<B, 2, Int>,
    attention_mask: Tensor<B, 2, Int>,
    post_op:        PostOp,
) -> Result<Output<B>> {
    match model.forward(input_ids, attention_mask, post_op)? {
        Pooled::Scores(scores) => {
            let scores = scores
                .into_data()
                .convert::<f32>()
                .to_vec::<f32>()
                .map_err(HarnessError::tensor_data)?;
            Ok(Output::Classes(scores.into_iter().map(binary_decision).collect()))
        }
        Pooled::Logits(logits) => {
            // argmax(1) returns [batch, 1]
            let classes = logits
                .argmax(1)
                .flatten::<1>(0, 1)
                .into_data()
                .convert::<i64>()
                .to_vec::<i64>()
                .map_err(HarnessError::tensor_data)?;
            Ok(Output::Classes(classes))
        }
        Pooled::Embedding(t) => Ok(Output::Embeddings(t)),
        Pooled::Sequence(t)  => Ok(Output::Sequences(t)),
    }
}

/// Lazily predict batch by batch.
pub fn predictions<'a, B: Backend>(
    model:   &'a TextEncoderModel<B>,
    stream:  &'a BatchStream<B>,
    post_op: PostOp,
) -> impl Iterator<Item = Result<Output<B>>> + 'a {
    stream
        .iter()
        .map(move |batch| predict_batch(model, batch.input_ids, batch.attention_mask, post_op))
}

/// Predict over the whole stream and concatenate.
pub fn predict<B: Backend>(
    model:   &TextEncoderModel<B>,
    stream:  &BatchStream<B>,
    post_op: PostOp,
) -> Result<Output<B>> {
    let outputs = predictions(model, stream, post_op).collect::<Result<Vec<_>>>()?;
    Output::concat(outputs)
}

// ─── Evaluation ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub accuracy: f64,
    pub macro_f1: f64,
}

/// True classes carried by a labeled batch.
pub fn target_classes<B: Backend>(targets: Targets<B>) -> Result<Vec<i64>> {
    match targets {
        Targets::Binary(t) => {
            let values = t
                .into_data()
                .convert::<f32>()
                .to_vec::<f32>()
                .map_err(HarnessError::tensor_data)?;
            Ok(values.into_iter().map(|v| v.round() as i64).collect())
        }
        Targets::Classes(t) => t
            .into_data()
            .convert::<i64>()
            .to_vec::<i64>()
            .map_err(HarnessError::tensor_data),
        Targets::Missing(_) => Err(HarnessError::MissingLabels),
    }
}

pub fn evaluate<B: Backend>(
    model:  &TextEncoderModel<B>,
    stream: &BatchStream<B>,
) -> Result<Evaluation> {
    let kind = stream.label_kind().ok_or(HarnessError::MissingLabels)?;
    if model.label_kind() != Some(kind) {
        return Err(HarnessError::label(format!(
            "stream labels are {kind:?} but the model head gives {:?}",
            model.label_kind()
        )));
    }

    let mut y_true = Vec::with_capacity(stream.len());
    let mut y_pred = Vec::with_capacity(stream.len());
    for batch in stream.iter() {
        y_true.extend(target_classes(batch.targets)?);
        let output = predict_batch(model, batch.input_ids, batch.attention_mask, PostOp::Predict)?;
        y_pred.extend(output.into_classes()?);
    }

    Ok(Evaluation {
        accuracy: accuracy(&y_true, &y_pred)?,
        macro_f1: macro_f1(&y_true, &y_pred)?,
    })
}
