// ============================================================
// Application - Supervised fine-tuning from raw data
// ============================================================
// Orchestrates a classification run in order:
//
//   Step 1: Tokenise + batch the training texts   (data)
//   Step 2: Tokenise + batch the validation texts (data)
//   Step 3: Run the supervised loop               (ml)

use anyhow::{Context, Result};
use burn::tensor::backend::AutodiffBackend;

use crate::ml::{
    trainer::{TrainSettings, TrainingHistory},
    tuner::EncoderTuner,
};

/// Raw texts and class labels for one split.
pub struct LabeledTexts<'a, S: AsRef<str>> {
    pub texts:  &'a [S],
    pub labels: &'a [usize],
}

pub fn supervised_train_data<B: AutodiffBackend, S: AsRef<str>>(
    tuner:      &mut EncoderTuner<B>,
    train:      LabeledTexts<'_, S>,
    validation: LabeledTexts<'_, S>,
    batch_size: usize,
    settings:   &TrainSettings,
) -> Result<TrainingHistory> {
    // ── Step 1: Training batches ──────────────────────────────────────────────
    let train_stream = tuner
        .preprocess(train.texts, Some(train.labels), batch_size)
        .context("Failed to preprocess training data")?;

    // ── Step 2: Validation batches ────────────────────────────────────────────
    let val_stream = tuner
        .preprocess_eval(validation.texts, Some(validation.labels), batch_size)
        .context("Failed to preprocess validation data")?;

    tracing::info!(
        "Training: {} examples in {} batches, validation: {} examples",
        train_stream.len(),
        train_stream.num_batches(),
        val_stream.len(),
    );

    // ── Step 3: Train ─────────────────────────────────────────────────────────
    let history = tuner
        .supervised_train(&train_stream, &val_stream, settings)
        .context("Supervised training failed")?;
    Ok(history)
}
