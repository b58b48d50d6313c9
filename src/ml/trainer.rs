// ============================================================
// ML - Supervised Training Loop
// ============================================================
// Fine-tunes encoder + head on labeled batches.
//
//   Training uses B (an AutodiffBackend) for gradients.
//   model.valid() gives the same model on B::InnerBackend
//   (dropout off), so the validation stream is built on the
//   inner backend too.
//
// Per epoch:
//   1. forward with PostOp::Predict, loss by head width
//      (1 unit → BCE-with-logits, k units → cross-entropy)
//   2. backward, grouped AdamW step, schedule step
//   3. log the mean loss, optionally checkpoint
//   4. evaluate on the validation stream, log accuracy / F1
//
// Gradients are produced fresh by every backward pass, so
// there is nothing to clear between steps. No early stopping.

use burn::{
    module::AutodiffModule,
    optim::GradientsParams,
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::stream::BatchStream;
use crate::error::{HarnessError, Result};
use crate::infra::{
    checkpoint::{save_model, CheckpointTemplate},
    metrics::{EpochMetrics, MetricsLogger},
    run_log::RunLog,
};
use crate::ml::{
    inferencer::evaluate,
    loss::{classification_loss, LossKind},
    model::TextEncoderModel,
    optim::{setup_optimizer, OptimizerSpec, DEFAULT_WARMUP_FRACTION},
    pooling::PostOp,
};

#[derive(Debug, Clone)]
pub struct TrainSettings {
    pub epochs:          usize,
    /// Per-epoch checkpoint path template
    pub save:            Option<CheckpointTemplate>,
    pub lr:              f64,
    pub warmup:          bool,
    pub warmup_fraction: f64,
}

impl TrainSettings {
    pub fn new(epochs: usize, lr: f64) -> Self {
        Self { epochs, save: None, lr, warmup: false, warmup_fraction: DEFAULT_WARMUP_FRACTION }
    }

    pub fn with_save(mut self, save: CheckpointTemplate) -> Self {
        self.save = Some(save);
        self
    }

    pub fn with_warmup(mut self, warmup: bool) -> Self {
        self.warmup = warmup;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingHistory {
    /// Loss of every optimizer step, in order
    pub batch_losses: Vec<f64>,
    /// Mean loss per epoch
    pub epoch_losses: Vec<f64>,
    /// Validation accuracy per epoch
    pub accuracy:     Vec<f64>,
    /// Validation macro-F1 per epoch
    pub macro_f1:     Vec<f64>,
}

pub fn supervised_train<B: AutodiffBackend>(
    mut model:  TextEncoderModel<B>,
    train:      &BatchStream<B>,
    validation: &BatchStream<B::InnerBackend>,
    settings:   &TrainSettings,
    log:        &RunLog,
) -> Result<(TextEncoderModel<B>, TrainingHistory)> {
    let kind = model.label_kind().ok_or_else(|| {
        HarnessError::config("supervised training needs a classification head (set num_classes)")
    })?;
    let train_kind = train.label_kind().ok_or(HarnessError::MissingLabels)?;
    if train_kind != kind {
        return Err(HarnessError::label(format!(
            "training labels are {train_kind:?} but the model head gives {kind:?}"
        )));
    }
    let loss_kind = LossKind::from(kind);

    // ── Optimizer ─────────────────────────────────────────────────────────────
    let spec = OptimizerSpec {
        lr:              settings.lr,
        warmup:          settings.warmup,
        epochs:          Some(settings.epochs),
        batch_count:     Some(train.num_batches()),
        warmup_fraction: settings.warmup_fraction,
    };
    let mut optim = setup_optimizer(&model, &spec)?;

    let metrics = match &settings.save {
        Some(template) => Some(MetricsLogger::new(template.dir())?),
        None => None,
    };

    log.line(format!(
        "Start training: epochs={}, dropout={:?}, lr={}, warmup={}",
        settings.epochs,
        model.dropout_prob(),
        settings.lr,
        settings.warmup,
    ))?;

    let mut history = TrainingHistory::default();

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 0..settings.epochs {
        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;

        for batch in train.iter() {
            let output = model.forward(batch.input_ids, batch.attention_mask, PostOp::Predict)?;
            let loss   = classification_loss(loss_kind, output, batch.targets)?;

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            history.batch_losses.push(loss_val);
            loss_sum += loss_val;
            batches  += 1;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(model, grads);
        }

        let epoch_loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
        history.epoch_losses.push(epoch_loss);
        log.line(format!("Loss at epoch {epoch}: {epoch_loss}"))?;

        if let Some(template) = &settings.save {
            let path = template.path_for(epoch);
            save_model(&model, &path)?;
            log.line(format!("Model saved to {}", path.display()))?;
        }

        // ── Validation ────────────────────────────────────────────────────────
        let eval = evaluate(&model.valid(), validation)?;
        history.accuracy.push(eval.accuracy);
        history.macro_f1.push(eval.macro_f1);
        log.line(format!("Acc {} and macro f1 {}", eval.accuracy, eval.macro_f1))?;

        if let Some(metrics) = &metrics {
            metrics.log(&EpochMetrics::new(epoch, epoch_loss, eval.accuracy, eval.macro_f1))?;
        }
        tracing::debug!("Epoch {} done, lr now {}", epoch, optim.current_lr());
    }

    tracing::info!("Supervised training complete after {} epochs", settings.epochs);
    Ok((model, history))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::EncodedText;
    use crate::domain::labels::{LabelKind, MISSING_LABEL};
    use crate::ml::model::TextEncoderModelConfig;
    use crate::testing::{tiny_encoder_config, TestAutodiffBackend, TestBackend};

    fn samples(labels: &[f32]) -> Vec<EncodedText> {
        labels
            .iter()
            .enumerate()
            .map(|(i, &label)| EncodedText {
                input_ids:      vec![1, 10 + i as u32, 2, 0],
                attention_mask: vec![1, 1, 1, 0],
                length:         3,
                label,
            })
            .collect()
    }

    fn binary_model() -> TextEncoderModel<TestAutodiffBackend> {
        TextEncoderModelConfig::new(tiny_encoder_config())
            .with_num_classes(Some(2))
            .init(&Default::default())
    }

    #[test]
    fn test_binary_training_one_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path().join("log.txt"));
        let labels = [0.0, 1.0, 1.0, 0.0];
        let train = BatchStream::<TestAutodiffBackend>::new(
            samples(&labels), 2, Some(LabelKind::Binary), Default::default(),
        ).unwrap();
        let val = BatchStream::<TestBackend>::new(
            samples(&labels), 2, Some(LabelKind::Binary), Default::default(),
        ).unwrap();

        let (_, history) = supervised_train(
            binary_model(), &train, &val, &TrainSettings::new(1, 1e-3), &log,
        ).unwrap();

        assert_eq!(history.batch_losses.len(), 2);
        assert_eq!(history.epoch_losses.len(), 1);
        assert!(history.epoch_losses[0].is_finite());
        assert!((0.0..=1.0).contains(&history.accuracy[0]));
        assert!((0.0..=1.0).contains(&history.macro_f1[0]));

        let contents = std::fs::read_to_string(log.path()).unwrap();
        assert!(contents.starts_with("Start training: epochs=1, dropout=None,"));
        assert!(contents.contains("Loss at epoch 0:"));
        assert!(contents.contains("Acc "));
    }

    #[test]
    fn test_multiclass_training_saves_each_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path().join("log.txt"));
        let labels = [0.0, 1.0, 2.0];
        let kind = Some(LabelKind::MultiClass { classes: 3 });
        let train = BatchStream::<TestAutodiffBackend>::new(
            samples(&labels), 2, kind, Default::default(),
        ).unwrap();
        let val = BatchStream::<TestBackend>::new(
            samples(&labels), 2, kind, Default::default(),
        ).unwrap();
        let model = TextEncoderModelConfig::new(tiny_encoder_config())
            .with_num_classes(Some(3))
            .with_dropout(Some(0.1))
            .init::<TestAutodiffBackend>(&Default::default());

        let template = CheckpointTemplate::new(
            dir.path().join("ckpt_{epoch}.mpk").to_string_lossy().into_owned(),
        ).unwrap();
        let settings = TrainSettings::new(2, 1e-3).with_save(template).with_warmup(true);
        let (_, history) = supervised_train(model, &train, &val, &settings, &log).unwrap();

        assert_eq!(history.epoch_losses.len(), 2);
        assert!(dir.path().join("ckpt_0.mpk").exists());
        assert!(dir.path().join("ckpt_1.mpk").exists());
        let csv = std::fs::read_to_string(dir.path().join("metrics.csv")).unwrap();
        assert_eq!(csv.lines().count(), 3);
        let run_log = std::fs::read_to_string(log.path()).unwrap();
        assert!(run_log.contains("dropout=Some(0.1)"));
    }

    #[test]
    fn test_unlabeled_training_stream_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path().join("log.txt"));
        let train = BatchStream::<TestAutodiffBackend>::new(
            samples(&[MISSING_LABEL, MISSING_LABEL]), 2, None, Default::default(),
        ).unwrap();
        let val = BatchStream::<TestBackend>::new(
            samples(&[0.0, 1.0]), 2, Some(LabelKind::Binary), Default::default(),
        ).unwrap();
        let err = supervised_train(
            binary_model(), &train, &val, &TrainSettings::new(1, 1e-3), &log,
        ).unwrap_err();
        assert!(matches!(err, HarnessError::MissingLabels));
    }
}
