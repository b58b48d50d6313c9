// ============================================================
// ML - Triplet Training Loop
// ============================================================
// Metric learning on (anchor, positive, negative) text triples:
//
//   loss = mean(max(‖a - p‖ - ‖a - n‖ + 1.0, 0))
//
// The three streams are read in lockstep and every epoch stops
// at the end of the shortest one. Embeddings come from a
// pooling mode that yields one vector per text (mean, default
// or cls). There is no evaluation phase.

use burn::{
    optim::GradientsParams,
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::{batcher::TextBatch, stream::BatchStream};
use crate::error::{HarnessError, Result};
use crate::infra::{
    checkpoint::{save_model, CheckpointTemplate},
    run_log::RunLog,
};
use crate::ml::{
    loss::{triplet_margin_loss, TRIPLET_MARGIN},
    model::TextEncoderModel,
    optim::{setup_optimizer, OptimizerSpec, DEFAULT_WARMUP_FRACTION},
    pooling::PostOp,
};

#[derive(Debug, Clone)]
pub struct TripletSettings {
    pub epochs:          usize,
    pub post_op:         PostOp,
    pub save:            Option<CheckpointTemplate>,
    pub lr:              f64,
    pub warmup:          bool,
    pub warmup_fraction: f64,
}

impl TripletSettings {
    pub fn new(epochs: usize, lr: f64) -> Self {
        Self {
            epochs,
            post_op: PostOp::Mean,
            save: None,
            lr,
            warmup: false,
            warmup_fraction: DEFAULT_WARMUP_FRACTION,
        }
    }

    pub fn with_post_op(mut self, post_op: PostOp) -> Self {
        self.post_op = post_op;
        self
    }

    pub fn with_save(mut self, save: CheckpointTemplate) -> Self {
        self.save = Some(save);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripletHistory {
    pub batch_losses:    Vec<f64>,
    pub epoch_losses:    Vec<f64>,
    /// Batches processed per epoch (the shortest stream's length)
    pub steps_per_epoch: usize,
}

pub fn triplet_train<B: AutodiffBackend>(
    mut model: TextEncoderModel<B>,
    anchor:    &BatchStream<B>,
    positive:  &BatchStream<B>,
    negative:  &BatchStream<B>,
    settings:  &TripletSettings,
    log:       &RunLog,
) -> Result<(TextEncoderModel<B>, TripletHistory)> {
    if !settings.post_op.is_embedding() {
        return Err(HarnessError::config(format!(
            "triplet training needs an embedding post_op (mean, default or cls), got '{}'",
            settings.post_op
        )));
    }

    let batch_count = anchor
        .num_batches()
        .min(positive.num_batches())
        .min(negative.num_batches());
    let lengths = [anchor.num_batches(), positive.num_batches(), negative.num_batches()];
    if lengths.iter().any(|&len| len != batch_count) {
        tracing::warn!(
            "Triplet streams differ in length ({}/{}/{} batches); using {} per epoch",
            lengths[0],
            lengths[1],
            lengths[2],
            batch_count
        );
    }

    let spec = OptimizerSpec {
        lr:              settings.lr,
        warmup:          settings.warmup,
        epochs:          Some(settings.epochs),
        batch_count:     Some(batch_count),
        warmup_fraction: settings.warmup_fraction,
    };
    let mut optim = setup_optimizer(&model, &spec)?;

    log.line(format!(
        "Start triplet training: epochs={}, post_op={}, lr={}",
        settings.epochs, settings.post_op, settings.lr,
    ))?;

    let mut history = TripletHistory { steps_per_epoch: batch_count, ..Default::default() };

    for epoch in 0..settings.epochs {
        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;

        let triples = anchor.iter().zip(positive.iter()).zip(negative.iter());
        for ((a, p), n) in triples {
            // A short final batch trims its partners to the same rows
            let rows = a.input_ids.dims()[0]
                .min(p.input_ids.dims()[0])
                .min(n.input_ids.dims()[0]);

            let a = embed(&model, a, rows, settings.post_op)?;
            let p = embed(&model, p, rows, settings.post_op)?;
            let n = embed(&model, n, rows, settings.post_op)?;
            let loss = triplet_margin_loss(a, p, n, TRIPLET_MARGIN);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            history.batch_losses.push(loss_val);
            loss_sum += loss_val;
            batches  += 1;

            let grads = GradientsParams::from_grads(loss.backward(), &model);
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
    }

    tracing::info!("Triplet training complete after {} epochs", settings.epochs);
    Ok((model, history))
}

fn embed<B: AutodiffBackend>(
    model:   &TextEncoderModel<B>,
    batch:   TextBatch<B>,
    rows:    usize,
    post_op: PostOp,
) -> Result<Tensor<B, 2>> {
    let [batch_size, seq_len] = batch.input_ids.dims();
    let (ids, mask) = if rows < batch_size {
        (
            batch.input_ids.slice([0..rows, 0..seq_len]),
            batch.attention_mask.slice([0..rows, 0..seq_len]),
        )
    } else {
        (batch.input_ids, batch.attention_mask)
    };
    model.forward(ids, mask, post_op)?.into_embedding()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::EncodedText;
    use crate::domain::labels::MISSING_LABEL;
    use crate::ml::model::TextEncoderModelConfig;
    use crate::testing::{tiny_encoder_config, TestAutodiffBackend};

    fn stream(n: usize, offset: u32) -> BatchStream<TestAutodiffBackend> {
        let samples = (0..n)
            .map(|i| EncodedText {
                input_ids:      vec![1, offset + i as u32, 2, 0],
                attention_mask: vec![1, 1, 1, 0],
                length:         3,
                label:          MISSING_LABEL,
            })
            .collect();
        BatchStream::new(samples, 2, None, Default::default()).unwrap()
    }

    fn model() -> TextEncoderModel<TestAutodiffBackend> {
        TextEncoderModelConfig::new(tiny_encoder_config()).init(&Default::default())
    }

    #[test]
    fn test_stops_at_shortest_stream() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path().join("log.txt"));
        // 5, 5 and 3 batches of two
        let (a, p, n) = (stream(10, 10), stream(10, 30), stream(6, 50));

        let (_, history) = triplet_train(
            model(), &a, &p, &n, &TripletSettings::new(2, 1e-3), &log,
        ).unwrap();

        assert_eq!(history.steps_per_epoch, 3);
        assert_eq!(history.batch_losses.len(), 6);
        assert_eq!(history.epoch_losses.len(), 2);
        assert!(history.epoch_losses.iter().all(|l| l.is_finite() && *l >= 0.0));

        // 5, 5 and 3 batches where the last negative batch holds one row
        let (a, p, n) = (stream(10, 10), stream(10, 30), stream(5, 50));
        let (_, history) = triplet_train(
            model(), &a, &p, &n, &TripletSettings::new(1, 1e-3), &log,
        ).unwrap();
        assert_eq!(history.steps_per_epoch, 3);
        assert_eq!(history.batch_losses.len(), 3);
        assert!(history.batch_losses.iter().all(|l| l.is_finite()));
    }

    #[test]
    fn test_longer_positive_stream_is_cut() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path().join("log.txt"));
        // 3, 5 and 3 batches of two
        let (a, p, n) = (stream(6, 10), stream(10, 30), stream(6, 50));
        let (_, history) = triplet_train(
            model(), &a, &p, &n, &TripletSettings::new(1, 1e-3), &log,
        ).unwrap();
        assert_eq!(history.steps_per_epoch, 3);
        assert_eq!(history.batch_losses.len(), 3);
    }

    #[test]
    fn test_non_embedding_post_op_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path().join("log.txt"));
        let s = stream(2, 10);
        for op in [PostOp::Sequence, PostOp::Predict] {
            let settings = TripletSettings::new(1, 1e-3).with_post_op(op);
            let err = triplet_train(model(), &s, &s, &s, &settings, &log).unwrap_err();
            assert!(matches!(err, HarnessError::Config(_)));
        }
    }

    #[test]
    fn test_checkpoint_per_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path().join("log.txt"));
        let s = stream(2, 10);
        let template = CheckpointTemplate::new(
            dir.path().join("triplet_{}.mpk").to_string_lossy().into_owned(),
        ).unwrap();
        let settings = TripletSettings::new(1, 1e-3)
            .with_post_op(PostOp::Cls)
            .with_save(template);
        triplet_train(model(), &s, &s, &s, &settings, &log).unwrap();
        assert!(dir.path().join("triplet_0.mpk").exists());
    }
}
