// ============================================================
// ML - EncoderTuner
// ============================================================
// Owns everything a tuning session needs:
//   model        - TextEncoderModel<B>, B an AutodiffBackend
//   tokenizer    - any SequenceTokenizer
//   preprocessor - truncation / padding to max_len
//   device       - explicit handle passed to every tensor
//   run log      - append-only milestones
//
// Training streams live on B. Validation and prediction
// streams live on B::InnerBackend, where `model.valid()` runs
// without dropout and without an autodiff graph.

use std::{path::Path, sync::Arc};

use burn::{
    module::AutodiffModule,
    optim::Optimizer,
    tensor::backend::AutodiffBackend,
};

use crate::config::TunerConfig;
use crate::data::{preprocessor::Preprocessor, stream::BatchStream};
use crate::domain::traits::SequenceTokenizer;
use crate::error::{HarnessError, Result};
use crate::infra::{
    checkpoint::{load_encoder_config, load_encoder_weights, load_model, save_model},
    run_log::RunLog,
};
use crate::ml::{
    encoder::EncoderConfig,
    inferencer::{self, Evaluation, Output},
    model::{TextEncoderModel, TextEncoderModelConfig},
    optim::{self, OptimizerSetup, OptimizerSpec},
    pooling::PostOp,
    trainer::{self, TrainSettings, TrainingHistory},
    triplet::{self, TripletHistory, TripletSettings},
};

pub struct EncoderTuner<B: AutodiffBackend> {
    model:        TextEncoderModel<B>,
    model_config: TextEncoderModelConfig,
    tokenizer:    Arc<dyn SequenceTokenizer>,
    preprocessor: Preprocessor,
    device:       B::Device,
    log:          RunLog,
}

impl<B: AutodiffBackend> EncoderTuner<B> {
    /// Build a tuner around a randomly initialised model.
    pub fn new(
        encoder:   EncoderConfig,
        tokenizer: Arc<dyn SequenceTokenizer>,
        config:    &TunerConfig,
        device:    B::Device,
    ) -> Result<Self> {
        config.validate()?;
        if config.max_len > encoder.max_position_embeddings {
            return Err(HarnessError::config(format!(
                "max_len {} exceeds the encoder's {} positions",
                config.max_len, encoder.max_position_embeddings
            )));
        }

        let model_config = TextEncoderModelConfig::new(encoder)
            .with_num_classes(config.num_classes)
            .with_dropout(config.dropout);
        model_config.validate()?;
        let model = model_config.init::<B>(&device);

        tracing::info!(
            "Model ready: {} layers, hidden={}, head={:?}",
            model_config.encoder.num_hidden_layers,
            model_config.encoder.hidden_size,
            model.head_width(),
        );

        let preprocessor = Preprocessor::new(config.max_len)?
            .with_vocab_size(model_config.encoder.vocab_size);

        Ok(Self {
            model,
            model_config,
            tokenizer,
            preprocessor,
            device,
            log: RunLog::new(&config.log_file),
        })
    }

    /// Encoder architecture (and pretrained weights when present) from
    /// `encoder_dir`; fresh head and dropout per `config`.
    pub fn fresh_load(
        encoder_dir: impl AsRef<Path>,
        tokenizer:   Arc<dyn SequenceTokenizer>,
        config:      &TunerConfig,
        device:      B::Device,
    ) -> Result<Self> {
        let dir = encoder_dir.as_ref();
        let encoder = load_encoder_config(dir)?;
        let mut tuner = Self::new(encoder, tokenizer, config, device)?;
        tuner.model.encoder = load_encoder_weights(tuner.model.encoder, dir, &tuner.device)?;
        Ok(tuner)
    }

    /// `fresh_load`, then the fine-tuned checkpoint on top.
    pub fn from_pretrained(
        checkpoint:  impl AsRef<Path>,
        encoder_dir: impl AsRef<Path>,
        tokenizer:   Arc<dyn SequenceTokenizer>,
        config:      &TunerConfig,
        device:      B::Device,
    ) -> Result<Self> {
        let mut tuner = Self::fresh_load(encoder_dir, tokenizer, config, device)?;
        tuner.load(checkpoint)?;
        Ok(tuner)
    }

    // ── Preprocessing ─────────────────────────────────────────────────────────
    /// Batches for training, on the autodiff backend.
    pub fn preprocess<S: AsRef<str>>(
        &self,
        texts:      &[S],
        labels:     Option<&[usize]>,
        batch_size: usize,
    ) -> Result<BatchStream<B>> {
        let samples = self.preprocessor.encode_all(
            self.tokenizer.as_ref(), texts, labels, self.model.label_kind(),
        )?;
        BatchStream::new(samples, batch_size, self.model.label_kind(), self.device.clone())
    }

    /// Batches for validation and prediction, on the inner backend.
    pub fn preprocess_eval<S: AsRef<str>>(
        &self,
        texts:      &[S],
        labels:     Option<&[usize]>,
        batch_size: usize,
    ) -> Result<BatchStream<B::InnerBackend>> {
        let samples = self.preprocessor.encode_all(
            self.tokenizer.as_ref(), texts, labels, self.model.label_kind(),
        )?;
        BatchStream::new(samples, batch_size, self.model.label_kind(), self.device.clone())
    }

    // ── Training ──────────────────────────────────────────────────────────────
    pub fn setup_optimizer(
        &self,
        spec: &OptimizerSpec,
    ) -> Result<OptimizerSetup<B, impl Optimizer<TextEncoderModel<B>, B>>> {
        optim::setup_optimizer(&self.model, spec)
    }

    pub fn supervised_train(
        &mut self,
        train:      &BatchStream<B>,
        validation: &BatchStream<B::InnerBackend>,
        settings:   &TrainSettings,
    ) -> Result<TrainingHistory> {
        let (model, history) = trainer::supervised_train(
            self.model.clone(), train, validation, settings, &self.log,
        )?;
        self.model = model;
        Ok(history)
    }

    pub fn triplet_train(
        &mut self,
        anchor:   &BatchStream<B>,
        positive: &BatchStream<B>,
        negative: &BatchStream<B>,
        settings: &TripletSettings,
    ) -> Result<TripletHistory> {
        let (model, history) = triplet::triplet_train(
            self.model.clone(), anchor, positive, negative, settings, &self.log,
        )?;
        self.model = model;
        Ok(history)
    }

    // ── Inference ─────────────────────────────────────────────────────────────
    pub fn pred(
        &self,
        stream:  &BatchStream<B::InnerBackend>,
        post_op: PostOp,
    ) -> Result<Output<B::InnerBackend>> {
        inferencer::predict(&self.model.valid(), stream, post_op)
    }

    /// Lazy per-batch variant of `pred`.
    pub fn pred_batches<'a>(
        &self,
        stream:  &'a BatchStream<B::InnerBackend>,
        post_op: PostOp,
    ) -> impl Iterator<Item = Result<Output<B::InnerBackend>>> + 'a {
        let model = self.model.valid();
        stream.iter().map(move |batch| {
            inferencer::predict_batch(&model, batch.input_ids, batch.attention_mask, post_op)
        })
    }

    pub fn evaluate(&self, stream: &BatchStream<B::InnerBackend>) -> Result<Evaluation> {
        inferencer::evaluate(&self.model.valid(), stream)
    }

    // ── Persistence ───────────────────────────────────────────────────────────
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_model(&self.model, path.as_ref())
    }

    /// Replace the model state with a saved record of the same architecture.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.model = load_model(self.model.clone(), path, &self.device)?;
        tracing::info!("Model state loaded from '{}'", path.display());
        Ok(())
    }

    // ── Accessors ─────────────────────────────────────────────────────────────
    pub fn model(&self) -> &TextEncoderModel<B> {
        &self.model
    }

    pub fn model_config(&self) -> &TextEncoderModelConfig {
        &self.model_config
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    pub fn max_len(&self) -> usize {
        self.preprocessor.max_len()
    }

    pub fn log(&self) -> &RunLog {
        &self.log
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::prelude::*;
    use crate::infra::checkpoint::save_encoder;
    use crate::testing::{tiny_encoder_config, TestAutodiffBackend, TestBackend, WordTokenizer};

    fn config(dir: &Path, num_classes: Option<usize>) -> TunerConfig {
        TunerConfig {
            max_len: 8,
            num_classes,
            log_file: dir.join("log.txt").to_string_lossy().into_owned(),
            ..Default::default()
        }
    }

    fn tuner(dir: &Path, num_classes: Option<usize>) -> EncoderTuner<TestAutodiffBackend> {
        EncoderTuner::new(
            tiny_encoder_config(),
            Arc::new(WordTokenizer::new(50)),
            &config(dir, num_classes),
            Default::default(),
        ).unwrap()
    }

    fn texts() -> Vec<&'static str> {
        vec!["good film", "bad film", "great plot and cast", "dull"]
    }

    #[test]
    fn test_preprocess_shapes_and_masks() {
        let dir = tempfile::tempdir().unwrap();
        let t = tuner(dir.path(), Some(2));
        let stream = t.preprocess(&texts(), Some(&[1, 0, 1, 0]), 4).unwrap();
        let batch = stream.iter().next().unwrap();
        assert_eq!(batch.input_ids.dims(), [4, 8]);
        assert_eq!(batch.attention_mask.dims(), [4, 8]);
        // "dull" plus the two special tokens
        let ones: i64 = batch
            .attention_mask
            .slice([3..4, 0..8])
            .sum()
            .into_scalar()
            .elem::<i64>();
        assert_eq!(ones, 3);
    }

    struct WideTokenizer;

    impl SequenceTokenizer for WideTokenizer {
        fn encode(&self, _text: &str) -> Result<Vec<u32>> {
            Ok(vec![1, 900, 2])
        }
    }

    #[test]
    fn test_token_ids_beyond_encoder_vocab_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let t = EncoderTuner::<TestAutodiffBackend>::new(
            tiny_encoder_config(), Arc::new(WideTokenizer), &config(dir.path(), None), Default::default(),
        ).unwrap();
        let err = t.preprocess_eval(&["anything"], None, 2).unwrap_err();
        assert!(matches!(err, HarnessError::Tokenizer(_)));
    }

    #[test]
    fn test_max_len_beyond_positions_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TunerConfig { max_len: 4096, ..config(dir.path(), None) };
        let result = EncoderTuner::<TestAutodiffBackend>::new(
            tiny_encoder_config(), Arc::new(WordTokenizer::new(50)), &cfg, Default::default(),
        );
        assert!(matches!(result, Err(HarnessError::Config(_))));
    }

    #[test]
    fn test_binary_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = tuner(dir.path(), Some(2));
        let labels = [1, 0, 1, 0];
        let train = t.preprocess(&texts(), Some(&labels), 2).unwrap();
        let val = t.preprocess_eval(&texts(), Some(&labels), 2).unwrap();
        assert_eq!(train.num_batches(), 2);

        let history = t.supervised_train(&train, &val, &TrainSettings::new(1, 1e-3)).unwrap();
        assert_eq!(history.batch_losses.len(), 2);
        assert_eq!(history.epoch_losses.len(), 1);
        let eval = t.evaluate(&val).unwrap();
        assert!((0.0..=1.0).contains(&eval.accuracy));
    }

    #[test]
    fn test_save_load_reproduces_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.mpk");
        let saved = tuner(dir.path(), Some(3));
        saved.save(&path).unwrap();

        let mut restored = tuner(dir.path(), Some(3));
        restored.load(&path).unwrap();

        let stream = saved.preprocess_eval(&texts(), None, 3).unwrap();
        let before = saved.pred(&stream, PostOp::Mean).unwrap().into_embeddings().unwrap();
        let after  = restored.pred(&stream, PostOp::Mean).unwrap().into_embeddings().unwrap();
        let before = before.into_data().to_vec::<f32>().unwrap();
        let after  = after.into_data().to_vec::<f32>().unwrap();
        assert_eq!(before, after);

        let classes_before = saved.pred(&stream, PostOp::Predict).unwrap().into_classes().unwrap();
        let classes_after  = restored.pred(&stream, PostOp::Predict).unwrap().into_classes().unwrap();
        assert_eq!(classes_before, classes_after);
    }

    #[test]
    fn test_fresh_load_uses_pretrained_encoder() {
        let dir = tempfile::tempdir().unwrap();
        let encoder_dir = dir.path().join("encoder");
        let encoder_config = tiny_encoder_config();
        let encoder = encoder_config.init::<TestBackend>(&Default::default());
        save_encoder(&encoder, &encoder_config, &encoder_dir).unwrap();

        let t = EncoderTuner::<TestAutodiffBackend>::fresh_load(
            &encoder_dir,
            Arc::new(WordTokenizer::new(50)),
            &config(dir.path(), None),
            Default::default(),
        ).unwrap();
        let expected = encoder.pooler.weight.val().into_data().to_vec::<f32>().unwrap();
        let actual = t.model().encoder.pooler.weight.val().into_data().to_vec::<f32>().unwrap();
        assert_eq!(expected, actual);
    }

    #[test]
    fn test_pred_batches_is_lazy_per_batch() {
        let dir = tempfile::tempdir().unwrap();
        let t = tuner(dir.path(), None);
        let stream = t.preprocess_eval(&texts(), None, 3).unwrap();
        let sizes: Vec<usize> = t
            .pred_batches(&stream, PostOp::Sequence)
            .map(|o| o.unwrap().len())
            .collect();
        assert_eq!(sizes, vec![3, 1]);
    }

    #[test]
    fn test_labels_without_head_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let t = tuner(dir.path(), None);
        let result = t.preprocess(&texts(), Some(&[0, 1, 0, 1]), 2);
        assert!(matches!(result, Err(HarnessError::Label(_))));
    }
}
