// ============================================================
// encoder_tuner
// ============================================================
// Fine-tuning harness for a pretrained BERT-style encoder:
// pooling strategies, supervised (classification) training,
// triplet (metric-learning) training and batched inference
// with accuracy / macro-F1 evaluation.
//
// Layers:
//   domain      - labels, scores, articles, tokenizer seam
//   data        - preprocessing, batching, batch streams
//   ml          - encoder, pooling, losses, optimizer, loops,
//                 inference, EncoderTuner
//   infra       - checkpoints, tokenizer store, logs
//   application - end-to-end use cases

#![recursion_limit = "256"]

pub mod application;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod infra;
pub mod ml;

#[cfg(test)]
mod testing;

pub use config::TunerConfig;
pub use error::{HarnessError, Result};
pub use ml::{
    inferencer::{Evaluation, Output},
    pooling::PostOp,
    trainer::{TrainSettings, TrainingHistory},
    triplet::{TripletHistory, TripletSettings},
    tuner::EncoderTuner,
};

/// CPU inference backend.
pub type CpuBackend = burn::backend::NdArray;
/// CPU training backend.
pub type CpuTrainingBackend = burn::backend::Autodiff<CpuBackend>;

#[cfg(feature = "wgpu")]
pub type GpuBackend = burn::backend::Wgpu;
#[cfg(feature = "wgpu")]
pub type GpuTrainingBackend = burn::backend::Autodiff<GpuBackend>;
