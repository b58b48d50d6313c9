// ============================================================
// ML Layer (Burn)
// ============================================================
// All model, loss and training code.
//
//   encoder.rs    - BERT-style encoder (hidden states + pooled)
//   params.rs     - flat parameter names for decay groups
//   pooling.rs    - PostOp and the pooling functions
//   model.rs      - encoder + dropout + classification head
//   loss.rs       - BCE-with-logits, cross-entropy, triplet
//   optim.rs      - grouped AdamW + warmup-linear schedule
//   trainer.rs    - supervised loop with per-epoch evaluation
//   triplet.rs    - triplet loop over three streams
//   inferencer.rs - predictions, accuracy, macro-F1
//   tuner.rs      - EncoderTuner, the session wrapper

pub mod encoder;
pub mod inferencer;
pub mod loss;
pub mod model;
pub mod optim;
pub mod params;
pub mod pooling;
pub mod trainer;
pub mod triplet;
pub mod tuner;
