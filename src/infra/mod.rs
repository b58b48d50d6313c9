// ============================================================
// Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by the training loops and the
// tuner but not part of any one of them:
//
//   checkpoint.rs      - model / encoder records on disk
//                        (NamedMpkFileRecorder, full precision)
//   tokenizer_store.rs - load or build tokenizer.json
//   run_log.rs         - append-only run log with console echo
//   metrics.rs         - per-epoch metrics CSV
//   logging.rs         - tracing subscriber setup

pub mod checkpoint;
pub mod logging;
pub mod metrics;
pub mod run_log;
pub mod tokenizer_store;
