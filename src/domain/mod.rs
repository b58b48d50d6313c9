// ============================================================
// Domain Layer
// ============================================================
// Plain Rust types and rules with no burn tensors in sight:
// label kinds and thresholds, scoring, articles, and the
// tokenizer abstraction.
//
// Everything here is unit-testable without a backend.

/// Titled texts used to build embedding triplets
pub mod article;

/// Binary vs multi-class label rules
pub mod labels;

/// Accuracy and macro-F1
pub mod metrics;

/// Abstractions implemented by other layers
pub mod traits;
