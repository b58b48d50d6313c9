// ============================================================
// Application / Use Cases
// ============================================================
// Workflows built from the other layers: raw data in, a
// trained tuner out. No tensor code here; errors are anyhow
// with context for the caller.

/// Supervised fine-tuning from raw texts and labels
pub mod supervised_use_case;

/// Triplet training from a collection of articles
pub mod triplet_use_case;
