// ============================================================
// Domain - Core Traits
// ============================================================
// The tokenizer is an external collaborator. Everything that
// turns text into ids goes through this trait, so the
// preprocessing pipeline can be driven by a HuggingFace
// tokenizer in production and by a tiny in-memory tokenizer
// in tests.

use crate::error::Result;

// ─── SequenceTokenizer ────────────────────────────────────────────────────────
/// Maps text to token ids.
///
/// Implementations always add the model's special tokens and
/// never truncate or pad: the preprocessor owns that policy.
///
/// Implementations:
///   - tokenizers::Tokenizer (see infra::tokenizer_store)
pub trait SequenceTokenizer: Send + Sync {
    fn encode(&self, text: &str) -> Result<Vec<u32>>;
}
