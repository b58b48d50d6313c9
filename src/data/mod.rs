// ============================================================
// Data Pipeline
// ============================================================
// Raw text all the way to device tensor batches:
//
//   texts (+ labels)
//       │
//       ▼
//   Preprocessor   → tokenise, truncate/pad, mask, type labels
//       │
//       ▼
//   TextDataset    → burn Dataset over EncodedText samples
//       │
//       ▼
//   TextBatcher    → stacks samples into TextBatch tensors
//       │
//       ▼
//   BatchStream    → restartable in-order DataLoader

/// Tokenisation, truncation/padding and mask derivation
pub mod preprocessor;

/// burn Dataset over encoded samples
pub mod dataset;

/// burn Batcher producing TextBatch tensors
pub mod batcher;

/// Fixed-size, restartable batch stream
pub mod stream;
