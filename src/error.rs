// ============================================================
// Error taxonomy
// ============================================================
// Every fallible library operation returns HarnessError.
// The application layer wraps these in anyhow with context.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarnessError>;

#[derive(Debug, Error)]
pub enum HarnessError {
    /// Invalid settings: unknown post-op, warmup without step counts,
    /// zero batch size, predict without a classification head, ...
    #[error("configuration error: {0}")]
    Config(String),

    /// Mean pooling hit an example whose attention mask is all zeros.
    #[error("mean pooling over an empty sequence (example {index} has no unmasked tokens)")]
    EmptySequence { index: usize },

    /// Label count, range or dtype does not fit the classification head.
    #[error("label error: {0}")]
    Label(String),

    /// A loss or an evaluation was requested on an unlabeled batch.
    #[error("batch carries placeholder labels; it cannot be used for loss or evaluation")]
    MissingLabels,

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// Burn recorder / config loading failures.
    #[error("record error: {0}")]
    Record(String),

    /// Reading tensor data back to the host failed.
    #[error("tensor data error: {0}")]
    TensorData(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl HarnessError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn label(msg: impl Into<String>) -> Self {
        Self::Label(msg.into())
    }

    pub fn record(err: impl std::fmt::Debug) -> Self {
        Self::Record(format!("{err:?}"))
    }

    pub fn tensor_data(err: impl std::fmt::Debug) -> Self {
        Self::TensorData(format!("{err:?}"))
    }
}
