// ============================================================
// Infra - Tokenizer Store
// ============================================================
// Loads `tokenizer.json` (HuggingFace format) from a directory,
// or builds a word-level BERT-style tokenizer from a corpus and
// saves it there.
//
// In tokenizers 0.15, train_from_files requires Trainer::Model
// to equal ModelWrapper, so the vocabulary is counted here and
// the tokenizer JSON is written directly, then loaded back.
//
// The built tokenizer always wraps a sequence as
//   [CLS] tokens... [SEP]
// through a BertProcessing post-processor.

use std::{
    collections::HashMap,
    fs,
    ops::Deref,
    path::{Path, PathBuf},
};

use tokenizers::Tokenizer;

use crate::domain::traits::SequenceTokenizer;
use crate::error::{HarnessError, Result};

pub const TOKENIZER_FILE: &str = "tokenizer.json";

pub const PAD_TOKEN_ID:  u32 = 0;
pub const UNK_TOKEN_ID:  u32 = 1;
pub const CLS_TOKEN_ID:  u32 = 101;
pub const SEP_TOKEN_ID:  u32 = 102;
pub const MASK_TOKEN_ID: u32 = 103;

const FIRST_WORD_ID: usize = 104;

impl SequenceTokenizer for Tokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .deref()
            .encode(text, true)
            .map_err(|e| HarnessError::Tokenizer(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }
}

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    /// Load the existing tokenizer or build a new one from `texts`.
    pub fn load_or_build(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        if self.path().exists() {
            tracing::info!("Loading existing tokenizer from disk");
            self.load()
        } else {
            tracing::info!("Building new tokenizer (vocab_size={})", vocab_size);
            self.build_and_save(texts, vocab_size)
        }
    }

    pub fn load(&self) -> Result<Tokenizer> {
        load_tokenizer(&self.path())
    }

    fn build_and_save(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        fs::create_dir_all(&self.dir)?;

        // ── Step 1: Count words ───────────────────────────────────────────────
        let mut freq: HashMap<String, usize> = HashMap::new();
        for text in texts {
            for word in text.split_whitespace() {
                let w = word.to_lowercase();
                let w = w.trim_matches(|c: char| !c.is_alphanumeric());
                if !w.is_empty() {
                    *freq.entry(w.to_string()).or_insert(0) += 1;
                }
            }
        }

        // Most frequent first, ties alphabetical so ids are reproducible
        let mut words: Vec<(String, usize)> = freq.into_iter().collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        // Every id must stay below vocab_size
        words.truncate(vocab_size.saturating_sub(FIRST_WORD_ID));

        // ── Step 2: Vocabulary ────────────────────────────────────────────────
        let mut vocab = serde_json::json!({
            "[PAD]":  PAD_TOKEN_ID,
            "[UNK]":  UNK_TOKEN_ID,
            "[CLS]":  CLS_TOKEN_ID,
            "[SEP]":  SEP_TOKEN_ID,
            "[MASK]": MASK_TOKEN_ID,
        });
        let mut next_id = FIRST_WORD_ID;
        for (word, _) in &words {
            if vocab.get(word).is_none() {
                vocab[word] = serde_json::json!(next_id);
                next_id += 1;
            }
        }

        // ── Step 3: Tokenizer JSON ────────────────────────────────────────────
        let special = |id: u32, content: &str| {
            serde_json::json!({
                "id": id, "content": content, "single_word": false,
                "lstrip": false, "rstrip": false, "normalized": false, "special": true
            })
        };
        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [
                special(PAD_TOKEN_ID, "[PAD]"),
                special(UNK_TOKEN_ID, "[UNK]"),
                special(CLS_TOKEN_ID, "[CLS]"),
                special(SEP_TOKEN_ID, "[SEP]"),
                special(MASK_TOKEN_ID, "[MASK]"),
            ],
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": true,
                "strip_accents": null,
                "lowercase": true
            },
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": {
                "type": "BertProcessing",
                "sep": ["[SEP]", SEP_TOKEN_ID],
                "cls": ["[CLS]", CLS_TOKEN_ID]
            },
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": "[UNK]"
            }
        });

        let path = self.path();
        fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)?;
        tracing::info!(
            "Tokenizer built with {} words, saved to '{}'",
            words.len(),
            path.display()
        );

        load_tokenizer(&path)
    }
}

/// Load a HuggingFace `tokenizer.json`.
pub fn load_tokenizer(path: &Path) -> Result<Tokenizer> {
    Tokenizer::from_file(path).map_err(|e| {
        HarnessError::Tokenizer(format!("cannot load tokenizer from '{}': {e}", path.display()))
    })
}
