// ============================================================
// Infra - Checkpoints
// ============================================================
// Saves and restores model state with burn's
// NamedMpkFileRecorder at full precision, so a reloaded model
// reproduces predictions exactly.
//
// Files:
//   <checkpoint>.mpk          - whole TextEncoderModel record
//   <encoder_dir>/config.json - encoder architecture (HF names)
//   <encoder_dir>/encoder.mpk - pretrained encoder weights (optional)
//
// The recorder always writes the `.mpk` extension, replacing
// whatever extension the given path had; loading applies the
// same rule, so the same path string round-trips.

use std::{
    fs,
    path::{Path, PathBuf},
};

use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
};

use crate::error::{HarnessError, Result};
use crate::ml::encoder::{BertEncoder, EncoderConfig};
use crate::ml::model::TextEncoderModel;

pub const ENCODER_CONFIG_FILE:  &str = "config.json";
pub const ENCODER_WEIGHTS_FILE: &str = "encoder.mpk";

type ModelRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

fn recorder() -> ModelRecorder {
    NamedMpkFileRecorder::<FullPrecisionSettings>::new()
}

// ─── Checkpoint path template ─────────────────────────────────────────────────
/// Per-epoch checkpoint path. `{}` or `{epoch}` is replaced with the
/// zero-based epoch index; a template without a placeholder gets
/// `_<epoch>` appended to the file stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointTemplate(String);

impl CheckpointTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if template.trim().is_empty() {
            return Err(HarnessError::config("checkpoint template must not be empty"));
        }
        Ok(Self(template))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn path_for(&self, epoch: usize) -> PathBuf {
        let epoch = epoch.to_string();
        if self.0.contains("{epoch}") {
            PathBuf::from(self.0.replace("{epoch}", &epoch))
        } else if self.0.contains("{}") {
            PathBuf::from(self.0.replace("{}", &epoch))
        } else {
            let path = Path::new(&self.0);
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let name = match path.extension() {
                Some(ext) => format!("{stem}_{epoch}.{}", ext.to_string_lossy()),
                None => format!("{stem}_{epoch}"),
            };
            path.with_file_name(name)
        }
    }

    /// Directory the checkpoints land in.
    pub fn dir(&self) -> PathBuf {
        match Path::new(&self.0).parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

// ─── Whole-model records ──────────────────────────────────────────────────────
pub fn save_model<B: Backend>(model: &TextEncoderModel<B>, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    recorder()
        .record(model.clone().into_record(), path.to_path_buf())
        .map_err(HarnessError::record)?;
    tracing::debug!("Saved model record to '{}'", path.display());
    Ok(())
}

/// Load a record into `model`. The architecture must match the one saved.
pub fn load_model<B: Backend>(
    model:  TextEncoderModel<B>,
    path:   &Path,
    device: &B::Device,
) -> Result<TextEncoderModel<B>> {
    let record = recorder()
        .load(path.to_path_buf(), device)
        .map_err(|e| {
            HarnessError::Record(format!("cannot load checkpoint '{}': {e:?}", path.display()))
        })?;
    tracing::debug!("Loaded model record from '{}'", path.display());
    Ok(model.load_record(record))
}

// ─── Encoder directory ────────────────────────────────────────────────────────
pub fn load_encoder_config(dir: &Path) -> Result<EncoderConfig> {
    let path = dir.join(ENCODER_CONFIG_FILE);
    let json = fs::read_to_string(&path).map_err(|e| {
        HarnessError::Record(format!("cannot read encoder config '{}': {e}", path.display()))
    })?;
    Ok(serde_json::from_str(&json)?)
}

/// Load pretrained encoder weights when the directory has them.
/// Returns the encoder unchanged (random init) otherwise.
pub fn load_encoder_weights<B: Backend>(
    encoder: BertEncoder<B>,
    dir:     &Path,
    device:  &B::Device,
) -> Result<BertEncoder<B>> {
    let path = dir.join(ENCODER_WEIGHTS_FILE);
    if !path.exists() {
        tracing::warn!(
            "No pretrained weights at '{}'; encoder starts from random init",
            path.display()
        );
        return Ok(encoder);
    }
    let record = recorder()
        .load(path.clone(), device)
        .map_err(|e| {
            HarnessError::Record(format!("cannot load encoder weights '{}': {e:?}", path.display()))
        })?;
    tracing::info!("Loaded pretrained encoder weights from '{}'", path.display());
    Ok(encoder.load_record(record))
}

/// Write `config.json` and `encoder.mpk` so the directory can seed a
/// later fresh load.
pub fn save_encoder<B: Backend>(
    encoder: &BertEncoder<B>,
    config:  &EncoderConfig,
    dir:     &Path,
) -> Result<()> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join(ENCODER_CONFIG_FILE), serde_json::to_string_pretty(config)?)?;
    recorder()
        .record(encoder.clone().into_record(), dir.join(ENCODER_WEIGHTS_FILE))
        .map_err(HarnessError::record)?;
    tracing::debug!("Saved encoder to '{}'", dir.display());
    Ok(())
}
