// ============================================================
// Tuner Configuration
// ============================================================
// All knobs of a tuning run. Serialisable so a run can be
// described in (and reloaded from) a JSON file; any missing
// field takes its default.
//
//   {
//     "max_len": 128,
//     "num_classes": 2,
//     "post_op": "mean",
//     "save": "checkpoints/model_{epoch}.mpk"
//   }

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};
use crate::infra::checkpoint::CheckpointTemplate;
use crate::ml::{
    optim::DEFAULT_WARMUP_FRACTION,
    pooling::PostOp,
    trainer::TrainSettings,
    triplet::TripletSettings,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    pub max_len:         usize,
    pub batch_size:      usize,
    pub epochs:          usize,
    pub lr:              f64,
    pub warmup:          bool,
    pub warmup_fraction: f64,
    /// None → no classification head (embedding use only)
    pub num_classes:     Option<usize>,
    /// Dropout before the head; None → no dropout layer
    pub dropout:         Option<f64>,
    /// One of: mean, default, cls, none, predict
    pub post_op:         String,
    /// Per-epoch checkpoint template, `{epoch}` or `{}` → epoch index
    pub save:            Option<String>,
    pub log_file:        String,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            max_len:         512,
            batch_size:      8,
            epochs:          4,
            lr:              3e-5,
            warmup:          false,
            warmup_fraction: DEFAULT_WARMUP_FRACTION,
            num_classes:     None,
            dropout:         None,
            post_op:         PostOp::Mean.to_string(),
            save:            None,
            log_file:        "tuner_log.txt".to_string(),
        }
    }
}

impl TunerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path.as_ref(), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_len == 0 {
            return Err(HarnessError::config("max_len must be positive"));
        }
        if self.batch_size == 0 {
            return Err(HarnessError::config("batch_size must be positive"));
        }
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return Err(HarnessError::config(format!("lr must be positive, got {}", self.lr)));
        }
        if !(0.0..=1.0).contains(&self.warmup_fraction) {
            return Err(HarnessError::config(format!(
                "warmup_fraction must be in [0, 1], got {}",
                self.warmup_fraction
            )));
        }
        if self.num_classes == Some(0) {
            return Err(HarnessError::config("num_classes must be at least 1"));
        }
        if let Some(p) = self.dropout {
            if !(0.0..1.0).contains(&p) {
                return Err(HarnessError::config(format!(
                    "dropout probability must be in [0, 1), got {p}"
                )));
            }
        }
        self.post_op()?;
        self.checkpoint_template()?;
        Ok(())
    }

    pub fn post_op(&self) -> Result<PostOp> {
        self.post_op.parse()
    }

    pub fn checkpoint_template(&self) -> Result<Option<CheckpointTemplate>> {
        self.save.clone().map(CheckpointTemplate::new).transpose()
    }

    pub fn train_settings(&self) -> Result<TrainSettings> {
        Ok(TrainSettings {
            epochs:          self.epochs,
            save:            self.checkpoint_template()?,
            lr:              self.lr,
            warmup:          self.warmup,
            warmup_fraction: self.warmup_fraction,
        })
    }

    pub fn triplet_settings(&self) -> Result<TripletSettings> {
        Ok(TripletSettings {
            epochs:          self.epochs,
            post_op:         self.post_op()?,
            save:            self.checkpoint_template()?,
            lr:              self.lr,
            warmup:          self.warmup,
            warmup_fraction: self.warmup_fraction,
        })
    }
}
