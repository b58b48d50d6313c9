// ============================================================
// Infra - Run Log
// ============================================================
// Append-only text log of a tuning run, one line per milestone:
// start banner, epoch loss, checkpoint saved, accuracy/F1.
// Every line is also echoed to the console and emitted as a
// tracing event.

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append `line` to the log file and echo it.
    pub fn line(&self, line: impl AsRef<str>) -> Result<()> {
        let line = line.as_ref();
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(f, "{line}")?;

        println!("{line}");
        tracing::info!(target: "encoder_tuner::run_log", "{line}");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
