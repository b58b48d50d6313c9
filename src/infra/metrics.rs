// ============================================================
// Infra - Metrics Logger
// ============================================================
// Records per-epoch training metrics to a CSV file next to the
// checkpoints, so learning curves can be plotted later.
//
// Output file: <checkpoint dir>/metrics.csv
//
//   epoch,train_loss,accuracy,macro_f1
//   0,0.693100,0.500000,0.333333
//   1,0.612400,0.750000,0.733333
//
// Appends across runs; the header is written only once.

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const METRICS_FILE: &str = "metrics.csv";
const HEADER: &str = "epoch,train_loss,accuracy,macro_f1";

/// One row of the metrics CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Zero-based, matching the checkpoint index
    pub epoch:      usize,
    /// Mean training loss over the epoch's batches
    pub train_loss: f64,
    pub accuracy:   f64,
    pub macro_f1:   f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, accuracy: f64, macro_f1: f64) -> Self {
        Self { epoch, train_loss, accuracy, macro_f1 }
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Creates `dir` and the CSV header when missing.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join(METRICS_FILE);
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }
        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(
            f,
            "{},{:.6},{:.6},{:.6}",
            m.epoch, m.train_loss, m.accuracy, m.macro_f1,
        )?;
        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, macro_f1={:.4}",
            m.epoch,
            m.train_loss,
            m.macro_f1,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&EpochMetrics::new(0, 0.5, 0.5, 0.5)).unwrap();
        let again = MetricsLogger::new(dir.path()).unwrap();
        again.log(&EpochMetrics::new(1, 0.25, 1.0, 1.0)).unwrap();

        let contents = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines[1], "0,0.500000,0.500000,0.500000");
        assert_eq!(lines.len(), 3);
    }
}
