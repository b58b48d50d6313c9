// ============================================================
// Domain - Classification scores
// ============================================================
// Accuracy and macro-averaged F1 over concatenated predictions.
//
// Macro-F1 is the unweighted mean of per-class F1, taken over
// every class that appears in either the truth or the
// predictions. A class that is never predicted correctly
// scores 0.

use std::collections::BTreeSet;

use crate::error::{HarnessError, Result};

fn check_lengths(y_true: &[i64], y_pred: &[i64]) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(HarnessError::label(format!(
            "{} true labels but {} predictions",
            y_true.len(),
            y_pred.len()
        )));
    }
    if y_true.is_empty() {
        return Err(HarnessError::label("cannot score an empty prediction set"));
    }
    Ok(())
}

/// Fraction of predictions equal to the true label.
pub fn accuracy(y_true: &[i64], y_pred: &[i64]) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let correct = y_true
        .iter()
        .zip(y_pred)
        .filter(|(t, p)| t == p)
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Unweighted mean of per-class F1 scores.
pub fn macro_f1(y_true: &[i64], y_pred: &[i64]) -> Result<f64> {
    check_lengths(y_true, y_pred)?;

    let classes: BTreeSet<i64> = y_true.iter().chain(y_pred).copied().collect();

    let total: f64 = classes
        .iter()
        .map(|&class| {
            let mut tp = 0usize;
            let mut fp = 0usize;
            let mut fn_ = 0usize;
            for (&t, &p) in y_true.iter().zip(y_pred) {
                match (t == class, p == class) {
                    (true, true)   => tp += 1,
                    (false, true)  => fp += 1,
                    (true, false)  => fn_ += 1,
                    (false, false) => {}
                }
            }
            let denom = 2 * tp + fp + fn_;
            if denom == 0 {
                0.0
            } else {
                (2 * tp) as f64 / denom as f64
            }
        })
        .sum();

    Ok(total / classes.len() as f64)
}
