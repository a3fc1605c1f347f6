//! Hold-out split and per-class precision/recall/f1 report.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shuffle `0..n` with `seed` and split off `ceil(n * test_fraction)` rows for
/// testing, always leaving at least one training row. Returns (train, test).
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut idx: Vec<usize> = (0..n).collect();
    idx.shuffle(&mut StdRng::seed_from_u64(seed));
    let wanted = (n as f64 * test_fraction.clamp(0.0, 1.0)).ceil() as usize;
    let n_test = wanted.min(n.saturating_sub(1));
    let test = idx.split_off(n - n_test);
    (idx, test)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub support: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl ClassificationReport {
    /// Build from true and predicted class indices. Only classes that occur in
    /// either sequence are listed; undefined ratios count as 0.
    pub fn from_predictions(class_names: &[String], truth: &[usize], predicted: &[usize]) -> Self {
        let mut present: Vec<usize> = truth.iter().chain(predicted).copied().collect();
        present.sort_unstable();
        present.dedup();

        let classes = present
            .into_iter()
            .map(|c| {
                let tp = truth.iter().zip(predicted).filter(|&(&t, &p)| t == c && p == c).count();
                let n_pred = predicted.iter().filter(|&&p| p == c).count();
                let support = truth.iter().filter(|&&t| t == c).count();
                let precision = ratio(tp, n_pred);
                let recall = ratio(tp, support);
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics {
                    label: class_names.get(c).cloned().unwrap_or_else(|| c.to_string()),
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();

        let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
        Self {
            classes,
            accuracy: ratio(correct, truth.len()),
            support: truth.len(),
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.label.len())
            .max()
            .unwrap_or(0)
            .max("accuracy".len());
        writeln!(f, "{:>width$} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.label, c.precision, c.recall, c.f1, c.support
            )?;
        }
        writeln!(f)?;
        write!(f, "{:>width$} {:>9} {:>9} {:>9.2} {:>9}", "accuracy", "", "", self.accuracy, self.support)
    }
}
