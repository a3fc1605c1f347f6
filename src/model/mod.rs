//! Threat classifier over extracted feature tables.
//! Random forest with a held-out classification report; persisted as JSON.

mod forest;
mod metrics;

pub use forest::{ForestParams, RandomForest};
pub use metrics::{train_test_split, ClassMetrics, ClassificationReport};

use crate::config::ModelConfig;
use crate::features::FeatureTable;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("no rows to train on")]
    EmptyTraining,
    #[error("row {row} has no label")]
    MissingLabels { row: usize },
    #[error("model artifact {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model artifact is not valid: {0}")]
    Format(#[from] serde_json::Error),
}

/// Predicted class and its mean forest probability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatClassifier {
    feature_names: Vec<String>,
    classes: Vec<String>,
    forest: RandomForest,
}

fn forest_params(config: &ModelConfig) -> ForestParams {
    ForestParams {
        n_estimators: config.n_estimators,
        max_depth: config.max_depth,
        min_samples_split: config.min_samples_split,
        seed: config.seed,
    }
}

/// Sorted class names and per-row class index
fn encode_labels(table: &FeatureTable) -> Result<(Vec<String>, Vec<usize>), ModelError> {
    let labels = table
        .labels()
        .into_iter()
        .enumerate()
        .map(|(row, l)| l.ok_or(ModelError::MissingLabels { row }))
        .collect::<Result<Vec<_>, _>>()?;
    let mut classes: Vec<String> = labels.iter().map(|s| s.to_string()).collect();
    classes.sort();
    classes.dedup();
    let y = labels
        .iter()
        .map(|l| classes.iter().position(|c| c == l).unwrap_or(0))
        .collect();
    Ok((classes, y))
}

fn select_rows(x: &Array2<f64>, rows: &[usize]) -> Array2<f64> {
    x.select(ndarray::Axis(0), rows)
}

impl ThreatClassifier {
    /// Fit on every row of the table.
    pub fn fit(table: &FeatureTable, config: &ModelConfig) -> Result<Self, ModelError> {
        if table.is_empty() {
            return Err(ModelError::EmptyTraining);
        }
        let (classes, y) = encode_labels(table)?;
        let forest = RandomForest::fit(&table.matrix(), &y, classes.len(), &forest_params(config));
        Ok(Self {
            feature_names: table.feature_names(),
            classes,
            forest,
        })
    }

    /// Split, fit on the training rows and score the held-out rows.
    pub fn train(table: &FeatureTable, config: &ModelConfig) -> Result<(Self, ClassificationReport), ModelError> {
        if table.is_empty() {
            return Err(ModelError::EmptyTraining);
        }
        let (classes, y) = encode_labels(table)?;
        let x = table.matrix();
        let (train_idx, test_idx) = train_test_split(table.len(), config.test_fraction, config.seed);

        let x_train = select_rows(&x, &train_idx);
        let y_train: Vec<usize> = train_idx.iter().map(|&i| y[i]).collect();
        info!(
            train = train_idx.len(),
            test = test_idx.len(),
            features = x.ncols(),
            classes = classes.len(),
            "training threat classifier"
        );
        let forest = RandomForest::fit(&x_train, &y_train, classes.len(), &forest_params(config));

        let x_test = select_rows(&x, &test_idx);
        let y_test: Vec<usize> = test_idx.iter().map(|&i| y[i]).collect();
        let report = ClassificationReport::from_predictions(&classes, &y_test, &forest.predict(&x_test));

        Ok((
            Self {
                feature_names: table.feature_names(),
                classes,
                forest,
            },
            report,
        ))
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Table matrix re-ordered to the training columns; columns the table
    /// lacks are zero, columns the model never saw are ignored.
    fn aligned_matrix(&self, table: &FeatureTable) -> Array2<f64> {
        let names = table.feature_names();
        let source = table.matrix();
        let mut x = Array2::<f64>::zeros((table.len(), self.feature_names.len()));
        for (j, name) in self.feature_names.iter().enumerate() {
            if let Some(k) = names.iter().position(|n| n == name) {
                x.column_mut(j).assign(&source.column(k));
            }
        }
        x
    }

    pub fn predict_table(&self, table: &FeatureTable) -> Vec<Prediction> {
        let proba = self.forest.predict_proba(&self.aligned_matrix(table));
        proba
            .outer_iter()
            .map(|row| {
                let (best, confidence) = row
                    .iter()
                    .enumerate()
                    .fold((0usize, f64::MIN), |b, (c, &p)| if p > b.1 { (c, p) } else { b });
                Prediction {
                    label: self.classes.get(best).cloned().unwrap_or_default(),
                    confidence: confidence.max(0.0),
                }
            })
            .collect()
    }

    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| ModelError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let data = serde_json::to_vec(self)?;
        std::fs::write(path, data).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), trees = self.forest.n_trees(), "threat model saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let data = std::fs::read(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model: Self = serde_json::from_slice(&data)?;
        if model.forest.n_classes() != model.classes.len() {
            warn!(path = %path.display(), "class count mismatch in model artifact");
        }
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::extract;
    use crate::records::sample_records;

    fn small_config() -> ModelConfig {
        ModelConfig {
            n_estimators: 15,
            ..ModelConfig::default()
        }
    }

    #[test]
    fn trains_on_sample() {
        let table = extract(&sample_records()).unwrap();
        let (model, report) = ThreatClassifier::train(&table, &small_config()).unwrap();
        assert_eq!(model.classes(), ["benign", "brute_force"]);
        assert_eq!(report.support, 1);
        assert_eq!(model.predict_table(&table).len(), 4);
    }

    #[test]
    fn unlabelled_rows_rejected() {
        let mut records = sample_records();
        records[2].label = None;
        let table = extract(&records).unwrap();
        assert!(matches!(
            ThreatClassifier::fit(&table, &small_config()),
            Err(ModelError::MissingLabels { row: 2 })
        ));
    }

    #[test]
    fn empty_rejected() {
        let table = extract(&[]).unwrap();
        assert!(matches!(ThreatClassifier::fit(&table, &small_config()), Err(ModelError::EmptyTraining)));
    }

    #[test]
    fn fitted_model_recovers_training_labels() {
        let table = extract(&sample_records()).unwrap();
        let model = ThreatClassifier::fit(&table, &small_config()).unwrap();
        let labels: Vec<String> = model.predict_table(&table).into_iter().map(|p| p.label).collect();
        assert_eq!(labels, vec!["benign", "brute_force", "benign", "brute_force"]);
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("threat_model.json");
        let table = extract(&sample_records()).unwrap();
        let model = ThreatClassifier::fit(&table, &small_config()).unwrap();
        model.save(&path).unwrap();
        let loaded = ThreatClassifier::load(&path).unwrap();
        assert_eq!(loaded.feature_names(), model.feature_names());
        assert_eq!(loaded.predict_table(&table), model.predict_table(&table));
    }
}
