//! Application configuration. Every service endpoint and tunable is injected here,
//! never read from ambient environment variables.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Data directory (knowledge graph store, model artifact)
    pub data_dir: PathBuf,
    /// Input CSV layout
    pub records: RecordsConfig,
    /// Feature extraction parameters
    pub features: FeaturesConfig,
    /// Classifier hyper-parameters
    pub model: ModelConfig,
    /// Alert confidence thresholds
    pub risk: RiskConfig,
    /// Local LLM server and retrieval settings
    pub rag: RagConfig,
    /// Report output
    pub report: ReportConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordsConfig {
    /// Default input file
    pub input_path: PathBuf,
    pub timestamp_column: String,
    pub message_column: String,
    /// Ground-truth column; optional in the input
    pub label_column: String,
}

/// Order in which categorical levels are enumerated before the first one is
/// dropped as the reference level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelOrder {
    /// Order of first appearance in the input
    #[default]
    FirstSeen,
    /// Byte-wise sorted, as a dataframe library sorts categories
    Lexicographic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    pub level_order: LevelOrder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Fraction of rows held out for the classification report
    pub test_fraction: f64,
    pub seed: u64,
    /// Artifact file name inside `data_dir`
    pub artifact: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Confidence at or above this is high risk (0.0–1.0)
    pub high_threshold: f32,
    /// Confidence at or above this is medium risk
    pub medium_threshold: f32,
    /// Predicted class that never raises an alert
    pub benign_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Base URL of the Ollama server
    pub base_url: String,
    /// Generation model
    pub model: String,
    /// Embedding model
    pub embed_model: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Number of chunks retrieved as context
    pub top_k: usize,
    /// Directory holding threat intelligence documents
    pub docs_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub output_path: PathBuf,
    pub simple_output_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".threatlens"),
            records: RecordsConfig::default(),
            features: FeaturesConfig::default(),
            model: ModelConfig::default(),
            risk: RiskConfig::default(),
            rag: RagConfig::default(),
            report: ReportConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("data").join("threat_logs.csv"),
            timestamp_column: "timestamp".to_string(),
            message_column: "log_message".to_string(),
            label_column: "threat_type".to_string(),
        }
    }
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            level_order: LevelOrder::FirstSeen,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            test_fraction: 0.2,
            seed: 42,
            artifact: "threat_model.json".to_string(),
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            high_threshold: 0.8,
            medium_threshold: 0.5,
            benign_label: "benign".to_string(),
        }
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3".to_string(),
            embed_model: "llama3".to_string(),
            timeout_secs: 300,
            connect_timeout_secs: 5,
            top_k: 2,
            docs_dir: PathBuf::from("docs"),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("threat_report.pdf"),
            simple_output_path: PathBuf::from("generated_report.pdf"),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load from JSON file if present; otherwise return default
    pub fn load(path: &std::path::Path) -> Self {
        if path.exists() {
            if let Ok(data) = std::fs::read_to_string(path) {
                match serde_json::from_str::<AppConfig>(&data) {
                    Ok(c) => return c,
                    // Logging is not initialised yet, so this goes straight to stderr.
                    Err(e) => eprintln!("ignoring invalid config {}: {}", path.display(), e),
                }
            }
        }
        Self::default()
    }

    /// Model artifact location inside the data directory
    pub fn model_path(&self) -> PathBuf {
        self.data_dir.join(&self.model.artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let c: AppConfig =
            serde_json::from_str(r#"{"rag": {"model": "mistral"}, "features": {"level_order": "lexicographic"}}"#)
                .unwrap();
        assert_eq!(c.rag.model, "mistral");
        assert_eq!(c.rag.base_url, "http://localhost:11434");
        assert_eq!(c.features.level_order, LevelOrder::Lexicographic);
        assert_eq!(c.model.n_estimators, 100);
    }
}
