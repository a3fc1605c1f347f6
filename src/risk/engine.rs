//! Combines classifier predictions with configurable thresholds; produces threat alerts.

use crate::config::RiskConfig;
use crate::features::FeatureTable;
use crate::model::Prediction;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: f32, config: &RiskConfig) -> Self {
        if score >= config.high_threshold {
            RiskLevel::High
        } else if score >= config.medium_threshold {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

/// A non-benign prediction for one log row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatAlert {
    pub id: String,
    /// Position of the originating record
    pub row: usize,
    pub threat_type: String,
    pub source_ip: String,
    pub user: String,
    pub confidence: f32,
    pub level: RiskLevel,
}

impl ThreatAlert {
    /// Alert text handed to the analyzer. `target` defaults to the user's account.
    pub fn details(&self, target: Option<&str>) -> String {
        let default_target = format!("{} account", self.user);
        alert_details(&self.threat_type, &self.source_ip, target.unwrap_or(&default_target))
    }
}

/// `Threat type: <t>, Source IP: <ip>, Target: <target>.`
pub fn alert_details(threat_type: &str, source_ip: &str, target: &str) -> String {
    format!("Threat type: {threat_type}, Source IP: {source_ip}, Target: {target}.")
}

pub struct RiskEngine {
    config: RiskConfig,
}

impl RiskEngine {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// One alert per row whose predicted class is not the benign label.
    pub fn alerts(&self, table: &FeatureTable, predictions: &[Prediction]) -> Vec<ThreatAlert> {
        table
            .rows
            .iter()
            .zip(predictions)
            .enumerate()
            .filter(|(_, (_, p))| p.label != self.config.benign_label)
            .map(|(row, (r, p))| {
                let confidence = p.confidence as f32;
                ThreatAlert {
                    id: Uuid::new_v4().to_string(),
                    row,
                    threat_type: p.label.clone(),
                    source_ip: r.source_ip.clone(),
                    user: r.user.clone(),
                    confidence,
                    level: RiskLevel::from_score(confidence, &self.config),
                }
            })
            .collect()
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }
}
