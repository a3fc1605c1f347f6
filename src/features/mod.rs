//! Log feature extraction: message patterns → categorical fields → indicator columns.

mod encoding;
mod patterns;
mod pipeline;

pub use encoding::OneHot;
pub use patterns::{capture_source_ip, capture_user};
pub use pipeline::{extract, FeatureExtractor};

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Field name for the captured user token
pub const USER_FIELD: &str = "user";
/// Field name for the captured source address
pub const SOURCE_IP_FIELD: &str = "source_ip";
/// Sentinel for a pattern that did not match
pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// The record's message could not be treated as text.
    #[error("record {row}: message of type {found} cannot be converted to text")]
    TypeConversion { row: usize, found: &'static str },
}

/// One output row, aligned with the input record at the same position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub user: String,
    pub source_ip: String,
    /// Values of the table's passthrough columns
    pub passthrough: Vec<f64>,
    /// 0/1 values of the user indicators followed by the source ip indicators
    pub indicators: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Classifier-ready table derived from a batch of log records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    /// Name the label is exposed under (e.g. `threat_type`)
    pub label_column: String,
    pub passthrough_columns: Vec<String>,
    pub user_encoding: OneHot,
    pub source_ip_encoding: OneHot,
    pub rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Indicator column names, user columns first
    pub fn indicator_columns(&self) -> Vec<String> {
        let mut cols = self.user_encoding.columns();
        cols.extend(self.source_ip_encoding.columns());
        cols
    }

    /// Numeric column names in matrix order
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = self.passthrough_columns.clone();
        names.extend(self.indicator_columns());
        names
    }

    /// Row-major numeric matrix: passthrough columns, then indicators.
    pub fn matrix(&self) -> Array2<f64> {
        let width = self.passthrough_columns.len() + self.user_encoding.width() + self.source_ip_encoding.width();
        let mut m = Array2::<f64>::zeros((self.rows.len(), width));
        for (i, row) in self.rows.iter().enumerate() {
            let values = row
                .passthrough
                .iter()
                .copied()
                .chain(row.indicators.iter().map(|&b| f64::from(b)));
            for (j, v) in values.enumerate().take(width) {
                m[[i, j]] = v;
            }
        }
        m
    }

    pub fn labels(&self) -> Vec<Option<&str>> {
        self.rows.iter().map(|r| r.label.as_deref()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// String view of any named column: `user`, `source_ip`, the label column,
    /// a passthrough column or an indicator column. Missing labels read as "".
    pub fn column(&self, name: &str) -> Option<Vec<String>> {
        if name == USER_FIELD {
            return Some(self.rows.iter().map(|r| r.user.clone()).collect());
        }
        if name == SOURCE_IP_FIELD {
            return Some(self.rows.iter().map(|r| r.source_ip.clone()).collect());
        }
        if name == self.label_column {
            if self.rows.iter().all(|r| r.label.is_none()) {
                return None;
            }
            return Some(self.rows.iter().map(|r| r.label.clone().unwrap_or_default()).collect());
        }
        if let Some(j) = self.passthrough_columns.iter().position(|c| c == name) {
            return Some(self.rows.iter().map(|r| r.passthrough[j].to_string()).collect());
        }
        let j = self.indicator_columns().iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| r.indicators[j].to_string()).collect())
    }

    /// Unique values of a column in first-seen order
    pub fn distinct(&self, name: &str) -> Option<Vec<String>> {
        let mut seen = std::collections::HashSet::new();
        let values = self.column(name)?;
        Some(values.into_iter().filter(|v| seen.insert(v.clone())).collect())
    }
}
