//! Log records: typed input rows for feature extraction and reporting.
//! Loaded from delimited files or built in code; shared field value type.

mod loader;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use loader::{load_csv, read_csv, LoadError};

/// A single cell value. Records keep the value as read so that text coercion
/// (and its failure) happens where the value is consumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// Raw bytes that were not valid UTF-8 when read
    Bytes(Vec<u8>),
    Null,
}

impl FieldValue {
    /// Coerce to text. Numbers and booleans use their display form; bytes only
    /// when they are valid UTF-8; null never.
    pub fn to_text(&self) -> Option<String> {
        match self {
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Integer(i) => Some(i.to_string()),
            FieldValue::Float(f) => Some(f.to_string()),
            FieldValue::Bool(b) => Some(b.to_string()),
            FieldValue::Bytes(b) => std::str::from_utf8(b).ok().map(String::from),
            FieldValue::Null => None,
        }
    }

    /// Numeric view for passthrough columns
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            FieldValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Integer(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::Bool(_) => "bool",
            FieldValue::Bytes(_) => "bytes",
            FieldValue::Null => "null",
        }
    }

    /// Type a raw delimited-file cell: integer, float, bool, empty as null, else text.
    pub fn infer(raw: &str) -> Self {
        let t = raw.trim();
        if t.is_empty() {
            FieldValue::Null
        } else if let Ok(i) = t.parse::<i64>() {
            FieldValue::Integer(i)
        } else if let Ok(f) = t.parse::<f64>() {
            FieldValue::Float(f)
        } else {
            match t {
                "true" | "True" | "TRUE" => FieldValue::Bool(true),
                "false" | "False" | "FALSE" => FieldValue::Bool(false),
                _ => FieldValue::Text(raw.to_string()),
            }
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bytes(b) => write!(f, "{}", String::from_utf8_lossy(b)),
            FieldValue::Null => Ok(()),
            other => write!(f, "{}", other.to_text().unwrap_or_default()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

/// One input row: a timestamped free-text message, optional ground truth,
/// and any further columns in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub message: FieldValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<(String, FieldValue)>,
}

impl LogRecord {
    pub fn new(timestamp: DateTime<Utc>, message: impl Into<FieldValue>) -> Self {
        Self {
            timestamp,
            message: message.into(),
            label: None,
            extra: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_extra(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.extra.push((name.into(), value));
        self
    }

    /// Message as display text, lossy for undecodable bytes
    pub fn message_text(&self) -> String {
        self.message.to_string()
    }
}

/// The four-record training sample the pipeline ships with.
pub fn sample_records() -> Vec<LogRecord> {
    let base = NaiveDate::from_ymd_opt(2025, 9, 22)
        .and_then(|d| d.and_hms_opt(10, 0, 0))
        .map(|t| t.and_utc())
        .unwrap_or_default();
    let rows = [
        ("INFO: Login successful for user=admin from src=192.168.1.10", "benign"),
        ("ALERT: Failed login attempt for user=root from src=10.0.0.5", "brute_force"),
        ("INFO: Process started by user=sysuser", "benign"),
        ("ATTACK: Multiple failed logins for user=admin from src=10.0.0.5", "brute_force"),
    ];
    rows.iter()
        .enumerate()
        .map(|(i, (msg, label))| {
            LogRecord::new(base + chrono::Duration::seconds(5 * i as i64), *msg).with_label(*label)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coercion_rules() {
        assert_eq!(FieldValue::Integer(7).to_text().as_deref(), Some("7"));
        assert_eq!(FieldValue::Bool(true).to_text().as_deref(), Some("true"));
        assert_eq!(FieldValue::Bytes(b"ok".to_vec()).to_text().as_deref(), Some("ok"));
        assert_eq!(FieldValue::Bytes(vec![0xff, 0xfe]).to_text(), None);
        assert_eq!(FieldValue::Null.to_text(), None);
    }

    #[test]
    fn infer_cell_types() {
        assert_eq!(FieldValue::infer("42"), FieldValue::Integer(42));
        assert_eq!(FieldValue::infer("0.5"), FieldValue::Float(0.5));
        assert_eq!(FieldValue::infer(""), FieldValue::Null);
        assert_eq!(FieldValue::infer("False"), FieldValue::Bool(false));
        assert_eq!(FieldValue::infer("benign"), FieldValue::Text("benign".into()));
    }

    #[test]
    fn sample_is_ordered_and_labelled() {
        let s = sample_records();
        assert_eq!(s.len(), 4);
        assert!(s.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(s[1].label.as_deref(), Some("brute_force"));
    }
}
