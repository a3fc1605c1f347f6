//! Delimited-file loader. Cells are read as bytes so an undecodable message
//! reaches the extractor intact instead of failing here.

use super::{FieldValue, LogRecord};
use crate::config::RecordsConfig;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed delimited input: {0}")]
    Csv(#[from] csv::Error),
    #[error("required column '{column}' not found in header")]
    MissingColumn { column: String },
    #[error("line {line}: cannot parse timestamp '{value}'")]
    Timestamp { line: u64, value: String },
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|t| t.and_utc())
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

/// Read records from any reader with a header row.
pub fn read_csv<R: Read>(reader: R, config: &RecordsConfig) -> Result<Vec<LogRecord>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(false).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let ts_idx = column_index(&headers, &config.timestamp_column).ok_or_else(|| LoadError::MissingColumn {
        column: config.timestamp_column.clone(),
    })?;
    let msg_idx = column_index(&headers, &config.message_column).ok_or_else(|| LoadError::MissingColumn {
        column: config.message_column.clone(),
    })?;
    let label_idx = column_index(&headers, &config.label_column);
    if label_idx.is_none() {
        debug!(column = %config.label_column, "no label column; loading unlabelled records");
    }

    let mut records = Vec::new();
    for row in rdr.byte_records() {
        let row = row?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let ts_raw = String::from_utf8_lossy(row.get(ts_idx).unwrap_or_default());
        let timestamp = parse_timestamp(&ts_raw).ok_or_else(|| LoadError::Timestamp {
            line,
            value: ts_raw.to_string(),
        })?;

        let raw_msg = row.get(msg_idx).unwrap_or_default();
        let message = match std::str::from_utf8(raw_msg) {
            Ok(s) => FieldValue::Text(s.to_string()),
            Err(_) => FieldValue::Bytes(raw_msg.to_vec()),
        };

        let label = label_idx
            .and_then(|i| row.get(i))
            .map(|b| String::from_utf8_lossy(b).trim().to_string())
            .filter(|s| !s.is_empty());

        let extra = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != ts_idx && *i != msg_idx && Some(*i) != label_idx)
            .map(|(i, name)| {
                let cell = String::from_utf8_lossy(row.get(i).unwrap_or_default());
                (name.trim().to_string(), FieldValue::infer(&cell))
            })
            .collect();

        records.push(LogRecord {
            timestamp,
            message,
            label,
            extra,
        });
    }
    Ok(records)
}

/// Load records from a file on disk.
pub fn load_csv(path: &Path, config: &RecordsConfig) -> Result<Vec<LogRecord>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = read_csv(file, config)?;
    info!(path = %path.display(), count = records.len(), "loaded log records");
    Ok(records)
}
