//! Feature extraction pipeline: records → captured fields → indicator columns → table.

use super::{
    capture_source_ip, capture_user, ExtractError, FeatureRow, FeatureTable, OneHot, SOURCE_IP_FIELD, UNKNOWN,
    USER_FIELD,
};
use crate::config::{FeaturesConfig, RecordsConfig};
use crate::records::LogRecord;
use tracing::{debug, warn};

/// Stateless extractor; safe to share across threads.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    config: FeaturesConfig,
    /// Name the label is exposed under, the input's label column
    label_column: String,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(FeaturesConfig::default())
    }
}

/// Extract with the default configuration (first-seen reference levels).
pub fn extract(records: &[LogRecord]) -> Result<FeatureTable, ExtractError> {
    FeatureExtractor::default().extract(records)
}

impl FeatureExtractor {
    pub fn new(config: FeaturesConfig) -> Self {
        Self {
            config,
            label_column: RecordsConfig::default().label_column,
        }
    }

    /// Expose labels under the column they were read from.
    pub fn with_label_column(mut self, name: impl Into<String>) -> Self {
        self.label_column = name.into();
        self
    }

    pub fn extract(&self, records: &[LogRecord]) -> Result<FeatureTable, ExtractError> {
        let mut fields: Vec<(String, String)> = Vec::with_capacity(records.len());
        for (row, record) in records.iter().enumerate() {
            let message = record.message.to_text().ok_or(ExtractError::TypeConversion {
                row,
                found: record.message.type_name(),
            })?;
            let user = capture_user(&message).unwrap_or(UNKNOWN).to_string();
            let source_ip = capture_source_ip(&message).unwrap_or(UNKNOWN).to_string();
            fields.push((user, source_ip));
        }

        let order = self.config.level_order;
        let user_encoding = OneHot::fit(USER_FIELD, fields.iter().map(|(u, _)| u.as_str()), order);
        let source_ip_encoding = OneHot::fit(SOURCE_IP_FIELD, fields.iter().map(|(_, ip)| ip.as_str()), order);

        let passthrough_columns = numeric_columns(records, &[USER_FIELD, SOURCE_IP_FIELD, self.label_column.as_str()]);
        let rows = records
            .iter()
            .zip(fields)
            .map(|(record, (user, source_ip))| {
                let passthrough = passthrough_columns
                    .iter()
                    .map(|col| {
                        record
                            .extra
                            .iter()
                            .find(|(name, _)| name == col)
                            .and_then(|(_, v)| v.as_f64())
                            .unwrap_or(0.0)
                    })
                    .collect();
                let mut indicators = user_encoding.encode(&user);
                indicators.extend(source_ip_encoding.encode(&source_ip));
                FeatureRow {
                    user,
                    source_ip,
                    passthrough,
                    indicators,
                    label: record.label.clone(),
                }
            })
            .collect::<Vec<_>>();

        debug!(
            rows = rows.len(),
            user_reference = ?user_encoding.reference(),
            source_ip_reference = ?source_ip_encoding.reference(),
            indicators = user_encoding.width() + source_ip_encoding.width(),
            "extracted features"
        );

        Ok(FeatureTable {
            label_column: self.label_column.clone(),
            passthrough_columns,
            user_encoding,
            source_ip_encoding,
            rows,
        })
    }
}

/// Extra columns (first-seen order) whose value is numeric in every record.
/// `reserved` names are never passed through; the captured fields replace them.
fn numeric_columns(records: &[LogRecord], reserved: &[&str]) -> Vec<String> {
    let mut names: Vec<&str> = Vec::new();
    for record in records {
        for (name, _) in &record.extra {
            if !reserved.contains(&name.as_str()) && !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
    }
    names
        .into_iter()
        .filter(|name| {
            let numeric = records.iter().all(|r| {
                r.extra
                    .iter()
                    .find(|(n, _)| n == name)
                    .is_some_and(|(_, v)| v.as_f64().is_some())
            });
            if !numeric {
                warn!(column = %name, "skipping non-numeric passthrough column");
            }
            numeric
        })
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LevelOrder;
    use crate::records::{sample_records, FieldValue};
    use chrono::Utc;

    fn rec(msg: &str) -> LogRecord {
        LogRecord::new(Utc::now(), msg)
    }

    #[test]
    fn worked_example_first_seen() {
        let table = extract(&sample_records()).unwrap();
        assert_eq!(table.column("user").unwrap(), vec!["admin", "root", "sysuser", "admin"]);
        assert_eq!(
            table.column("source_ip").unwrap(),
            vec!["192.168.1.10", "10.0.0.5", "unknown", "10.0.0.5"]
        );
        assert_eq!(
            table.indicator_columns(),
            vec!["user_root", "user_sysuser", "source_ip_10.0.0.5", "source_ip_unknown"]
        );
        assert_eq!(table.rows[1].indicators, vec![1, 0, 1, 0]);
        assert_eq!(table.rows[2].indicators, vec![0, 1, 0, 1]);
        assert_eq!(table.column("threat_type").unwrap()[1], "brute_force");
    }

    #[test]
    fn worked_example_lexicographic() {
        let ex = FeatureExtractor::new(FeaturesConfig {
            level_order: LevelOrder::Lexicographic,
        });
        let table = ex.extract(&sample_records()).unwrap();
        assert_eq!(
            table.indicator_columns(),
            vec!["user_root", "user_sysuser", "source_ip_192.168.1.10", "source_ip_unknown"]
        );
    }

    #[test]
    fn empty_input() {
        let table = extract(&[]).unwrap();
        assert!(table.is_empty());
        assert!(table.feature_names().is_empty());
        assert_eq!(table.matrix().dim(), (0, 0));
    }

    #[test]
    fn no_tokens_gives_sentinels() {
        let table = extract(&[rec("heartbeat ok")]).unwrap();
        assert_eq!(table.rows[0].user, UNKNOWN);
        assert_eq!(table.rows[0].source_ip, UNKNOWN);
        assert!(table.indicator_columns().is_empty());
    }

    #[test]
    fn non_text_message_reports_position() {
        let mut records = vec![rec("user=a"), rec("user=b")];
        records.push(LogRecord::new(Utc::now(), FieldValue::Bytes(vec![0xc3, 0x28])));
        let err = extract(&records).unwrap_err();
        assert_eq!(err, ExtractError::TypeConversion { row: 2, found: "bytes" });
    }

    #[test]
    fn numeric_message_is_coerced() {
        let table = extract(&[LogRecord::new(Utc::now(), FieldValue::Integer(404))]).unwrap();
        assert_eq!(table.rows[0].user, UNKNOWN);
    }

    #[test]
    fn passthrough_keeps_numeric_columns_only() {
        let records = vec![
            rec("user=a")
                .with_extra("bytes", FieldValue::Integer(10))
                .with_extra("host", FieldValue::Text("web1".into())),
            rec("user=b")
                .with_extra("bytes", FieldValue::Float(2.5))
                .with_extra("host", FieldValue::Text("web2".into())),
        ];
        let table = extract(&records).unwrap();
        assert_eq!(table.feature_names(), vec!["bytes", "user_b"]);
        let m = table.matrix();
        assert_eq!(m[[0, 0]], 10.0);
        assert_eq!(m[[1, 0]], 2.5);
        assert_eq!(m[[1, 1]], 1.0);
    }

    #[test]
    fn input_columns_named_like_fields_are_replaced() {
        let records = vec![
            rec("login user=a")
                .with_extra("user", FieldValue::Integer(7))
                .with_extra("source_ip", FieldValue::Integer(1))
                .with_extra("threat_type", FieldValue::Integer(0))
                .with_extra("bytes", FieldValue::Integer(10)),
            rec("login user=b")
                .with_extra("user", FieldValue::Integer(8))
                .with_extra("source_ip", FieldValue::Integer(2))
                .with_extra("threat_type", FieldValue::Integer(1))
                .with_extra("bytes", FieldValue::Integer(20)),
        ];
        let table = extract(&records).unwrap();
        assert_eq!(table.passthrough_columns, vec!["bytes"]);
        assert_eq!(table.feature_names(), vec!["bytes", "user_b"]);
        assert_eq!(table.column("user").unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn user_without_source_ip() {
        let records = vec![rec("Login user=alice ok"), rec("Login user=bob from src=2.2.2.2")];
        let table = extract(&records).unwrap();
        assert_eq!(table.rows[0].user, "alice");
        assert_eq!(table.rows[0].source_ip, UNKNOWN);
        assert_eq!(table.indicator_columns(), vec!["user_bob", "source_ip_2.2.2.2"]);
        assert_eq!(table.rows[0].indicators, vec![0, 0]);
    }

    #[test]
    fn shared_user_has_no_user_indicators() {
        let records = vec![
            rec("user=ops from src=1.1.1.1"),
            rec("user=ops from src=2.2.2.2"),
            rec("user=ops"),
        ];
        let table = extract(&records).unwrap();
        assert_eq!(table.indicator_columns(), vec!["source_ip_2.2.2.2", "source_ip_unknown"]);
        assert!(table.indicator_columns().iter().all(|c| !c.starts_with("user_")));
        assert_eq!(table.rows[2].indicators, vec![0, 1]);
    }

    #[test]
    fn label_column_follows_input_name() {
        let records = vec![rec("user=a").with_label("benign"), rec("user=b").with_label("brute_force")];
        let table = FeatureExtractor::default().with_label_column("attack").extract(&records).unwrap();
        assert_eq!(table.label_column, "attack");
        assert_eq!(table.column("attack").unwrap(), vec!["benign", "brute_force"]);
        assert!(table.column("threat_type").is_none());
    }
}
