//! PDF threat reports: the charted comprehensive report and the simple
//! per-entry data report.

mod chart;
mod pdf;

pub use chart::{chart_title, draw_chart, group_counts, ChartKind, GroupCounts};
pub use pdf::{Align, PdfDocument, Rgb};

use crate::config::RecordsConfig;
use crate::features::FeatureTable;
use crate::records::LogRecord;
use base64::Engine as _;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

pub const NO_DATA_MESSAGE: &str = "No data found matching the selected criteria to report on.";

const CHART_HEIGHT: f32 = 110.0;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("feature table has {table} rows but {records} records were given")]
    RowMismatch { records: usize, table: usize },
}

/// Title, data summary, optional chart and the raw log messages.
pub fn generate_report_with_chart(
    records: &[LogRecord],
    table: &FeatureTable,
    group_by: Option<&str>,
    kind: ChartKind,
    generated_at: NaiveDateTime,
) -> Result<Vec<u8>, ReportError> {
    if records.len() != table.len() {
        return Err(ReportError::RowMismatch {
            records: records.len(),
            table: table.len(),
        });
    }
    let mut pdf = PdfDocument::new();
    pdf.set_auto_page_break(15.0);
    pdf.add_page();

    pdf.set_font(true, 16.0);
    pdf.cell(0.0, 10.0, "Comprehensive Threat Report", Align::Center, true);
    pdf.ln(10.0);

    pdf.set_font(true, 12.0);
    pdf.cell(0.0, 10.0, "Data Summary", Align::Left, true);
    pdf.set_font(false, 10.0);
    pdf.multi_cell(0.0, 5.0, &format!("Total log entries: {}", records.len()));
    pdf.multi_cell(
        0.0,
        5.0,
        &format!("Report generated on: {}", generated_at.format("%Y-%m-%d %H:%M:%S")),
    );
    pdf.ln(5.0);

    // Unknown grouping columns silently skip the visualization.
    if let Some(counts) = group_by.and_then(|field| group_counts(table, field)) {
        pdf.set_font(true, 12.0);
        pdf.cell(
            0.0,
            10.0,
            &format!("Threat Log Visualization ({})", counts.field),
            Align::Left,
            true,
        );
        pdf.ensure_space(CHART_HEIGHT);
        let top = pdf.y();
        draw_chart(&mut pdf, &counts, kind, 15.0, top, 180.0, CHART_HEIGHT);
        pdf.set_y(top + CHART_HEIGHT + 5.0);
    }

    pdf.set_font(true, 12.0);
    pdf.cell(0.0, 10.0, "Raw Log Data", Align::Left, true);
    pdf.set_font(false, 8.0);
    for (i, record) in records.iter().enumerate() {
        pdf.multi_cell(0.0, 5.0, &format!("Entry {}: {}", i + 1, record.message_text()));
    }

    info!(entries = records.len(), pages = pdf.page_count(), group_by = ?group_by, "threat report rendered");
    Ok(pdf.output())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleReport {
    Pdf(Vec<u8>),
    NoData(String),
}

/// Column name / rendered value pairs of one record, in input order.
fn record_columns(record: &LogRecord, config: &RecordsConfig) -> Vec<(String, String)> {
    let mut cols = vec![
        (
            config.timestamp_column.clone(),
            record.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        ),
        (config.message_column.clone(), record.message_text()),
    ];
    if let Some(label) = &record.label {
        cols.push((config.label_column.clone(), label.clone()));
    }
    cols.extend(record.extra.iter().map(|(k, v)| (k.clone(), v.to_string())));
    cols
}

/// Entries whose `criteria` column is non-empty, every column listed.
/// A criteria column no record carries reports on all entries.
pub fn generate_simple_report(records: &[LogRecord], config: &RecordsConfig, criteria: Option<&str>) -> SimpleReport {
    // Entry numbers are input positions, not positions within the selection.
    let rows: Vec<(usize, Vec<(String, String)>)> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (i + 1, record_columns(r, config)))
        .collect();
    let selected: Vec<&(usize, Vec<(String, String)>)> = match criteria {
        Some(col) if rows.iter().any(|(_, cols)| cols.iter().any(|(k, _)| k == col)) => rows
            .iter()
            .filter(|(_, cols)| cols.iter().any(|(k, v)| k == col && !v.is_empty()))
            .collect(),
        Some(col) => {
            warn!(criteria = %col, "unknown report criteria, reporting all entries");
            rows.iter().collect()
        }
        None => rows.iter().collect(),
    };
    if selected.is_empty() {
        return SimpleReport::NoData(NO_DATA_MESSAGE.to_string());
    }

    let mut pdf = PdfDocument::new();
    pdf.set_auto_page_break(15.0);
    pdf.add_page();
    pdf.set_font(true, 16.0);
    pdf.cell(0.0, 10.0, "Generated Data Report", Align::Center, true);
    pdf.ln(5.0);
    for (entry, cols) in selected.iter().copied() {
        pdf.set_font(true, 12.0);
        pdf.cell(0.0, 8.0, &format!("Entry {entry}"), Align::Left, true);
        pdf.set_font(false, 10.0);
        for (k, v) in cols.iter() {
            pdf.multi_cell(0.0, 5.0, &format!("{k}: {v}"));
        }
        pdf.ln(3.0);
    }
    info!(entries = selected.len(), "simple report rendered");
    SimpleReport::Pdf(pdf.output())
}

/// HTML anchor embedding the PDF as a base64 data URI.
pub fn download_link(pdf: &[u8], file_name: &str) -> String {
    let b64 = base64::engine::general_purpose::STANDARD.encode(pdf);
    format!(
        "<a href=\"data:application/octet-stream;base64,{b64}\" download=\"{file_name}\">Download PDF Report</a>"
    )
}

pub fn write_report(path: &Path, bytes: &[u8]) -> Result<(), ReportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ReportError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, bytes).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), bytes = bytes.len(), "report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::extract;
    use crate::records::{sample_records, FieldValue};
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, 22)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap()
    }

    fn contains(haystack: &[u8], needle: &str) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle.as_bytes())
    }

    #[test]
    fn comprehensive_report_sections() {
        let records = sample_records();
        let table = extract(&records).unwrap();
        let bytes = generate_report_with_chart(&records, &table, Some("source_ip"), ChartKind::Bar, at()).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.4"));
        for text in [
            "Comprehensive Threat Report",
            "Total log entries: 4",
            "Report generated on: 2025-09-22 12:30:00",
            "Threat Log Visualization \\(source_ip\\)",
            "Threat Logs Grouped by source_ip \\(Bar Chart\\)",
            "Entry 1: INFO: Login successful for user=admin from src=192.168.1.10",
        ] {
            assert!(contains(&bytes, text), "missing {text}");
        }
    }

    #[test]
    fn pie_percentages_and_unknown_grouping() {
        let records = sample_records();
        let table = extract(&records).unwrap();
        let pie = generate_report_with_chart(&records, &table, Some("threat_type"), ChartKind::Pie, at()).unwrap();
        assert!(contains(&pie, "50.0%"));
        let plain = generate_report_with_chart(&records, &table, Some("hostname"), ChartKind::Pie, at()).unwrap();
        assert!(!contains(&plain, "Threat Log Visualization"));
        assert!(contains(&plain, "Raw Log Data"));
    }

    #[test]
    fn mismatched_rows() {
        let records = sample_records();
        let table = extract(&records[..2]).unwrap();
        assert!(matches!(
            generate_report_with_chart(&records, &table, None, ChartKind::Bar, at()),
            Err(ReportError::RowMismatch { records: 4, table: 2 })
        ));
    }

    #[test]
    fn simple_report_filters_on_criteria() {
        let config = RecordsConfig::default();
        let mut records = sample_records();
        records[1] = records[1].clone().with_extra("host", FieldValue::Text("web-1".into()));
        records[2] = records[2].clone().with_extra("host", FieldValue::Null);
        match generate_simple_report(&records, &config, Some("host")) {
            SimpleReport::Pdf(bytes) => {
                assert!(contains(&bytes, "Generated Data Report"));
                assert!(contains(&bytes, "host: web-1"));
                assert!(contains(&bytes, "Entry 2"));
                assert!(!contains(&bytes, "Entry 1"));
                assert!(!contains(&bytes, "Entry 3"));
            }
            SimpleReport::NoData(msg) => panic!("unexpected: {msg}"),
        }
        match generate_simple_report(&records, &config, Some("nope")) {
            SimpleReport::Pdf(bytes) => assert!(contains(&bytes, "Entry 4")),
            SimpleReport::NoData(msg) => panic!("unexpected: {msg}"),
        }
    }

    #[test]
    fn simple_report_without_data() {
        let config = RecordsConfig::default();
        assert_eq!(
            generate_simple_report(&[], &config, None),
            SimpleReport::NoData(NO_DATA_MESSAGE.to_string())
        );
    }

    #[test]
    fn link_embeds_base64() {
        let link = download_link(b"%PDF", "threat_report.pdf");
        assert_eq!(
            link,
            "<a href=\"data:application/octet-stream;base64,JVBERg==\" download=\"threat_report.pdf\">Download PDF Report</a>"
        );
    }

    #[test]
    fn writes_into_new_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.pdf");
        write_report(&path, b"%PDF-1.4").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4");
    }
}
