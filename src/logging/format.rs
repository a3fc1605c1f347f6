//! JSON log lines: one JSON object per line (ndjson) for alert ingestion.

use crate::risk::ThreatAlert;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::io::Write;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Wire shape of one alert line
#[derive(Debug, Serialize)]
pub struct AlertEvent<'a> {
    pub ts: String,
    pub kind: &'static str,
    pub alert_id: &'a str,
    pub row: usize,
    pub threat_type: &'a str,
    pub source_ip: &'a str,
    pub user: &'a str,
    pub confidence: f32,
    pub risk_level: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<&'a str>,
}

impl<'a> AlertEvent<'a> {
    pub fn new(alert: &'a ThreatAlert, ts: DateTime<Utc>) -> Self {
        Self {
            ts: ts.to_rfc3339_opts(SecondsFormat::Millis, true),
            kind: "threat_alert",
            alert_id: &alert.id,
            row: alert.row,
            threat_type: &alert.threat_type,
            source_ip: &alert.source_ip,
            user: &alert.user,
            confidence: alert.confidence,
            risk_level: alert.level.as_str(),
            analysis: None,
        }
    }

    pub fn with_analysis(mut self, analysis: &'a str) -> Self {
        self.analysis = Some(analysis);
        self
    }
}

pub struct StructuredLogger;

impl StructuredLogger {
    /// Install the global subscriber: JSON or plain lines to stderr, level from
    /// RUST_LOG or `default_level`. Returns false when one is already installed.
    pub fn init(json: bool, default_level: &str) -> bool {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
        if json {
            let fmt = tracing_subscriber::fmt::layer()
                .json()
                .with_span_events(FmtSpan::NONE)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry().with(filter).with(fmt).try_init().is_ok()
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()
                .is_ok()
        }
    }

    /// Emit a single structured line (alert, extracted row) without going through tracing
    pub fn emit_json(event: &impl Serialize, w: &mut impl Write) -> std::io::Result<()> {
        let line = serde_json::to_string(event)?;
        writeln!(w, "{line}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::RiskLevel;
    use chrono::TimeZone;

    fn alert() -> ThreatAlert {
        ThreatAlert {
            id: "a-1".into(),
            row: 3,
            threat_type: "brute_force".into(),
            source_ip: "10.0.0.5".into(),
            user: "admin".into(),
            confidence: 0.9,
            level: RiskLevel::High,
        }
    }

    #[test]
    fn alert_line_is_single_json_object() {
        let a = alert();
        let ts = Utc.with_ymd_and_hms(2025, 9, 22, 10, 0, 15).unwrap();
        let mut out = Vec::new();
        StructuredLogger::emit_json(&AlertEvent::new(&a, ts), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with('\n'));
        assert_eq!(text.lines().count(), 1);
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["ts"], "2025-09-22T10:00:15.000Z");
        assert_eq!(v["risk_level"], "high");
        assert_eq!(v["source_ip"], "10.0.0.5");
        assert!(v.get("analysis").is_none());
    }

    #[test]
    fn analysis_is_attached() {
        let a = alert();
        let ev = AlertEvent::new(&a, Utc::now()).with_analysis("APT29");
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["analysis"], "APT29");
    }
}
