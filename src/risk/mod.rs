//! Risk scoring: classifier output → leveled threat alerts.

mod engine;

pub use engine::{alert_details, RiskEngine, RiskLevel, ThreatAlert};
