//! Integration test: config load, CSV → features → classifier → alerts,
//! knowledge graph persistence, reports, analysis with stub model calls.

use std::io::Write;
use std::path::Path;
use threatlens::{
    config::{AppConfig, ModelConfig, RagConfig, RecordsConfig, RiskConfig},
    features::{extract, FeatureExtractor},
    knowledge::{build_security_kg, Term},
    model::ThreatClassifier,
    rag::{chunk_documents, load_documents, write_threat_intel, Embedder, Generator, RagError, ThreatAnalyzer},
    records::{load_csv, sample_records},
    report::{generate_report_with_chart, generate_simple_report, ChartKind, SimpleReport},
    risk::{RiskEngine, RiskLevel},
    storage::TripleStore,
};

fn write_logs(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("threat_logs.csv");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "timestamp,log_message,threat_type,bytes").unwrap();
    for i in 0..10 {
        writeln!(
            f,
            "2025-09-22 10:{:02}:00,ALERT: Failed login attempt for user=root from src=10.0.0.5,brute_force,{}",
            i * 2,
            100 + i
        )
        .unwrap();
        writeln!(
            f,
            "2025-09-22 10:{:02}:30,INFO: Login successful for user=alice from src=192.168.1.10,benign,{}",
            i * 2,
            200 + i
        )
        .unwrap();
    }
    path
}

#[test]
fn config_load_default() {
    let c = AppConfig::load(Path::new("nonexistent.json"));
    assert_eq!(c.records.message_column, "log_message");
    assert_eq!(c.model.n_estimators, 100);
    assert_eq!(c.rag.base_url, "http://localhost:11434");
    assert!(!c.log.json);
}

#[test]
fn sample_extraction_matches_worked_example() {
    let table = extract(&sample_records()).unwrap();
    assert_eq!(table.len(), 4);
    assert_eq!(
        table.indicator_columns(),
        vec!["user_root", "user_sysuser", "source_ip_10.0.0.5", "source_ip_unknown"]
    );
    assert_eq!(table.rows[1].indicators, vec![1, 0, 1, 0]);
    assert_eq!(table.rows[2].indicators, vec![0, 1, 0, 1]);
    assert_eq!(table.column("user").unwrap(), vec!["admin", "root", "sysuser", "admin"]);
    // Re-running on the same input gives the same table.
    assert_eq!(extract(&sample_records()).unwrap(), table);
}

#[test]
fn csv_to_alerts() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_logs(dir.path());
    let records = load_csv(&path, &RecordsConfig::default()).unwrap();
    assert_eq!(records.len(), 20);

    let table = FeatureExtractor::default().extract(&records).unwrap();
    assert_eq!(table.passthrough_columns, vec!["bytes"]);

    let (classifier, report) = ThreatClassifier::train(&table, &ModelConfig::default()).unwrap();
    assert_eq!(report.accuracy, 1.0);

    let model_path = dir.path().join("threat_model.json");
    classifier.save(&model_path).unwrap();
    let restored = ThreatClassifier::load(&model_path).unwrap();
    let predictions = restored.predict_table(&table);
    let labels = |ps: &[threatlens::model::Prediction]| ps.iter().map(|p| p.label.clone()).collect::<Vec<_>>();
    assert_eq!(labels(&predictions), labels(&classifier.predict_table(&table)));

    let alerts = RiskEngine::new(RiskConfig::default()).alerts(&table, &predictions);
    assert_eq!(alerts.len(), 10);
    for alert in &alerts {
        assert_eq!(alert.threat_type, "brute_force");
        assert_eq!(alert.source_ip, "10.0.0.5");
        assert_eq!(alert.row % 2, 0);
        assert_eq!(alert.level, RiskLevel::High);
    }
    assert_eq!(
        alerts[0].details(Some("admin account")),
        "Threat type: brute_force, Source IP: 10.0.0.5, Target: admin account."
    );
}

#[test]
fn risk_engine_thresholds() {
    let config = RiskConfig::default();
    assert_eq!(RiskLevel::from_score(0.3, &config), RiskLevel::Low);
    assert_eq!(RiskLevel::from_score(0.6, &config), RiskLevel::Medium);
    assert_eq!(RiskLevel::from_score(0.9, &config), RiskLevel::High);
}

#[test]
fn knowledge_graph_persists() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("knowledge.db");
    {
        let store = TripleStore::open(&db).unwrap();
        assert_eq!(store.insert_graph(&build_security_kg()).unwrap(), 10);
        // Second insert adds nothing.
        assert_eq!(store.insert_graph(&build_security_kg()).unwrap(), 0);
    }
    let store = TripleStore::open(&db).unwrap();
    let graph = store.all().unwrap();
    assert_eq!(graph.len(), 10);
    assert_eq!(
        graph.techniques_used_by(&Term::security("APT29")),
        vec![&Term::security("BruteForceAttack")]
    );
    assert!(graph.to_turtle().contains("@prefix"));
}

#[test]
fn reports_render() {
    let records = sample_records();
    let table = extract(&records).unwrap();
    let now = chrono::NaiveDate::from_ymd_opt(2025, 9, 22)
        .unwrap()
        .and_hms_opt(11, 0, 0)
        .unwrap();
    let pdf = generate_report_with_chart(&records, &table, Some("user"), ChartKind::Pie, now).unwrap();
    assert!(pdf.starts_with(b"%PDF-1.4"));
    assert!(pdf.ends_with(b"%%EOF\n"));

    match generate_simple_report(&records, &RecordsConfig::default(), Some("threat_type")) {
        SimpleReport::Pdf(bytes) => assert!(bytes.starts_with(b"%PDF")),
        SimpleReport::NoData(msg) => panic!("unexpected no-data: {msg}"),
    }
}

struct Keywords;

impl Embedder for Keywords {
    fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let t = text.to_lowercase();
        Ok(["brute", "apt29", "password"]
            .iter()
            .map(|w| t.matches(w).count() as f32)
            .collect())
    }
}

struct Echo;

impl Generator for Echo {
    fn generate(&self, prompt: &str) -> Result<String, RagError> {
        Ok(format!("{} chars of prompt", prompt.len()))
    }
}

#[test]
fn analysis_over_builtin_knowledge() {
    let dir = tempfile::tempdir().unwrap();
    let config = RagConfig {
        docs_dir: dir.path().join("docs"),
        ..RagConfig::default()
    };
    write_threat_intel(&config.docs_dir).unwrap();
    let chunks = chunk_documents(&load_documents(&config.docs_dir).unwrap());
    let analyzer = ThreatAnalyzer::new(Keywords, Echo, chunks, config.top_k).unwrap();
    let analysis = analyzer
        .query("Threat type: brute_force, Source IP: 10.0.0.5, Target: admin account.")
        .unwrap();
    assert_eq!(analysis.sources.len(), 2);
    assert!(analysis.answer.ends_with("chars of prompt"));
}
