//! Inference benchmark: feature table → forest predictions.

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use threatlens::config::ModelConfig;
use threatlens::features::extract;
use threatlens::model::ThreatClassifier;
use threatlens::records::LogRecord;

fn training_records(n: usize) -> Vec<LogRecord> {
    let base = Utc.with_ymd_and_hms(2025, 9, 22, 10, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let (msg, label) = if i % 2 == 0 {
                (format!("ALERT: Failed login for user=root from src=10.0.0.{}", i % 4), "brute_force")
            } else {
                (format!("INFO: Login successful for user=user{} from src=192.168.1.{}", i % 9, i % 20), "benign")
            };
            LogRecord::new(base + Duration::seconds(i as i64), msg).with_label(label)
        })
        .collect()
}

fn bench_predict(c: &mut Criterion) {
    let table = extract(&training_records(200)).unwrap();
    let classifier = ThreatClassifier::fit(&table, &ModelConfig::default()).unwrap();

    c.bench_function("predict_200_rows_100_trees", |b| {
        b.iter(|| classifier.predict_table(black_box(&table)))
    });
}

fn bench_predict_by_trees(c: &mut Criterion) {
    let table = extract(&training_records(200)).unwrap();
    let mut g = c.benchmark_group("predict_by_trees");
    for n in [10, 50, 100] {
        let config = ModelConfig {
            n_estimators: n,
            ..ModelConfig::default()
        };
        let classifier = ThreatClassifier::fit(&table, &config).unwrap();
        g.bench_function(format!("trees_{}", n).as_str(), |b| {
            b.iter(|| classifier.predict_table(black_box(&table)))
        });
    }
    g.finish();
}

criterion_group!(benches, bench_predict, bench_predict_by_trees);
criterion_main!(benches);
