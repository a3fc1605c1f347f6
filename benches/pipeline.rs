//! Pipeline benchmark: log records → feature table.

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use threatlens::config::{FeaturesConfig, LevelOrder};
use threatlens::features::FeatureExtractor;
use threatlens::records::LogRecord;

fn make_records(n: usize) -> Vec<LogRecord> {
    let base = Utc.with_ymd_and_hms(2025, 9, 22, 10, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let msg = match i % 3 {
                0 => format!("ALERT: Failed login for user=user{} from src=10.0.{}.{}", i % 50, i % 7, i % 250),
                1 => format!("INFO: Login successful for user=user{} from src=192.168.1.{}", i % 50, i % 40),
                _ => format!("INFO: Process started by user=svc{}", i % 5),
            };
            LogRecord::new(base + Duration::seconds(i as i64), msg).with_label(if i % 3 == 0 { "brute_force" } else { "benign" })
        })
        .collect()
}

fn bench_feature_extraction(c: &mut Criterion) {
    let records = make_records(1_000);
    let extractor = FeatureExtractor::default();

    c.bench_function("extract_1000_records", |b| {
        b.iter(|| extractor.extract(black_box(&records)).unwrap())
    });
}

fn bench_level_order(c: &mut Criterion) {
    let records = make_records(1_000);
    let mut g = c.benchmark_group("extract_by_level_order");
    for (name, order) in [("first_seen", LevelOrder::FirstSeen), ("lexicographic", LevelOrder::Lexicographic)] {
        let extractor = FeatureExtractor::new(FeaturesConfig { level_order: order });
        g.bench_function(name, |b| b.iter(|| extractor.extract(black_box(&records)).unwrap()));
    }
    g.finish();
}

criterion_group!(benches, bench_feature_extraction, bench_level_order);
criterion_main!(benches);
