//! Criterion benchmarks for synthetic series generation
//!
//! These benchmarks measure:
//! - Single point evaluation with anomalies and alert windows
//! - Range generation at different resolutions
//! - Free-text query matching over seeded logs

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ops_mock_providers::enrichment::Enrichment;
use ops_mock_providers::models::MetricKind;
use ops_mock_providers::providers::{LogQuery, MockLogProvider};
use ops_mock_providers::seed::SeedClock;
use ops_mock_providers::waveform::{service_series, AlertWindow};

fn bench_value_at(c: &mut Criterion) {
    let anchor = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let waveform = service_series("payments", MetricKind::LatencyP99Ms, anchor).with_alert_windows(
        vec![AlertWindow {
            service: "payments".to_string(),
            start: anchor - Duration::minutes(30),
            end: None,
            severity_weight: 2.5,
        }],
    );

    c.bench_function("waveform_value_at", |b| {
        b.iter(|| waveform.value_at(black_box(anchor - Duration::minutes(7))))
    });
}

fn bench_generate(c: &mut Criterion) {
    let anchor = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let waveform = service_series("checkout", MetricKind::RequestsPerSecond, anchor);
    let start = anchor - Duration::hours(24);

    let mut group = c.benchmark_group("waveform_generate");
    for step_seconds in [900i64, 60, 10] {
        let points = (24 * 3600 / step_seconds + 1) as u64;
        group.throughput(Throughput::Elements(points));
        group.bench_with_input(
            BenchmarkId::from_parameter(step_seconds),
            &step_seconds,
            |b, &step| {
                b.iter(|| {
                    waveform
                        .generate(start, anchor, Duration::seconds(step))
                        .unwrap()
                })
            },
        );
    }
    group.finish();
}

fn bench_log_search(c: &mut Criterion) {
    let anchor = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let logs = MockLogProvider::new(
        SeedClock::new(anchor, 48),
        Enrichment::disabled(),
        500,
        &[],
    );
    let query = LogQuery {
        text: Some("\"connection pool\" OR timeout".to_string()),
        ..Default::default()
    };

    c.bench_function("log_search_or_phrase", |b| {
        b.iter(|| logs.search(black_box(&query)).unwrap())
    });
}

criterion_group!(benches, bench_value_at, bench_generate, bench_log_search);
criterion_main!(benches);
