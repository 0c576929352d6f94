//! Waveform generator behaviour as seen by library users

mod common;

use chrono::Duration;
use common::anchor;
use ops_mock_providers::enrichment::Enrichment;
use ops_mock_providers::models::MetricKind;
use ops_mock_providers::providers::MockMetricsProvider;
use ops_mock_providers::seed::SeedClock;
use ops_mock_providers::waveform::{
    service_series, AlertWindow, Anomaly, AnomalyKind, Waveform, WaveformProfile, MAX_POINTS,
};

fn throughput() -> Waveform {
    Waveform::new("test.requests_per_second", WaveformProfile::requests_per_second(), anchor())
}

#[test]
fn test_day_and_night() {
    let w = throughput();
    let midnight = anchor() - Duration::hours(12);
    let afternoon = w.value_at(midnight + Duration::hours(16));
    let small_hours = w.value_at(midnight + Duration::hours(4));
    assert!(afternoon > small_hours * 2.0, "{} vs {}", afternoon, small_hours);
}

#[test]
fn test_weekends_are_quieter() {
    let w = throughput();
    let wednesday = anchor() + Duration::hours(4);
    let saturday = wednesday + Duration::days(3);
    assert!(w.value_at(saturday) < w.value_at(wednesday) * 0.8);
}

#[test]
fn test_same_key_same_series() {
    let a = throughput();
    let b = throughput();
    let start = anchor() - Duration::hours(6);
    let step = Duration::minutes(7);
    assert_eq!(
        a.generate(start, anchor(), step).unwrap(),
        b.generate(start, anchor(), step).unwrap()
    );

    let other = Waveform::new(
        "other.requests_per_second",
        WaveformProfile::requests_per_second(),
        anchor(),
    );
    assert_ne!(
        a.generate(start, anchor(), step).unwrap(),
        other.generate(start, anchor(), step).unwrap()
    );
}

#[test]
fn test_point_cap() {
    let w = throughput();
    let start = anchor();
    let at_cap = start + Duration::seconds(MAX_POINTS as i64 - 1);
    assert_eq!(
        w.generate(start, at_cap, Duration::seconds(1)).unwrap().len(),
        MAX_POINTS
    );

    let err = w
        .generate(start, at_cap + Duration::seconds(1), Duration::seconds(1))
        .unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");
}

#[test]
fn test_anomaly_and_alert_stack() {
    let start = anchor() - Duration::hours(2);
    let plain = throughput();
    let spiked = throughput()
        .with_anomalies(vec![Anomaly::new(start, Duration::minutes(60), AnomalyKind::Spike, 1.0)])
        .with_alert_windows(vec![AlertWindow {
            service: "test".to_string(),
            start,
            end: None,
            severity_weight: 0.5,
        }]);

    let mid = start + Duration::minutes(30);
    // spike doubles at its peak, alert adds half on top
    assert!((spiked.value_at(mid) - plain.value_at(mid) * 2.0 * 1.5).abs() < 1e-6);

    let before = start - Duration::minutes(1);
    assert_eq!(spiked.value_at(before), plain.value_at(before));
}

#[test]
fn test_metrics_provider_samples_service_series() {
    let provider = MockMetricsProvider::new(SeedClock::new(anchor(), 48), Enrichment::disabled());
    let start = anchor() - Duration::hours(3);

    let served = provider
        .query_range("inventory.cpu_utilization", Some(start), None, Some(Duration::minutes(15)))
        .unwrap();
    let direct = service_series("inventory", MetricKind::CpuUtilization, anchor())
        .generate(start, anchor(), Duration::minutes(15))
        .unwrap();

    assert_eq!(served, direct);
    assert_eq!(served.len(), 13);
    assert!(served.iter().all(|p| (0.0..=100.0).contains(&p.value)));
}

#[test]
fn test_anomaly_serializes_kind_in_snake_case() {
    let anomaly = Anomaly::new(anchor(), Duration::minutes(15), AnomalyKind::Plateau, 0.5);
    let json = serde_json::to_value(&anomaly).unwrap();
    assert_eq!(json["kind"], "plateau");
    assert_eq!(json["duration_minutes"], 15);
    assert_eq!(anomaly.end(), anchor() + Duration::minutes(15));
}
