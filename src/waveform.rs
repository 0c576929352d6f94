//! Deterministic synthetic time series
//!
//! A [`Waveform`] turns a [`WaveformProfile`] into values at arbitrary
//! instants: a baseline shaped by a diurnal cycle and a weekend dip, a linear
//! trend, hash-derived noise, injected [`Anomaly`] windows and amplification
//! while correlated alerts are open. Same inputs always give the same values.

use crate::error::{ProviderError, Result};
use crate::models::{MetricKind, MetricPoint, MetricSeries};
use crate::seed::{self, seed_from_key, DetRng};
use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use strum::{Display, EnumString};

/// Upper bound on points produced by a single [`Waveform::generate`] call
pub const MAX_POINTS: usize = 11_000;

const ALERT_RAMP_IN_MINUTES: f64 = 10.0;
const ALERT_RAMP_OUT_MINUTES: f64 = 15.0;
const PEAK_HOUR_UTC: f64 = 16.0;

/// Shape parameters of a series
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WaveformProfile {
    pub baseline: f64,
    /// Relative swing of the day/night cycle
    pub diurnal_amplitude: f64,
    /// Relative drop applied on weekends
    pub weekly_amplitude: f64,
    /// Noise as a fraction of baseline
    pub noise: f64,
    /// Absolute change per day relative to the anchor
    pub trend_per_day: f64,
    pub floor: f64,
    pub ceiling: f64,
}

impl WaveformProfile {
    pub fn latency_ms() -> Self {
        Self {
            baseline: 180.0,
            diurnal_amplitude: 0.25,
            weekly_amplitude: 0.1,
            noise: 0.08,
            trend_per_day: 0.5,
            floor: 5.0,
            ceiling: 30_000.0,
        }
    }

    pub fn error_rate() -> Self {
        Self {
            baseline: 0.4,
            diurnal_amplitude: 0.15,
            weekly_amplitude: 0.05,
            noise: 0.2,
            trend_per_day: 0.0,
            floor: 0.0,
            ceiling: 100.0,
        }
    }

    pub fn requests_per_second() -> Self {
        Self {
            baseline: 850.0,
            diurnal_amplitude: 0.6,
            weekly_amplitude: 0.35,
            noise: 0.05,
            trend_per_day: 2.0,
            floor: 0.0,
            ceiling: 1_000_000.0,
        }
    }

    pub fn cpu_utilization() -> Self {
        Self {
            baseline: 42.0,
            diurnal_amplitude: 0.35,
            weekly_amplitude: 0.2,
            noise: 0.06,
            trend_per_day: 0.1,
            floor: 0.0,
            ceiling: 100.0,
        }
    }

    pub fn for_kind(kind: MetricKind) -> Self {
        match kind {
            MetricKind::LatencyP99Ms => Self::latency_ms(),
            MetricKind::ErrorRate => Self::error_rate(),
            MetricKind::RequestsPerSecond => Self::requests_per_second(),
            MetricKind::CpuUtilization => Self::cpu_utilization(),
        }
    }

    /// Scale the baseline, e.g. for busier tier-1 services
    pub fn scaled(mut self, factor: f64) -> Self {
        self.baseline *= factor;
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AnomalyKind {
    /// Triangular burst peaking mid-window
    Spike,
    /// Drop for the whole window
    Dip,
    /// Flat line at an elevated level
    Plateau,
    /// Linear ramp that persists after the window
    Drift,
}

/// Injected deviation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Anomaly {
    pub start: DateTime<Utc>,
    pub duration_minutes: i64,
    pub kind: AnomalyKind,
    pub magnitude: f64,
}

impl Anomaly {
    pub fn new(
        start: DateTime<Utc>,
        duration: Duration,
        kind: AnomalyKind,
        magnitude: f64,
    ) -> Self {
        Self {
            start,
            duration_minutes: duration.num_minutes().max(1),
            kind,
            magnitude,
        }
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.start + Duration::minutes(self.duration_minutes)
    }

    /// Fraction of the window elapsed at `t`, unclamped
    fn progress(&self, t: DateTime<Utc>) -> f64 {
        (t - self.start).num_seconds() as f64 / (self.duration_minutes * 60) as f64
    }

    fn apply(&self, value: f64, baseline: f64, t: DateTime<Utc>) -> f64 {
        let p = self.progress(t);
        match self.kind {
            AnomalyKind::Drift => {
                if p < 0.0 {
                    value
                } else {
                    value * (1.0 + self.magnitude * p.min(1.0))
                }
            }
            _ if !(0.0..1.0).contains(&p) => value,
            AnomalyKind::Spike => {
                let shape = 1.0 - (2.0 * p - 1.0).abs();
                value * (1.0 + self.magnitude * shape)
            }
            AnomalyKind::Dip => value * (1.0 - self.magnitude).max(0.0),
            AnomalyKind::Plateau => baseline * (1.0 + self.magnitude),
        }
    }
}

/// Period during which an alert on the series' service is open
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertWindow {
    pub service: String,
    pub start: DateTime<Utc>,
    /// `None` while still open
    pub end: Option<DateTime<Utc>>,
    pub severity_weight: f64,
}

impl AlertWindow {
    /// Ramp weight in `[0, 1]`: linear ramp-in after start, full while open,
    /// linear ramp-out after end
    pub fn weight_at(&self, t: DateTime<Utc>) -> f64 {
        if t < self.start {
            return 0.0;
        }
        let since_start = (t - self.start).num_seconds() as f64 / 60.0;
        let ramp_in = (since_start / ALERT_RAMP_IN_MINUTES).min(1.0);

        match self.end {
            Some(end) if t > end => {
                let since_end = (t - end).num_seconds() as f64 / 60.0;
                let ramp_out = 1.0 - since_end / ALERT_RAMP_OUT_MINUTES;
                if ramp_out <= 0.0 {
                    0.0
                } else {
                    ramp_in.min(ramp_out)
                }
            }
            _ => ramp_in,
        }
    }
}

/// Day/night cycle in `[-1, 1]`, peaking at 16:00 UTC and bottoming at 04:00
pub fn diurnal(t: DateTime<Utc>) -> f64 {
    let hour = t.num_seconds_from_midnight() as f64 / 3600.0;
    (2.0 * PI * (hour - PEAK_HOUR_UTC) / 24.0).cos()
}

/// `-1` on Saturday and Sunday, `0` otherwise
pub fn weekly(t: DateTime<Utc>) -> f64 {
    match t.weekday() {
        Weekday::Sat | Weekday::Sun => -1.0,
        _ => 0.0,
    }
}

/// Hash-derived noise in `[-1, 1]`, constant within a minute
pub fn deterministic_noise(key: &str, t: DateTime<Utc>) -> f64 {
    let bucket = t.timestamp().div_euclid(60);
    let raw = seed_from_key(&format!("{}@{}", key, bucket));
    (raw >> 11) as f64 / (1u64 << 53) as f64 * 2.0 - 1.0
}

/// Generator for one series
#[derive(Debug, Clone)]
pub struct Waveform {
    key: String,
    profile: WaveformProfile,
    anchor: DateTime<Utc>,
    anomalies: Vec<Anomaly>,
    alert_windows: Vec<AlertWindow>,
}

impl Waveform {
    pub fn new(key: impl Into<String>, profile: WaveformProfile, anchor: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            profile,
            anchor,
            anomalies: Vec::new(),
            alert_windows: Vec::new(),
        }
    }

    pub fn with_anomalies(mut self, anomalies: Vec<Anomaly>) -> Self {
        self.anomalies = anomalies;
        self
    }

    pub fn with_alert_windows(mut self, windows: Vec<AlertWindow>) -> Self {
        self.alert_windows = windows;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn profile(&self) -> &WaveformProfile {
        &self.profile
    }

    /// Value before anomalies and alert amplification
    pub fn base_value_at(&self, t: DateTime<Utc>) -> f64 {
        let p = &self.profile;
        let days = (t - self.anchor).num_seconds() as f64 / 86_400.0;

        p.baseline
            * (1.0 + p.diurnal_amplitude * diurnal(t))
            * (1.0 + p.weekly_amplitude * weekly(t))
            + p.trend_per_day * days
            + p.noise * p.baseline * deterministic_noise(&self.key, t)
    }

    pub fn value_at(&self, t: DateTime<Utc>) -> f64 {
        let mut value = self.base_value_at(t);

        for anomaly in &self.anomalies {
            value = anomaly.apply(value, self.profile.baseline, t);
        }

        for window in &self.alert_windows {
            let weight = window.weight_at(t);
            if weight > 0.0 {
                value *= 1.0 + window.severity_weight * weight;
            }
        }

        value.clamp(self.profile.floor, self.profile.ceiling)
    }

    /// Sample `[start, end]` every `step`
    pub fn generate(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: Duration,
    ) -> Result<Vec<MetricPoint>> {
        if step <= Duration::zero() {
            return Err(ProviderError::Validation(
                "step must be positive".to_string(),
            ));
        }
        if end < start {
            return Err(ProviderError::Validation(format!(
                "range start {} is after end {}",
                start, end
            )));
        }

        let span = (end - start).num_seconds();
        let step_secs = step.num_seconds().max(1);
        let count = (span / step_secs) as usize + 1;
        if count > MAX_POINTS {
            return Err(ProviderError::Validation(format!(
                "range would produce {} points, the maximum is {}",
                count, MAX_POINTS
            )));
        }

        Ok((0..count)
            .map(|i| {
                let timestamp = start + Duration::seconds(step_secs * i as i64);
                MetricPoint {
                    timestamp,
                    value: self.value_at(timestamp),
                }
            })
            .collect())
    }
}

/// Anomalies seeded for a series: roughly two in five series carry one
/// somewhere in the two days before the anchor
pub fn seeded_anomalies(key: &str, anchor: DateTime<Utc>) -> Vec<Anomaly> {
    let mut rng = DetRng::new(&format!("anomaly:{}", key));
    if !rng.chance(0.4) {
        return Vec::new();
    }

    let kinds = [
        AnomalyKind::Spike,
        AnomalyKind::Dip,
        AnomalyKind::Plateau,
        AnomalyKind::Drift,
    ];
    let kind = *rng.pick(&kinds);
    let start = anchor - Duration::minutes(rng.range(2 * 60, 46 * 60));
    let duration = Duration::minutes(rng.range(15, 90));
    let magnitude = match kind {
        AnomalyKind::Dip => 0.2 + rng.next_f64() * 0.4,
        _ => 0.3 + rng.next_f64() * 1.2,
    };

    vec![Anomaly::new(start, duration, kind, magnitude)]
}

/// Waveform for a catalog service metric, with its seeded anomalies.
/// Throughput is scaled by service tier.
pub fn service_series(service: &str, kind: MetricKind, anchor: DateTime<Utc>) -> Waveform {
    let key = MetricSeries::series_id(service, kind);
    let mut profile = WaveformProfile::for_kind(kind);
    if kind == MetricKind::RequestsPerSecond {
        let scale = match seed::service(service).map(|s| s.tier) {
            Some(1) => 1.6,
            Some(2) => 1.0,
            _ => 0.6,
        };
        profile = profile.scaled(scale);
    }

    let anomalies = seeded_anomalies(&key, anchor);
    Waveform::new(key, profile, anchor).with_anomalies(anomalies)
}

/// Down-sample to `width` points by bucket averaging
pub fn sparkline(values: &[f64], width: usize) -> Vec<f64> {
    if width == 0 || values.is_empty() {
        return Vec::new();
    }
    if values.len() <= width {
        return values.to_vec();
    }

    (0..width)
        .map(|i| {
            let lo = i * values.len() / width;
            let hi = ((i + 1) * values.len() / width).max(lo + 1);
            let bucket = &values[lo..hi];
            bucket.iter().sum::<f64>() / bucket.len() as f64
        })
        .collect()
}
