use super::incident::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumIter, EnumString};

/// One sample of a time series
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MetricPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, EnumString, EnumIter, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MetricKind {
    LatencyP99Ms,
    ErrorRate,
    RequestsPerSecond,
    CpuUtilization,
}

impl MetricKind {
    pub fn unit(&self) -> &'static str {
        match self {
            MetricKind::LatencyP99Ms => "ms",
            MetricKind::ErrorRate => "percent",
            MetricKind::RequestsPerSecond => "req/s",
            MetricKind::CpuUtilization => "percent",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            MetricKind::LatencyP99Ms => "99th percentile request latency",
            MetricKind::ErrorRate => "Share of requests answered with 5xx",
            MetricKind::RequestsPerSecond => "Inbound request throughput",
            MetricKind::CpuUtilization => "Average CPU utilisation across pods",
        }
    }
}

/// Series descriptor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricSeries {
    /// `<service>.<kind>`
    pub id: String,
    pub service: String,
    pub kind: MetricKind,
    pub unit: String,
    pub description: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl MetricSeries {
    pub fn series_id(service: &str, kind: MetricKind) -> String {
        format!("{}.{}", service, kind)
    }

    pub fn search_fields(&self) -> Vec<&str> {
        vec![self.id.as_str(), self.service.as_str(), self.description.as_str()]
    }
}

/// Static threshold rule evaluated against the latest value of a series
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AlertRule {
    pub kind: MetricKind,
    pub threshold: f64,
    pub severity: Severity,
}

/// A firing alert
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricAlert {
    pub id: String,
    pub series_id: String,
    pub service: String,
    pub kind: MetricKind,
    pub severity: Severity,
    pub threshold: f64,
    pub value: f64,
    pub evaluated_at: DateTime<Utc>,
    pub summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_id_format() {
        assert_eq!(
            MetricSeries::series_id("checkout", MetricKind::LatencyP99Ms),
            "checkout.latency_p99_ms"
        );
        assert_eq!(
            "requests_per_second".parse::<MetricKind>().unwrap(),
            MetricKind::RequestsPerSecond
        );
    }
}
