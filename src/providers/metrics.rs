use super::AlertWindowSource;
use crate::enrichment::Enrichment;
use crate::error::{ProviderError, Result};
use crate::filter::matches_opt;
use crate::models::{AlertRule, MetricAlert, MetricKind, MetricPoint, MetricSeries, Severity};
use crate::plugin::{to_payload, Capability, Provider, ProviderRequest};
use crate::query::TextQuery;
use crate::seed::{self, SeedClock};
use crate::waveform::{service_series, AlertWindow, Waveform};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use strum::IntoEnumIterator;

const PROVIDER_ID: &str = "mock-metrics";
const OPERATIONS: &[&str] = &[
    "list_series",
    "query_range",
    "latest",
    "alerts",
    "set_alert_windows",
];
const DEFAULT_STEP_SECONDS: i64 = 60;

/// Filter for the series catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeriesQuery {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub kind: Option<MetricKind>,
}

/// Threshold rules evaluated by [`MockMetricsProvider::alerts`]
pub fn default_rules() -> Vec<AlertRule> {
    vec![
        AlertRule {
            kind: MetricKind::LatencyP99Ms,
            threshold: 500.0,
            severity: Severity::Sev2,
        },
        AlertRule {
            kind: MetricKind::ErrorRate,
            threshold: 1.0,
            severity: Severity::Sev2,
        },
        AlertRule {
            kind: MetricKind::CpuUtilization,
            threshold: 85.0,
            severity: Severity::Sev3,
        },
    ]
}

struct MetricsState {
    series: HashMap<String, MetricSeries>,
    static_windows: Vec<AlertWindow>,
}

/// Mock time-series backend
pub struct MockMetricsProvider {
    clock: SeedClock,
    enrichment: Enrichment,
    state: Mutex<MetricsState>,
    alert_source: Option<Arc<dyn AlertWindowSource>>,
    rules: Vec<AlertRule>,
}

impl MockMetricsProvider {
    pub fn new(clock: SeedClock, enrichment: Enrichment) -> Self {
        let mut series = HashMap::new();
        for svc in seed::application_services() {
            for kind in MetricKind::iter() {
                let id = MetricSeries::series_id(svc.name, kind);
                let mut labels = BTreeMap::new();
                labels.insert("team".to_string(), svc.team.to_string());
                labels.insert("tier".to_string(), svc.tier.to_string());
                labels.insert("env".to_string(), "prod".to_string());

                series.insert(
                    id.clone(),
                    MetricSeries {
                        id,
                        service: svc.name.to_string(),
                        kind,
                        unit: kind.unit().to_string(),
                        description: format!("{} for {}", kind.description(), svc.name),
                        labels,
                        url: None,
                    },
                );
            }
        }

        tracing::info!(count = series.len(), "Seeded mock metric series");
        crate::metrics::set_seeded_records(PROVIDER_ID, series.len());

        Self {
            clock,
            enrichment,
            state: Mutex::new(MetricsState {
                series,
                static_windows: Vec::new(),
            }),
            alert_source: None,
            rules: default_rules(),
        }
    }

    /// Pull alert windows live from another provider
    pub fn with_alert_source(mut self, source: Arc<dyn AlertWindowSource>) -> Self {
        self.alert_source = Some(source);
        self
    }

    pub fn with_rules(mut self, rules: Vec<AlertRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Replace the fixed alert windows (in addition to any live source)
    pub fn set_alert_windows(&self, windows: Vec<AlertWindow>) {
        tracing::debug!(count = windows.len(), "Static alert windows replaced");
        self.state.lock().static_windows = windows;
    }

    /// Instant "latest" values are evaluated at
    pub fn evaluation_time(&self) -> DateTime<Utc> {
        self.clock.anchor()
    }

    pub fn list_series(&self, query: &SeriesQuery) -> Result<Vec<MetricSeries>> {
        let text = TextQuery::parse_opt(query.text.as_deref())?;
        let mut series: Vec<MetricSeries> = self
            .state
            .lock()
            .series
            .values()
            .filter(|s| {
                matches_opt(query.service.as_deref(), &s.service)
                    && query.kind.map_or(true, |k| k == s.kind)
                    && text.matches(&s.search_fields())
            })
            .cloned()
            .collect();
        series.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(self.enrichment.apply_all(series))
    }

    fn waveform(&self, series_id: &str) -> Result<Waveform> {
        let (service, kind, static_windows) = {
            let state = self.state.lock();
            let series = state
                .series
                .get(series_id)
                .ok_or_else(|| ProviderError::NotFound(format!("Series {} not found", series_id)))?;
            let windows: Vec<AlertWindow> = state
                .static_windows
                .iter()
                .filter(|w| w.service == series.service)
                .cloned()
                .collect();
            (series.service.clone(), series.kind, windows)
        };

        let mut windows = static_windows;
        if let Some(source) = &self.alert_source {
            windows.extend(
                source
                    .alert_windows()
                    .into_iter()
                    .filter(|w| w.service == service),
            );
        }

        Ok(service_series(&service, kind, self.clock.anchor()).with_alert_windows(windows))
    }

    /// Points for `series_id`; defaults to the hour before the anchor at one-minute steps
    pub fn query_range(
        &self,
        series_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        step: Option<Duration>,
    ) -> Result<Vec<MetricPoint>> {
        let end = end.unwrap_or_else(|| self.clock.anchor());
        let start = match start {
            Some(start) => start,
            None => end.checked_sub_signed(Duration::hours(1)).ok_or_else(|| {
                ProviderError::Validation(format!("no hour of history before {}", end))
            })?,
        };
        let step = step.unwrap_or(Duration::seconds(DEFAULT_STEP_SECONDS));

        let points = self.waveform(series_id)?.generate(start, end, step)?;
        tracing::debug!(series = %series_id, points = points.len(), "Generated metric range");
        Ok(points)
    }

    pub fn latest(&self, series_id: &str) -> Result<MetricPoint> {
        let timestamp = self.evaluation_time();
        let value = self.waveform(series_id)?.value_at(timestamp);
        Ok(MetricPoint { timestamp, value })
    }

    /// Firing threshold alerts, most severe first
    pub fn alerts(&self) -> Result<Vec<MetricAlert>> {
        let series = self.list_series(&SeriesQuery::default())?;
        let mut firing = Vec::new();

        for s in &series {
            let Some(rule) = self.rules.iter().find(|r| r.kind == s.kind) else {
                continue;
            };
            let point = self.latest(&s.id)?;
            if point.value > rule.threshold {
                firing.push(MetricAlert {
                    id: format!("alert-{}", s.id),
                    series_id: s.id.clone(),
                    service: s.service.clone(),
                    kind: s.kind,
                    severity: rule.severity,
                    threshold: rule.threshold,
                    value: point.value,
                    evaluated_at: point.timestamp,
                    summary: format!(
                        "{} {} is {:.2}{} (threshold {})",
                        s.service,
                        s.kind,
                        point.value,
                        s.unit,
                        rule.threshold
                    ),
                });
            }
        }

        firing.sort_by(|a, b| {
            a.severity
                .cmp(&b.severity)
                .then_with(|| a.series_id.cmp(&b.series_id))
        });
        Ok(firing)
    }
}

#[derive(Debug, Deserialize)]
struct RangeParams {
    series_id: String,
    #[serde(default)]
    start: Option<DateTime<Utc>>,
    #[serde(default)]
    end: Option<DateTime<Utc>>,
    #[serde(default)]
    step_seconds: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SeriesParams {
    series_id: String,
}

#[derive(Debug, Deserialize)]
struct WindowsParams {
    #[serde(default)]
    windows: Vec<AlertWindow>,
}

#[async_trait]
impl Provider for MockMetricsProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    fn display_name(&self) -> &str {
        "Mock Metrics Store"
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::Metrics]
    }

    fn operations(&self, capability: Capability) -> &'static [&'static str] {
        match capability {
            Capability::Metrics => OPERATIONS,
            _ => &[],
        }
    }

    fn record_count(&self) -> usize {
        self.state.lock().series.len()
    }

    async fn handle(&self, request: &ProviderRequest) -> Result<Value> {
        match request.operation.as_str() {
            "list_series" => to_payload(&self.list_series(&request.params()?)?),
            "query_range" => {
                let p: RangeParams = request.params()?;
                let step = p
                    .step_seconds
                    .map(|secs| {
                        Duration::try_seconds(secs).ok_or_else(|| {
                            ProviderError::Validation(format!(
                                "step_seconds {} is out of range",
                                secs
                            ))
                        })
                    })
                    .transpose()?;
                to_payload(&self.query_range(&p.series_id, p.start, p.end, step)?)
            }
            "latest" => {
                let p: SeriesParams = request.params()?;
                to_payload(&self.latest(&p.series_id)?)
            }
            "alerts" => to_payload(&self.alerts()?),
            "set_alert_windows" => {
                let p: WindowsParams = request.params()?;
                let count = p.windows.len();
                self.set_alert_windows(p.windows);
                Ok(serde_json::json!({ "windows": count }))
            }
            _ => Err(request.unsupported()),
        }
    }
}
