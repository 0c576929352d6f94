use crate::enrichment::Enrichment;
use crate::error::{ProviderError, Result};
use crate::filter::{eq_ci, matches_opt, Page, TimeRange};
use crate::models::{LogEntry, LogLevel, NewLogEntry};
use crate::plugin::{to_payload, Capability, Provider, ProviderRequest};
use crate::query::TextQuery;
use crate::seed::{self, DetRng, SeedClock};
use crate::waveform::AlertWindow;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use validator::Validate;

const PROVIDER_ID: &str = "mock-logs";
const OPERATIONS: &[&str] = &["search", "tail", "level_counts", "append"];
const BURST_ENTRIES: i64 = 6;

/// Filter for searching logs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogQuery {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    /// Lowest level included
    #[serde(default)]
    pub min_level: Option<LogLevel>,
    #[serde(flatten)]
    pub range: TimeRange,
    #[serde(flatten)]
    pub page: Page,
}

const INFO_MESSAGES: &[&str] = &[
    "request completed status=200",
    "cache refreshed entries=512",
    "health check passed",
    "config reloaded from control plane",
    "request completed status=201",
];

const DEBUG_MESSAGES: &[&str] = &[
    "opening connection to upstream",
    "retry budget remaining=9",
    "span exported",
];

const TRACE_MESSAGES: &[&str] = &["entering handler", "leaving handler"];

const WARN_MESSAGES: &[&str] = &[
    "slow query took 1200ms",
    "retrying request to upstream attempt=2",
    "connection pool at 85% capacity",
];

const ERROR_MESSAGES: &[&str] = &[
    "upstream timeout after 5000ms",
    "request failed status=503",
    "connection refused by upstream",
];

struct LogStore {
    entries: HashMap<String, LogEntry>,
    next_seq: u64,
}

/// Mock log search backend
pub struct MockLogProvider {
    enrichment: Enrichment,
    store: Mutex<LogStore>,
}

impl MockLogProvider {
    /// Seed `per_service` lines for every application service, plus error
    /// bursts at the start of each alert window
    pub fn new(
        clock: SeedClock,
        enrichment: Enrichment,
        per_service: usize,
        alert_windows: &[AlertWindow],
    ) -> Self {
        let mut entries = HashMap::new();
        let history_minutes = clock.history().num_minutes().max(1);

        for svc in seed::application_services() {
            let mut rng = DetRng::new(&format!("logs:{}", svc.name));
            for i in 0..per_service {
                let timestamp = clock.anchor()
                    - Duration::seconds(rng.range(0, history_minutes * 60));
                let level = seeded_level(&mut rng);
                let message = *rng.pick(messages_for(level));
                let entry = seeded_entry(
                    format!("log-{}-{:05}", svc.name, i),
                    svc.name,
                    timestamp,
                    level,
                    message,
                    &mut rng,
                );
                entries.insert(entry.id.clone(), entry);
            }
        }

        for (w, window) in alert_windows.iter().enumerate() {
            if window.start < clock.history_start() || window.start > clock.anchor() {
                continue;
            }
            let mut rng = DetRng::new(&format!("burst:{}:{}", window.service, w));
            for i in 0..BURST_ENTRIES {
                let timestamp = window.start + Duration::seconds(i * 90 + rng.range(0, 60));
                let message = *rng.pick(ERROR_MESSAGES);
                let entry = seeded_entry(
                    format!("log-{}-burst{}-{}", window.service, w, i),
                    &window.service,
                    timestamp,
                    LogLevel::Error,
                    message,
                    &mut rng,
                );
                entries.insert(entry.id.clone(), entry);
            }
        }

        tracing::info!(count = entries.len(), "Seeded mock log entries");
        crate::metrics::set_seeded_records(PROVIDER_ID, entries.len());

        Self {
            enrichment,
            store: Mutex::new(LogStore {
                entries,
                next_seq: 1,
            }),
        }
    }

    fn matching(&self, query: &LogQuery) -> Result<Vec<LogEntry>> {
        query.range.validate()?;
        let text = TextQuery::parse_opt(query.text.as_deref())?;

        let store = self.store.lock();
        let mut entries: Vec<LogEntry> = store
            .entries
            .values()
            .filter(|entry| {
                matches_opt(query.service.as_deref(), &entry.service)
                    && matches_opt(query.environment.as_deref(), &entry.environment)
                    && query.min_level.map_or(true, |min| entry.level >= min)
                    && query.range.contains(entry.timestamp)
                    && text.matches(&entry.search_fields())
            })
            .cloned()
            .collect();

        entries.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(entries)
    }

    /// Matching entries, newest first
    pub fn search(&self, query: &LogQuery) -> Result<Vec<LogEntry>> {
        let entries = self.matching(query)?;
        tracing::debug!(matched = entries.len(), "Searched logs");
        Ok(self.enrichment.apply_all(query.page.apply(entries)))
    }

    /// Last `lines` entries of a service in chronological order
    pub fn tail(&self, service: &str, lines: usize) -> Result<Vec<LogEntry>> {
        if seed::service(service).is_none() && !self.has_service(service) {
            return Err(ProviderError::NotFound(format!(
                "No logs for service {}",
                service
            )));
        }
        let query = LogQuery {
            service: Some(service.to_string()),
            page: Page::new(lines, 0),
            ..Default::default()
        };
        let mut entries = query.page.apply(self.matching(&query)?);
        entries.reverse();
        Ok(self.enrichment.apply_all(entries))
    }

    /// Count of matching entries per level, ignoring pagination
    pub fn level_counts(&self, query: &LogQuery) -> Result<BTreeMap<LogLevel, usize>> {
        let mut counts = BTreeMap::new();
        for entry in self.matching(query)? {
            *counts.entry(entry.level).or_insert(0) += 1;
        }
        Ok(counts)
    }

    pub fn append(&self, request: NewLogEntry) -> Result<LogEntry> {
        request.validate()?;
        let entry = {
            let mut store = self.store.lock();
            let id = format!("log-appended-{:06}", store.next_seq);
            store.next_seq += 1;
            let entry = LogEntry {
                id: id.clone(),
                timestamp: request.timestamp.unwrap_or_else(Utc::now),
                service: request.service,
                environment: request.environment.unwrap_or_else(|| "prod".to_string()),
                level: request.level,
                message: request.message,
                trace_id: None,
                attributes: request.attributes,
                url: None,
            };
            store.entries.insert(id, entry.clone());
            crate::metrics::set_seeded_records(PROVIDER_ID, store.entries.len());
            entry
        };
        tracing::debug!(log_id = %entry.id, service = %entry.service, "Log entry appended");
        Ok(self.enrichment.apply(entry))
    }

    fn has_service(&self, service: &str) -> bool {
        self.store
            .lock()
            .entries
            .values()
            .any(|e| eq_ci(&e.service, service))
    }
}

fn seeded_level(rng: &mut DetRng) -> LogLevel {
    match rng.next_f64() {
        x if x < 0.05 => LogLevel::Error,
        x if x < 0.15 => LogLevel::Warn,
        x if x < 0.70 => LogLevel::Info,
        x if x < 0.95 => LogLevel::Debug,
        _ => LogLevel::Trace,
    }
}

fn messages_for(level: LogLevel) -> &'static [&'static str] {
    match level {
        LogLevel::Trace => TRACE_MESSAGES,
        LogLevel::Debug => DEBUG_MESSAGES,
        LogLevel::Info => INFO_MESSAGES,
        LogLevel::Warn => WARN_MESSAGES,
        LogLevel::Error => ERROR_MESSAGES,
    }
}

fn seeded_entry(
    id: String,
    service: &str,
    timestamp: DateTime<Utc>,
    level: LogLevel,
    message: &str,
    rng: &mut DetRng,
) -> LogEntry {
    let mut attributes = BTreeMap::new();
    attributes.insert(
        "pod".to_string(),
        format!("{}-{:x}", service, rng.next_u64() & 0xfffff),
    );
    attributes.insert("region".to_string(), rng.pick(&["us-east-1", "eu-west-1"]).to_string());

    LogEntry {
        id,
        timestamp,
        service: service.to_string(),
        environment: "prod".to_string(),
        level,
        message: message.to_string(),
        trace_id: Some(format!("{:016x}", rng.next_u64())),
        attributes,
        url: None,
    }
}

#[derive(Debug, Deserialize)]
struct TailParams {
    service: String,
    #[serde(default = "default_tail_lines")]
    lines: usize,
}

fn default_tail_lines() -> usize {
    20
}

#[async_trait]
impl Provider for MockLogProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    fn display_name(&self) -> &str {
        "Mock Log Search"
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::Logs]
    }

    fn operations(&self, capability: Capability) -> &'static [&'static str] {
        match capability {
            Capability::Logs => OPERATIONS,
            _ => &[],
        }
    }

    fn record_count(&self) -> usize {
        self.store.lock().entries.len()
    }

    async fn handle(&self, request: &ProviderRequest) -> Result<Value> {
        match request.operation.as_str() {
            "search" => to_payload(&self.search(&request.params()?)?),
            "tail" => {
                let p: TailParams = request.params()?;
                to_payload(&self.tail(&p.service, p.lines)?)
            }
            "level_counts" => to_payload(&self.level_counts(&request.params()?)?),
            "append" => to_payload(&self.append(request.params()?)?),
            _ => Err(request.unsupported()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn anchor() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn provider(windows: &[AlertWindow]) -> MockLogProvider {
        MockLogProvider::new(
            SeedClock::new(anchor(), 24),
            Enrichment::disabled(),
            30,
            windows,
        )
    }

    #[test]
    fn test_seed_counts_and_determinism() {
        let a = provider(&[]);
        assert_eq!(a.record_count(), 30 * 8);
        let q = LogQuery::default();
        assert_eq!(a.search(&q).unwrap(), provider(&[]).search(&q).unwrap());
    }

    #[test]
    fn test_entries_within_history() {
        let p = provider(&[]);
        let all = p
            .search(&LogQuery {
                page: Page::new(500, 0),
                ..Default::default()
            })
            .unwrap();
        assert!(all
            .iter()
            .all(|e| e.timestamp <= anchor() && e.timestamp >= anchor() - Duration::hours(24)));
        assert!(all.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    }

    #[test]
    fn test_error_bursts_follow_alert_windows() {
        let window = AlertWindow {
            service: "checkout".to_string(),
            start: anchor() - Duration::hours(1),
            end: None,
            severity_weight: 1.0,
        };
        let p = provider(&[window.clone()]);
        let errors = p
            .search(&LogQuery {
                service: Some("checkout".to_string()),
                min_level: Some(LogLevel::Error),
                range: TimeRange::between(window.start, window.start + Duration::minutes(10)),
                ..Default::default()
            })
            .unwrap();
        assert!(errors.len() >= BURST_ENTRIES as usize);
    }

    #[test]
    fn test_min_level_and_text() {
        let p = provider(&[]);
        let warn_plus = p
            .search(&LogQuery {
                min_level: Some(LogLevel::Warn),
                page: Page::new(500, 0),
                ..Default::default()
            })
            .unwrap();
        assert!(warn_plus.iter().all(|e| e.level >= LogLevel::Warn));

        let timeouts = p
            .search(&LogQuery {
                text: Some("timeout OR refused".to_string()),
                page: Page::new(500, 0),
                ..Default::default()
            })
            .unwrap();
        assert!(timeouts
            .iter()
            .all(|e| e.message.contains("timeout") || e.message.contains("refused")));
    }

    #[test]
    fn test_level_counts_sum_to_total() {
        let p = provider(&[]);
        let counts = p
            .level_counts(&LogQuery {
                service: Some("search".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(counts.values().sum::<usize>(), 30);
    }

    #[test]
    fn test_tail_is_chronological() {
        let p = provider(&[]);
        let tail = p.tail("auth", 5).unwrap();
        assert_eq!(tail.len(), 5);
        assert!(tail.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert!(p.tail("nope", 5).is_err());
    }

    #[test]
    fn test_tail_zero_lines_is_empty() {
        let p = provider(&[]);
        assert!(p.tail("auth", 0).unwrap().is_empty());

        let none = p
            .search(&LogQuery {
                page: Page::new(0, 0),
                ..Default::default()
            })
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_append() {
        let p = provider(&[]);
        let entry = p
            .append(NewLogEntry {
                service: "checkout".to_string(),
                level: LogLevel::Warn,
                message: "manual marker".to_string(),
                environment: None,
                attributes: BTreeMap::new(),
                timestamp: Some(anchor()),
            })
            .unwrap();
        assert_eq!(entry.id, "log-appended-000001");
        let hits = p
            .search(&LogQuery {
                text: Some("\"manual marker\"".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(hits.len(), 1);
    }
}
