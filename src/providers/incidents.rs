use super::AlertWindowSource;
use crate::enrichment::Enrichment;
use crate::error::{ProviderError, Result};
use crate::filter::{eq_ci, matches_opt, Page, TimeRange};
use crate::models::{Incident, IncidentStatus, NewIncident, Severity, TimelineEvent};
use crate::plugin::{to_payload, Capability, Provider, ProviderRequest};
use crate::query::TextQuery;
use crate::seed::SeedClock;
use crate::waveform::AlertWindow;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use validator::Validate;

const PROVIDER_ID: &str = "mock-incidents";
const OPERATIONS: &[&str] = &[
    "list",
    "get",
    "create",
    "acknowledge",
    "resolve",
    "add_note",
    "timeline",
    "alert_windows",
];
const FIRST_ID: u32 = 1001;

/// Filter for listing incidents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncidentQuery {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub status: Option<IncidentStatus>,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    /// Only Triggered or Acknowledged incidents
    #[serde(default)]
    pub open_only: bool,
    #[serde(flatten)]
    pub range: TimeRange,
    #[serde(flatten)]
    pub page: Page,
}

struct SeedIncident {
    title: &'static str,
    description: &'static str,
    service: &'static str,
    severity: Severity,
    minutes_ago: i64,
    /// Minutes after creation the incident was acknowledged
    acked_after: Option<i64>,
    /// Minutes after creation the incident was resolved
    resolved_after: Option<i64>,
    tags: &'static [&'static str],
}

const SEED_INCIDENTS: &[SeedIncident] = &[
    SeedIncident {
        title: "Fraud scoring timeouts",
        description: "fraud service exceeding 800ms budget, payments falling back to allow-list",
        service: "fraud",
        severity: Severity::Sev3,
        minutes_ago: 40 * 60,
        acked_after: Some(6),
        resolved_after: Some(70),
        tags: &["payments", "timeout"],
    },
    SeedIncident {
        title: "API gateway 502s from eu-west edge",
        description: "Elevated 502 responses after edge config push",
        service: "api-gateway",
        severity: Severity::Sev2,
        minutes_ago: 30 * 60,
        acked_after: Some(3),
        resolved_after: Some(25),
        tags: &["edge", "errors", "customer-facing"],
    },
    SeedIncident {
        title: "Auth token issuance error spike",
        description: "user-db connection pool exhausted during batch job",
        service: "auth",
        severity: Severity::Sev2,
        minutes_ago: 20 * 60,
        acked_after: Some(4),
        resolved_after: Some(35),
        tags: &["errors", "database"],
    },
    SeedIncident {
        title: "Search index replication lag",
        description: "Replica lag above 10 minutes on search-index shard 3",
        service: "search",
        severity: Severity::Sev3,
        minutes_ago: 6 * 60,
        acked_after: Some(12),
        resolved_after: Some(50),
        tags: &["search", "replication"],
    },
    SeedIncident {
        title: "Inventory reservation deadlocks",
        description: "Deadlocks on inventory-db reservations table during flash sale",
        service: "inventory",
        severity: Severity::Sev3,
        minutes_ago: 3 * 60,
        acked_after: Some(9),
        resolved_after: None,
        tags: &["database", "deadlock"],
    },
    SeedIncident {
        title: "Notification email backlog growing",
        description: "Email queue depth above 50k, delivery delayed",
        service: "notifications",
        severity: Severity::Sev4,
        minutes_ago: 90,
        acked_after: None,
        resolved_after: None,
        tags: &["queue"],
    },
    SeedIncident {
        title: "Checkout p99 latency above 2s",
        description: "Checkout latency regression following payments deploy",
        service: "checkout",
        severity: Severity::Sev2,
        minutes_ago: 35,
        acked_after: Some(5),
        resolved_after: None,
        tags: &["latency", "customer-facing"],
    },
    SeedIncident {
        title: "Payment authorisations failing for Visa",
        description: "Card network returning timeout for 12% of Visa authorisations",
        service: "payments",
        severity: Severity::Sev1,
        minutes_ago: 18,
        acked_after: None,
        resolved_after: None,
        tags: &["payments", "errors", "customer-facing"],
    },
];

struct IncidentBook {
    incidents: HashMap<String, Incident>,
    next_id: u32,
}

impl IncidentBook {
    fn allocate_id(&mut self) -> String {
        let id = format!("INC-{}", self.next_id);
        self.next_id += 1;
        id
    }
}

/// Mock incident management backend
pub struct MockIncidentProvider {
    enrichment: Enrichment,
    book: Mutex<IncidentBook>,
}

impl MockIncidentProvider {
    pub fn new(clock: SeedClock, enrichment: Enrichment) -> Self {
        let mut book = IncidentBook {
            incidents: HashMap::new(),
            next_id: FIRST_ID,
        };

        for seed in SEED_INCIDENTS {
            if Duration::minutes(seed.minutes_ago) > clock.history() {
                continue;
            }
            let created_at = clock.minutes_ago(seed.minutes_ago);
            let id = book.allocate_id();
            let team = crate::seed::owner_of(seed.service);

            let request = NewIncident::new(seed.title, seed.service, seed.severity)
                .with_description(seed.description)
                .with_tags(seed.tags.to_vec());
            let mut incident = Incident::new(id.clone(), request, created_at);

            // Seeded transitions are always valid
            if let Some(after) = seed.acked_after {
                let _ = incident.acknowledge(team.oncall, created_at + Duration::minutes(after));
            }
            if let Some(after) = seed.resolved_after {
                let _ = incident.resolve(
                    team.oncall,
                    Some("mitigated and verified"),
                    created_at + Duration::minutes(after),
                );
            }
            book.incidents.insert(id, incident);
        }

        tracing::info!(count = book.incidents.len(), "Seeded mock incidents");
        crate::metrics::set_seeded_records(PROVIDER_ID, book.incidents.len());

        Self {
            enrichment,
            book: Mutex::new(book),
        }
    }

    pub fn list(&self, query: &IncidentQuery) -> Result<Vec<Incident>> {
        query.range.validate()?;
        let text = TextQuery::parse_opt(query.text.as_deref())?;

        let mut incidents: Vec<Incident> = {
            let book = self.book.lock();
            book.incidents
                .values()
                .filter(|incident| {
                    let status_match = query.status.map_or(true, |s| s == incident.status);
                    let severity_match = query.severity.map_or(true, |s| s == incident.severity);
                    let service_match = matches_opt(query.service.as_deref(), &incident.service);
                    let env_match =
                        matches_opt(query.environment.as_deref(), &incident.environment);
                    let tag_match = query.tag.as_deref().map_or(true, |tag| {
                        incident.tags.iter().any(|t| eq_ci(t, tag))
                    });
                    let open_match = !query.open_only || incident.is_open();

                    status_match
                        && severity_match
                        && service_match
                        && env_match
                        && tag_match
                        && open_match
                        && query.range.contains(incident.created_at)
                        && text.matches(&incident.search_fields())
                })
                .cloned()
                .collect()
        };

        // Newest first, id as tie-breaker
        incidents.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        tracing::debug!(matched = incidents.len(), "Listed incidents");
        Ok(self.enrichment.apply_all(query.page.apply(incidents)))
    }

    pub fn get(&self, id: &str) -> Result<Incident> {
        let incident = self
            .book
            .lock()
            .incidents
            .get(id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("Incident {} not found", id)))?;
        Ok(self.enrichment.apply(incident))
    }

    pub fn create(&self, request: NewIncident) -> Result<Incident> {
        request.validate()?;
        let incident = {
            let mut book = self.book.lock();
            let id = book.allocate_id();
            let incident = Incident::new(id.clone(), request, Utc::now());
            book.incidents.insert(id, incident.clone());
            crate::metrics::set_seeded_records(PROVIDER_ID, book.incidents.len());
            incident
        };
        tracing::info!(incident_id = %incident.id, service = %incident.service, "Incident created");
        Ok(self.enrichment.apply(incident))
    }

    fn mutate<F>(&self, id: &str, f: F) -> Result<Incident>
    where
        F: FnOnce(&mut Incident) -> Result<()>,
    {
        let incident = {
            let mut book = self.book.lock();
            let incident = book
                .incidents
                .get_mut(id)
                .ok_or_else(|| ProviderError::NotFound(format!("Incident {} not found", id)))?;
            f(incident)?;
            incident.clone()
        };
        Ok(self.enrichment.apply(incident))
    }

    pub fn acknowledge(&self, id: &str, actor: &str) -> Result<Incident> {
        let incident = self.mutate(id, |i| i.acknowledge(actor, Utc::now()))?;
        tracing::info!(incident_id = %id, actor = %actor, "Incident acknowledged");
        Ok(incident)
    }

    pub fn resolve(&self, id: &str, actor: &str, note: Option<&str>) -> Result<Incident> {
        let incident = self.mutate(id, |i| i.resolve(actor, note, Utc::now()))?;
        tracing::info!(incident_id = %id, actor = %actor, "Incident resolved");
        Ok(incident)
    }

    pub fn add_note(&self, id: &str, author: &str, body: &str) -> Result<Incident> {
        self.mutate(id, |i| i.add_note(author, body, Utc::now()))
    }

    pub fn timeline(&self, id: &str) -> Result<Vec<TimelineEvent>> {
        self.book
            .lock()
            .incidents
            .get(id)
            .map(|i| i.timeline.clone())
            .ok_or_else(|| ProviderError::NotFound(format!("Incident {} not found", id)))
    }
}

impl AlertWindowSource for MockIncidentProvider {
    fn alert_windows(&self) -> Vec<AlertWindow> {
        let mut windows: Vec<AlertWindow> = self
            .book
            .lock()
            .incidents
            .values()
            .map(Incident::alert_window)
            .collect();
        windows.sort_by(|a, b| a.start.cmp(&b.start));
        windows
    }
}

#[derive(Debug, Deserialize)]
struct IdParams {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ActorParams {
    id: String,
    actor: String,
    #[serde(default)]
    note: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NoteParams {
    id: String,
    author: String,
    body: String,
}

#[async_trait]
impl Provider for MockIncidentProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    fn display_name(&self) -> &str {
        "Mock Incident Manager"
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::Incidents]
    }

    fn operations(&self, capability: Capability) -> &'static [&'static str] {
        match capability {
            Capability::Incidents => OPERATIONS,
            _ => &[],
        }
    }

    fn record_count(&self) -> usize {
        self.book.lock().incidents.len()
    }

    async fn handle(&self, request: &ProviderRequest) -> Result<Value> {
        match request.operation.as_str() {
            "list" => to_payload(&self.list(&request.params()?)?),
            "get" => {
                let p: IdParams = request.params()?;
                to_payload(&self.get(&p.id)?)
            }
            "create" => to_payload(&self.create(request.params()?)?),
            "acknowledge" => {
                let p: ActorParams = request.params()?;
                to_payload(&self.acknowledge(&p.id, &p.actor)?)
            }
            "resolve" => {
                let p: ActorParams = request.params()?;
                to_payload(&self.resolve(&p.id, &p.actor, p.note.as_deref())?)
            }
            "add_note" => {
                let p: NoteParams = request.params()?;
                to_payload(&self.add_note(&p.id, &p.author, &p.body)?)
            }
            "timeline" => {
                let p: IdParams = request.params()?;
                to_payload(&self.timeline(&p.id)?)
            }
            "alert_windows" => to_payload(&self.alert_windows()),
            _ => Err(request.unsupported()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn provider() -> MockIncidentProvider {
        let clock = SeedClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(), 48);
        MockIncidentProvider::new(clock, Enrichment::disabled())
    }

    #[test]
    fn test_seeding_is_deterministic() {
        let a = provider().list(&IncidentQuery::default()).unwrap();
        let b = provider().list(&IncidentQuery::default()).unwrap();
        assert_eq!(a.len(), SEED_INCIDENTS.len());
        assert_eq!(a, b);
        // newest first
        assert_eq!(a[0].title, "Payment authorisations failing for Visa");
        assert_eq!(a[0].id, "INC-1008");
    }

    #[test]
    fn test_history_window_limits_seed() {
        let clock = SeedClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(), 2);
        let p = MockIncidentProvider::new(clock, Enrichment::disabled());
        assert_eq!(p.record_count(), 3);
    }

    #[test]
    fn test_filters() {
        let p = provider();
        let open = p
            .list(&IncidentQuery {
                open_only: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(open.len(), 4);
        assert!(open.iter().all(|i| i.is_open()));

        let sev1 = p
            .list(&IncidentQuery {
                severity: Some(Severity::Sev1),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(sev1.len(), 1);

        let customer = p
            .list(&IncidentQuery {
                tag: Some("Customer-Facing".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(customer.len(), 3);
    }

    #[test]
    fn test_text_query() {
        let p = provider();
        let hits = p
            .list(&IncidentQuery {
                text: Some("\"connection pool\" OR deadlocks".to_string()),
                ..Default::default()
            })
            .unwrap();
        let titles: Vec<&str> = hits.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Inventory reservation deadlocks", "Auth token issuance error spike"]
        );
    }

    #[test]
    fn test_lifecycle() {
        let p = provider();
        let created = p
            .create(NewIncident::new("Disk full on ledger-db", "payments", Severity::Sev2))
            .unwrap();
        assert_eq!(created.id, "INC-1009");
        assert_eq!(created.status, IncidentStatus::Triggered);

        let acked = p.acknowledge(&created.id, "priya.nair").unwrap();
        assert_eq!(acked.status, IncidentStatus::Acknowledged);

        p.add_note(&created.id, "priya.nair", "expanding volume").unwrap();
        let resolved = p.resolve(&created.id, "priya.nair", Some("volume grown")).unwrap();
        assert_eq!(resolved.status, IncidentStatus::Resolved);
        assert_eq!(p.timeline(&created.id).unwrap().len(), 4);

        assert!(matches!(
            p.resolve(&created.id, "priya.nair", None),
            Err(ProviderError::InvalidStateTransition(_))
        ));
    }

    #[test]
    fn test_create_validation() {
        let p = provider();
        let err = p
            .create(NewIncident::new("", "payments", Severity::Sev2))
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_alert_windows_follow_incidents() {
        let p = provider();
        let windows = p.alert_windows();
        assert_eq!(windows.len(), SEED_INCIDENTS.len());
        assert!(windows.iter().filter(|w| w.end.is_none()).count() == 4);
    }

    #[tokio::test]
    async fn test_handle_dispatch() {
        let p = provider();
        let value = p
            .handle(&ProviderRequest::new(
                Capability::Incidents,
                "get",
                json!({"id": "INC-1001"}),
            ))
            .await
            .unwrap();
        assert_eq!(value["title"], "Fraud scoring timeouts");
        assert_eq!(value["status"], "Resolved");

        let err = p
            .handle(&ProviderRequest::new(
                Capability::Incidents,
                "get",
                json!({"id": "INC-1"}),
            ))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");

        let err = p
            .handle(&ProviderRequest::new(Capability::Incidents, "purge", Value::Null))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_OPERATION");
    }
}
