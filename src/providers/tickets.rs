use crate::enrichment::Enrichment;
use crate::error::{ProviderError, Result};
use crate::filter::{eq_ci, matches_opt, Page};
use crate::models::{NewTicket, Ticket, TicketPriority, TicketStatus};
use crate::plugin::{to_payload, Capability, Provider, ProviderRequest};
use crate::query::TextQuery;
use crate::seed::SeedClock;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use validator::Validate;

const PROVIDER_ID: &str = "mock-tickets";
const OPERATIONS: &[&str] = &["search", "get", "create", "transition", "assign", "comment"];
const PROJECT: &str = "OPS";
const FIRST_NUMBER: u32 = 101;

/// Filter for searching tickets
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketQuery {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub status: Option<TicketStatus>,
    #[serde(default)]
    pub priority: Option<TicketPriority>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub linked_incident: Option<String>,
    #[serde(flatten)]
    pub page: Page,
}

struct SeedTicket {
    summary: &'static str,
    description: &'static str,
    status: TicketStatus,
    priority: TicketPriority,
    assignee: Option<&'static str>,
    reporter: &'static str,
    labels: &'static [&'static str],
    linked_incident: Option<&'static str>,
    hours_ago: i64,
    comments: &'static [(&'static str, &'static str)],
}

const SEED_TICKETS: &[SeedTicket] = &[
    SeedTicket {
        summary: "Add circuit breaker around fraud scoring",
        description: "Payments should fail open faster when fraud exceeds its latency budget.",
        status: TicketStatus::InProgress,
        priority: TicketPriority::High,
        assignee: Some("diego.santos"),
        reporter: "priya.nair",
        labels: &["postmortem", "resilience"],
        linked_incident: Some("INC-1001"),
        hours_ago: 38,
        comments: &[("diego.santos", "Draft PR is up, needs load test numbers.")],
    },
    SeedTicket {
        summary: "Roll back edge config validation gap",
        description: "Config pushes to eu-west edge skipped schema validation.",
        status: TicketStatus::Done,
        priority: TicketPriority::Highest,
        assignee: Some("maria.chen"),
        reporter: "tom.okafor",
        labels: &["postmortem", "edge"],
        linked_incident: Some("INC-1002"),
        hours_ago: 29,
        comments: &[("maria.chen", "Validation now enforced in CI.")],
    },
    SeedTicket {
        summary: "Raise user-db connection pool limit",
        description: "Batch jobs exhaust the auth connection pool; split pools per workload.",
        status: TicketStatus::Blocked,
        priority: TicketPriority::High,
        assignee: Some("lena.kowalski"),
        reporter: "sam.rivera",
        labels: &["database", "capacity"],
        linked_incident: Some("INC-1003"),
        hours_ago: 19,
        comments: &[("lena.kowalski", "Blocked on DBA approval for max_connections change.")],
    },
    SeedTicket {
        summary: "Alert on search replica lag",
        description: "We only noticed replication lag from customer reports.",
        status: TicketStatus::Open,
        priority: TicketPriority::Medium,
        assignee: None,
        reporter: "noah.fischer",
        labels: &["alerting", "search"],
        linked_incident: Some("INC-1004"),
        hours_ago: 5,
        comments: &[],
    },
    SeedTicket {
        summary: "Investigate reservation table lock ordering",
        description: "Deadlocks during flash sale point to inconsistent lock ordering.",
        status: TicketStatus::InProgress,
        priority: TicketPriority::High,
        assignee: Some("aisha.rahman"),
        reporter: "jon.bakker",
        labels: &["database", "deadlock"],
        linked_incident: Some("INC-1005"),
        hours_ago: 2,
        comments: &[],
    },
    SeedTicket {
        summary: "Upgrade notification workers to node 20",
        description: "Routine runtime upgrade.",
        status: TicketStatus::Open,
        priority: TicketPriority::Low,
        assignee: Some("ben.adeyemi"),
        reporter: "kai.tanaka",
        labels: &["maintenance"],
        linked_incident: None,
        hours_ago: 44,
        comments: &[],
    },
];

struct TicketBoard {
    tickets: HashMap<String, Ticket>,
    next_number: u32,
}

impl TicketBoard {
    fn allocate_key(&mut self) -> String {
        let key = format!("{}-{}", PROJECT, self.next_number);
        self.next_number += 1;
        key
    }
}

/// Mock issue tracker
pub struct MockTicketProvider {
    enrichment: Enrichment,
    board: Mutex<TicketBoard>,
}

impl MockTicketProvider {
    pub fn new(clock: SeedClock, enrichment: Enrichment) -> Self {
        let mut board = TicketBoard {
            tickets: HashMap::new(),
            next_number: FIRST_NUMBER,
        };

        for seed in SEED_TICKETS {
            let key = board.allocate_key();
            let created_at = clock.hours_ago(seed.hours_ago);
            let mut ticket = Ticket::new(
                key.clone(),
                NewTicket {
                    summary: seed.summary.to_string(),
                    description: seed.description.to_string(),
                    priority: seed.priority,
                    assignee: seed.assignee.map(str::to_string),
                    reporter: seed.reporter.to_string(),
                    labels: seed.labels.iter().map(|l| l.to_string()).collect(),
                    linked_incident: seed.linked_incident.map(str::to_string),
                },
                created_at,
            );
            ticket.status = seed.status;
            for (i, (author, body)) in seed.comments.iter().enumerate() {
                let at = created_at + Duration::minutes(30 * (i as i64 + 1));
                let _ = ticket.add_comment(author, body, at);
            }
            board.tickets.insert(key, ticket);
        }

        tracing::info!(count = board.tickets.len(), "Seeded mock tickets");
        crate::metrics::set_seeded_records(PROVIDER_ID, board.tickets.len());

        Self {
            enrichment,
            board: Mutex::new(board),
        }
    }

    /// Matching tickets, most recently updated first
    pub fn search(&self, query: &TicketQuery) -> Result<Vec<Ticket>> {
        let text = TextQuery::parse_opt(query.text.as_deref())?;

        let mut tickets: Vec<Ticket> = self
            .board
            .lock()
            .tickets
            .values()
            .filter(|t| {
                let assignee_match = match (&query.assignee, &t.assignee) {
                    (None, _) => true,
                    (Some(wanted), Some(actual)) => eq_ci(wanted, actual),
                    (Some(_), None) => false,
                };
                let label_match = query
                    .label
                    .as_deref()
                    .map_or(true, |l| t.labels.iter().any(|x| eq_ci(x, l)));
                let incident_match = match (&query.linked_incident, &t.linked_incident) {
                    (None, _) => true,
                    (Some(wanted), Some(actual)) => matches_opt(Some(wanted.as_str()), actual),
                    (Some(_), None) => false,
                };

                query.status.map_or(true, |s| s == t.status)
                    && query.priority.map_or(true, |p| p == t.priority)
                    && assignee_match
                    && label_match
                    && incident_match
                    && text.matches(&t.search_fields())
            })
            .cloned()
            .collect();

        tickets.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.key.cmp(&b.key))
        });

        tracing::debug!(matched = tickets.len(), "Searched tickets");
        Ok(self.enrichment.apply_all(query.page.apply(tickets)))
    }

    pub fn get(&self, key: &str) -> Result<Ticket> {
        let ticket = self
            .board
            .lock()
            .tickets
            .get(&key.to_uppercase())
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("Ticket {} not found", key)))?;
        Ok(self.enrichment.apply(ticket))
    }

    pub fn create(&self, request: NewTicket) -> Result<Ticket> {
        request.validate()?;
        let ticket = {
            let mut board = self.board.lock();
            let key = board.allocate_key();
            let ticket = Ticket::new(key.clone(), request, Utc::now());
            board.tickets.insert(key, ticket.clone());
            crate::metrics::set_seeded_records(PROVIDER_ID, board.tickets.len());
            ticket
        };
        tracing::info!(ticket = %ticket.key, "Ticket created");
        Ok(self.enrichment.apply(ticket))
    }

    fn mutate<F>(&self, key: &str, f: F) -> Result<Ticket>
    where
        F: FnOnce(&mut Ticket) -> Result<()>,
    {
        let ticket = {
            let mut board = self.board.lock();
            let ticket = board
                .tickets
                .get_mut(&key.to_uppercase())
                .ok_or_else(|| ProviderError::NotFound(format!("Ticket {} not found", key)))?;
            f(ticket)?;
            ticket.clone()
        };
        Ok(self.enrichment.apply(ticket))
    }

    pub fn transition(&self, key: &str, status: TicketStatus) -> Result<Ticket> {
        let ticket = self.mutate(key, |t| t.transition(status, Utc::now()))?;
        tracing::info!(ticket = %ticket.key, status = %status, "Ticket transitioned");
        Ok(ticket)
    }

    pub fn assign(&self, key: &str, assignee: Option<&str>) -> Result<Ticket> {
        self.mutate(key, |t| {
            t.assignee = assignee.map(str::to_string);
            t.updated_at = Utc::now();
            Ok(())
        })
    }

    pub fn comment(&self, key: &str, author: &str, body: &str) -> Result<Ticket> {
        self.mutate(key, |t| t.add_comment(author, body, Utc::now()))
    }
}

#[derive(Debug, Deserialize)]
struct KeyParams {
    key: String,
}

#[derive(Debug, Deserialize)]
struct TransitionParams {
    key: String,
    status: TicketStatus,
}

#[derive(Debug, Deserialize)]
struct AssignParams {
    key: String,
    #[serde(default)]
    assignee: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentParams {
    key: String,
    author: String,
    body: String,
}

#[async_trait]
impl Provider for MockTicketProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    fn display_name(&self) -> &str {
        "Mock Issue Tracker"
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::Tickets]
    }

    fn operations(&self, capability: Capability) -> &'static [&'static str] {
        match capability {
            Capability::Tickets => OPERATIONS,
            _ => &[],
        }
    }

    fn record_count(&self) -> usize {
        self.board.lock().tickets.len()
    }

    async fn handle(&self, request: &ProviderRequest) -> Result<Value> {
        match request.operation.as_str() {
            "search" => to_payload(&self.search(&request.params()?)?),
            "get" => {
                let p: KeyParams = request.params()?;
                to_payload(&self.get(&p.key)?)
            }
            "create" => to_payload(&self.create(request.params()?)?),
            "transition" => {
                let p: TransitionParams = request.params()?;
                to_payload(&self.transition(&p.key, p.status)?)
            }
            "assign" => {
                let p: AssignParams = request.params()?;
                to_payload(&self.assign(&p.key, p.assignee.as_deref())?)
            }
            "comment" => {
                let p: CommentParams = request.params()?;
                to_payload(&self.comment(&p.key, &p.author, &p.body)?)
            }
            _ => Err(request.unsupported()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn provider() -> MockTicketProvider {
        let clock = SeedClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(), 48);
        MockTicketProvider::new(clock, Enrichment::disabled())
    }

    #[test]
    fn test_seeded_tickets() {
        let p = provider();
        assert_eq!(p.record_count(), SEED_TICKETS.len());
        let t = p.get("ops-103").unwrap();
        assert_eq!(t.status, TicketStatus::Blocked);
        assert_eq!(t.comments.len(), 1);
    }

    #[test]
    fn test_search_filters() {
        let p = provider();
        let postmortems = p
            .search(&TicketQuery {
                label: Some("postmortem".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(postmortems.len(), 2);

        let unassigned_open = p
            .search(&TicketQuery {
                status: Some(TicketStatus::Open),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(unassigned_open.len(), 2);

        let linked = p
            .search(&TicketQuery {
                linked_incident: Some("inc-1005".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].key, "OPS-105");

        let text = p
            .search(&TicketQuery {
                text: Some("\"lock ordering\" OR circuit".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(text.len(), 2);
    }

    #[test]
    fn test_create_transition_comment() {
        let p = provider();
        let t = p
            .create(NewTicket {
                summary: "Page payments on ledger disk usage".to_string(),
                description: String::new(),
                priority: TicketPriority::High,
                assignee: None,
                reporter: "kai.tanaka".to_string(),
                labels: vec![],
                linked_incident: None,
            })
            .unwrap();
        assert_eq!(t.key, "OPS-107");

        p.assign(&t.key, Some("priya.nair")).unwrap();
        p.transition(&t.key, TicketStatus::InProgress).unwrap();
        p.comment(&t.key, "priya.nair", "alert added").unwrap();
        let done = p.transition(&t.key, TicketStatus::Done).unwrap();
        assert_eq!(done.assignee.as_deref(), Some("priya.nair"));
        assert_eq!(done.comments.len(), 1);

        assert!(matches!(
            p.transition(&t.key, TicketStatus::Open),
            Err(ProviderError::InvalidStateTransition(_))
        ));
    }

    #[tokio::test]
    async fn test_handle_transition_params() {
        let p = provider();
        let value = p
            .handle(&ProviderRequest::new(
                Capability::Tickets,
                "transition",
                json!({"key": "OPS-104", "status": "InProgress"}),
            ))
            .await
            .unwrap();
        assert_eq!(value["status"], "InProgress");

        let err = p
            .handle(&ProviderRequest::new(
                Capability::Tickets,
                "transition",
                json!({"key": "OPS-104", "status": "Archived"}),
            ))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }
}
