use crate::error::{ProviderError, Result};
use crate::waveform::AlertWindow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumString};
use validator::Validate;

/// An incident as exposed by the incidents provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Incident {
    /// Identifier (`INC-<n>`)
    pub id: String,

    pub title: String,

    pub description: String,

    pub severity: Severity,

    pub status: IncidentStatus,

    /// Affected service
    pub service: String,

    pub environment: String,

    pub assignee: Option<String>,

    pub tags: Vec<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    pub acknowledged_at: Option<DateTime<Utc>>,

    pub resolved_at: Option<DateTime<Utc>>,

    /// Timeline of events
    pub timeline: Vec<TimelineEvent>,

    /// Deep link, set by enrichment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Latency sparkline for the affected service, set by enrichment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sparkline: Option<Vec<f64>>,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Incident {
    /// Create a triggered incident
    pub fn new(id: String, request: NewIncident, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: request.title,
            description: request.description,
            severity: request.severity,
            status: IncidentStatus::Triggered,
            service: request.service,
            environment: request.environment,
            assignee: request.assignee,
            tags: request.tags,
            created_at: now,
            updated_at: now,
            acknowledged_at: None,
            resolved_at: None,
            timeline: vec![TimelineEvent {
                timestamp: now,
                kind: TimelineKind::Triggered,
                actor: "system".to_string(),
                message: "Incident triggered".to_string(),
            }],
            url: None,
            sparkline: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.status != IncidentStatus::Resolved
    }

    fn push_event(&mut self, kind: TimelineKind, actor: &str, message: String, at: DateTime<Utc>) {
        self.timeline.push(TimelineEvent {
            timestamp: at,
            kind,
            actor: actor.to_string(),
            message,
        });
        self.updated_at = at;
    }

    /// Acknowledge the incident. Acknowledging twice is a no-op.
    pub fn acknowledge(&mut self, actor: &str, at: DateTime<Utc>) -> Result<()> {
        match self.status {
            IncidentStatus::Acknowledged => Ok(()),
            IncidentStatus::Resolved => Err(ProviderError::InvalidStateTransition(format!(
                "{} is resolved and cannot be acknowledged",
                self.id
            ))),
            IncidentStatus::Triggered => {
                self.status = IncidentStatus::Acknowledged;
                self.acknowledged_at = Some(at);
                if self.assignee.is_none() {
                    self.assignee = Some(actor.to_string());
                }
                self.push_event(
                    TimelineKind::Acknowledged,
                    actor,
                    format!("Acknowledged by {}", actor),
                    at,
                );
                Ok(())
            }
        }
    }

    /// Resolve the incident from any open status
    pub fn resolve(&mut self, actor: &str, note: Option<&str>, at: DateTime<Utc>) -> Result<()> {
        if self.status == IncidentStatus::Resolved {
            return Err(ProviderError::InvalidStateTransition(format!(
                "{} is already resolved",
                self.id
            )));
        }
        self.status = IncidentStatus::Resolved;
        self.resolved_at = Some(at);
        let message = match note {
            Some(note) if !note.trim().is_empty() => format!("Resolved by {}: {}", actor, note),
            _ => format!("Resolved by {}", actor),
        };
        self.push_event(TimelineKind::Resolved, actor, message, at);
        Ok(())
    }

    pub fn add_note(&mut self, author: &str, body: &str, at: DateTime<Utc>) -> Result<()> {
        if body.trim().is_empty() {
            return Err(ProviderError::Validation("note body must not be empty".to_string()));
        }
        self.push_event(TimelineKind::Note, author, body.to_string(), at);
        Ok(())
    }

    /// Fields searched by free-text queries
    pub fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![
            self.id.as_str(),
            self.title.as_str(),
            self.description.as_str(),
            self.service.as_str(),
        ];
        fields.extend(self.tags.iter().map(String::as_str));
        fields
    }

    /// Window during which this incident amplifies its service's metrics
    pub fn alert_window(&self) -> AlertWindow {
        AlertWindow {
            service: self.service.clone(),
            start: self.created_at,
            end: self.resolved_at,
            severity_weight: self.severity.amplification(),
        }
    }

    /// Stable fingerprint over service, environment and title
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        for field in [&self.service, &self.environment, &self.title] {
            hasher.update(field.as_bytes());
            // field separator
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Request to open a new incident
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewIncident {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_severity")]
    pub severity: Severity,

    #[validate(length(min = 1, max = 100))]
    pub service: String,

    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default)]
    pub assignee: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewIncident {
    pub fn new(title: impl Into<String>, service: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            severity,
            service: service.into(),
            environment: default_environment(),
            assignee: None,
            tags: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

fn default_severity() -> Severity {
    Severity::Sev3
}

fn default_environment() -> String {
    "prod".to_string()
}

#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumString,
    Display,
)]
#[strum(ascii_case_insensitive)]
pub enum Severity {
    Sev1, // Critical - customer facing outage
    Sev2, // Major degradation
    Sev3, // Minor degradation
    Sev4, // Informational
}

impl Severity {
    /// Numeric level (lower is more urgent)
    pub fn level(&self) -> u8 {
        match self {
            Severity::Sev1 => 1,
            Severity::Sev2 => 2,
            Severity::Sev3 => 3,
            Severity::Sev4 => 4,
        }
    }

    /// Metric amplification applied while an incident of this severity is open
    pub fn amplification(&self) -> f64 {
        match self {
            Severity::Sev1 => 2.5,
            Severity::Sev2 => 1.2,
            Severity::Sev3 => 0.5,
            Severity::Sev4 => 0.15,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(ascii_case_insensitive)]
pub enum IncidentStatus {
    Triggered,
    Acknowledged,
    Resolved,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelineEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: TimelineKind,
    pub actor: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, EnumString, Display)]
pub enum TimelineKind {
    Triggered,
    Acknowledged,
    Note,
    Resolved,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn incident() -> Incident {
        Incident::new(
            "INC-1".to_string(),
            NewIncident::new("Checkout latency", "checkout", Severity::Sev2),
            t0(),
        )
    }

    #[test]
    fn test_incident_creation() {
        let incident = incident();
        assert_eq!(incident.status, IncidentStatus::Triggered);
        assert_eq!(incident.environment, "prod");
        assert_eq!(incident.timeline.len(), 1);
        assert!(incident.is_open());
    }

    #[test]
    fn test_acknowledge_then_resolve() {
        let mut incident = incident();
        incident.acknowledge("priya", t0() + Duration::minutes(2)).unwrap();
        assert_eq!(incident.status, IncidentStatus::Acknowledged);
        assert_eq!(incident.assignee.as_deref(), Some("priya"));

        // second acknowledge is a no-op
        incident.acknowledge("sam", t0() + Duration::minutes(3)).unwrap();
        assert_eq!(incident.timeline.len(), 2);

        incident
            .resolve("priya", Some("rolled back"), t0() + Duration::minutes(30))
            .unwrap();
        assert!(!incident.is_open());
        assert_eq!(incident.updated_at, t0() + Duration::minutes(30));
        assert!(incident.timeline.last().unwrap().message.contains("rolled back"));
    }

    #[test]
    fn test_resolved_is_terminal() {
        let mut incident = incident();
        incident.resolve("sam", None, t0()).unwrap();
        assert!(matches!(
            incident.acknowledge("sam", t0()),
            Err(ProviderError::InvalidStateTransition(_))
        ));
        assert!(incident.resolve("sam", None, t0()).is_err());
    }

    #[test]
    fn test_empty_note_rejected() {
        let mut incident = incident();
        assert!(incident.add_note("sam", "  ", t0()).is_err());
        incident.add_note("sam", "looking", t0()).unwrap();
        assert_eq!(incident.timeline.last().unwrap().kind, TimelineKind::Note);
    }

    #[test]
    fn test_fingerprint() {
        let fingerprint = incident().fingerprint();
        assert_eq!(fingerprint.len(), 64);
        assert_eq!(fingerprint, incident().fingerprint());

        // "checkout" + "prod" and "checkoutp" + "rod" concatenate identically
        let mut a = incident();
        let mut b = incident();
        a.service = "checkout".to_string();
        a.environment = "prod".to_string();
        b.service = "checkoutp".to_string();
        b.environment = "rod".to_string();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_severity_parsing_and_order() {
        assert_eq!("sev1".parse::<Severity>().unwrap(), Severity::Sev1);
        assert!(Severity::Sev1 < Severity::Sev3);
        assert_eq!(Severity::Sev4.level(), 4);
    }
}
