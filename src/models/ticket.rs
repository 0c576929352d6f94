use crate::error::{ProviderError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use validator::Validate;

/// A work-tracking ticket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    /// Key (`OPS-<n>`)
    pub key: String,
    pub summary: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub assignee: Option<String>,
    pub reporter: String,
    pub labels: Vec<String>,
    /// Incident this ticket follows up on
    pub linked_incident: Option<String>,
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Ticket {
    pub fn new(key: String, request: NewTicket, now: DateTime<Utc>) -> Self {
        Self {
            key,
            summary: request.summary,
            description: request.description,
            status: TicketStatus::Open,
            priority: request.priority,
            assignee: request.assignee,
            reporter: request.reporter,
            labels: request.labels,
            linked_incident: request.linked_incident,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
            url: None,
        }
    }

    /// Move the ticket to `target`. Moving to the current status is a no-op.
    pub fn transition(&mut self, target: TicketStatus, at: DateTime<Utc>) -> Result<()> {
        if self.status == target {
            return Ok(());
        }
        if !self.status.can_transition_to(target) {
            return Err(ProviderError::InvalidStateTransition(format!(
                "{} cannot move from {} to {}",
                self.key, self.status, target
            )));
        }
        self.status = target;
        self.updated_at = at;
        Ok(())
    }

    pub fn add_comment(&mut self, author: &str, body: &str, at: DateTime<Utc>) -> Result<()> {
        if body.trim().is_empty() {
            return Err(ProviderError::Validation(
                "comment body must not be empty".to_string(),
            ));
        }
        self.comments.push(Comment {
            author: author.to_string(),
            body: body.to_string(),
            created_at: at,
        });
        self.updated_at = at;
        Ok(())
    }

    pub fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![
            self.key.as_str(),
            self.summary.as_str(),
            self.description.as_str(),
        ];
        fields.extend(self.labels.iter().map(String::as_str));
        fields
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(ascii_case_insensitive)]
pub enum TicketStatus {
    Open,
    InProgress,
    Blocked,
    Done,
}

impl TicketStatus {
    /// Done is terminal; every other status may move anywhere else
    pub fn can_transition_to(&self, target: TicketStatus) -> bool {
        !matches!(self, TicketStatus::Done) && *self != target
    }
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
pub enum TicketPriority {
    Highest,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Request to open a ticket
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewTicket {
    #[validate(length(min = 1, max = 255))]
    pub summary: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_priority")]
    pub priority: TicketPriority,

    #[serde(default)]
    pub assignee: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub reporter: String,

    #[serde(default)]
    pub labels: Vec<String>,

    #[serde(default)]
    pub linked_incident: Option<String>,
}

fn default_priority() -> TicketPriority {
    TicketPriority::Medium
}
