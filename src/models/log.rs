use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumIter, EnumString};
use validator::Validate;

/// A single log line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub service: String,
    pub environment: String,
    pub level: LogLevel,
    pub message: String,
    pub trace_id: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl LogEntry {
    pub fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.message.as_str(), self.service.as_str()];
        fields.extend(self.attributes.values().map(String::as_str));
        if let Some(trace) = &self.trace_id {
            fields.push(trace);
        }
        fields
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
    EnumIter,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Request to append a log line
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewLogEntry {
    #[validate(length(min = 1, max = 100))]
    pub service: String,

    #[serde(default = "default_level")]
    pub level: LogLevel,

    #[validate(length(min = 1, max = 4096))]
    pub message: String,

    #[serde(default)]
    pub environment: Option<String>,

    #[serde(default)]
    pub attributes: BTreeMap<String, String>,

    /// Defaults to now
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

fn default_level() -> LogLevel {
    LogLevel::Info
}
