use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A chat channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub topic: String,
    pub archived: bool,
    pub members: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A chat message; replies carry the id of their thread root
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub channel: String,
    pub author: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub thread_id: Option<String>,
    pub reply_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Message {
    pub fn search_fields(&self) -> Vec<&str> {
        vec![self.text.as_str(), self.author.as_str(), self.channel.as_str()]
    }
}

/// Request to post a message
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewMessage {
    #[validate(length(min = 1, max = 80))]
    pub channel: String,

    #[validate(length(min = 1, max = 100))]
    pub author: String,

    #[validate(length(min = 1, max = 4000))]
    pub text: String,

    #[serde(default)]
    pub thread_id: Option<String>,
}

impl NewMessage {
    pub fn new(
        channel: impl Into<String>,
        author: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            author: author.into(),
            text: text.into(),
            thread_id: None,
        }
    }

    pub fn in_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }
}
