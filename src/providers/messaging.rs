use crate::enrichment::Enrichment;
use crate::error::{ProviderError, Result};
use crate::filter::{matches_opt, Page};
use crate::models::{Channel, Message, NewMessage};
use crate::plugin::{to_payload, Capability, Provider, ProviderRequest};
use crate::query::TextQuery;
use crate::seed::{self, DetRng, SeedClock};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use validator::Validate;

const PROVIDER_ID: &str = "mock-messaging";
const OPERATIONS: &[&str] = &["list_channels", "history", "post", "thread", "search"];
const DEPLOY_INTERVAL_HOURS: i64 = 4;
const ARCHIVED_CHANNEL: &str = "war-room-checkout-migration";

/// Filter for searching messages
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageQuery {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(flatten)]
    pub page: Page,
}

/// Scripted incident-channel conversation: (minutes ago, author, text, replies)
const INCIDENT_SCRIPT: &[(i64, &str, &str, &[(&str, &str)])] = &[
    (
        16,
        "priya.nair",
        "Declaring INC for payments: Visa authorisations failing in prod",
        &[
            ("diego.santos", "Seeing 502s from the acquirer since 11:40"),
            ("priya.nair", "Failing over to the secondary acquirer now"),
        ],
    ),
    (
        150,
        "jon.bakker",
        "Inventory deadlocks during the flash sale are back under control",
        &[("aisha.rahman", "Lock ordering fix is tracked in OPS-105")],
    ),
    (
        320,
        "noah.fischer",
        "Search results stale for some users, replica lag on search-index",
        &[],
    ),
    (
        1_150,
        "sam.rivera",
        "Auth connection pool exhausted, login errors elevated",
        &[("lena.kowalski", "Batch job paused, pool recovering")],
    ),
];

struct Mailbox {
    channels: HashMap<String, Channel>,
    messages: HashMap<String, Message>,
    next_id: u64,
}

impl Mailbox {
    fn allocate_id(&mut self) -> String {
        let id = format!("msg-{:06}", self.next_id);
        self.next_id += 1;
        id
    }

    fn add_channel(
        &mut self,
        name: &str,
        topic: &str,
        members: Vec<String>,
        created_at: DateTime<Utc>,
    ) {
        let id = format!("C{:03}", self.channels.len() + 1);
        self.channels.insert(
            name.to_string(),
            Channel {
                id,
                name: name.to_string(),
                topic: topic.to_string(),
                archived: false,
                members,
                created_at,
            },
        );
    }

    fn insert(
        &mut self,
        channel: &str,
        author: &str,
        text: &str,
        at: DateTime<Utc>,
        thread_id: Option<&str>,
    ) -> Message {
        let id = self.allocate_id();
        let message = Message {
            id: id.clone(),
            channel: channel.to_string(),
            author: author.to_string(),
            text: text.to_string(),
            timestamp: at,
            thread_id: thread_id.map(str::to_string),
            reply_count: 0,
            url: None,
        };
        if let Some(root) = thread_id.and_then(|t| self.messages.get_mut(t)) {
            root.reply_count += 1;
        }
        self.messages.insert(id, message.clone());
        message
    }
}

fn chronological(messages: &mut [Message]) {
    messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
}

/// Mock chat workspace
pub struct MockMessagingProvider {
    enrichment: Enrichment,
    mailbox: Mutex<Mailbox>,
}

impl MockMessagingProvider {
    pub fn new(clock: SeedClock, enrichment: Enrichment) -> Self {
        let mut mailbox = Mailbox {
            channels: HashMap::new(),
            messages: HashMap::new(),
            next_id: 1,
        };
        let opened = clock.history_start();
        let everyone: Vec<String> = seed::TEAMS
            .iter()
            .flat_map(|t| t.members.iter().map(|m| m.to_string()))
            .collect();

        mailbox.add_channel("incidents", "Active incident coordination", everyone.clone(), opened);
        mailbox.add_channel("deploys", "Deploy announcements", everyone.clone(), opened);
        for team in seed::TEAMS {
            let name = format!("{}-oncall", team.name);
            let topic = format!("On-call for {}: {}", team.name, team.oncall);
            let members = team.members.iter().map(|m| m.to_string()).collect();
            mailbox.add_channel(&name, &topic, members, opened);
        }
        mailbox.add_channel(ARCHIVED_CHANNEL, "Checkout datastore migration", everyone, opened);
        if let Some(channel) = mailbox.channels.get_mut(ARCHIVED_CHANNEL) {
            channel.archived = true;
        }

        for (minutes_ago, author, text, replies) in INCIDENT_SCRIPT {
            if Duration::minutes(*minutes_ago) > clock.history() {
                continue;
            }
            let at = clock.minutes_ago(*minutes_ago);
            let root = mailbox.insert("incidents", author, text, at, None);
            for (i, (reply_author, reply_text)) in replies.iter().enumerate() {
                let reply_at = at + Duration::minutes(2 * (i as i64 + 1));
                mailbox.insert("incidents", reply_author, reply_text, reply_at, Some(&root.id));
            }
        }

        let mut rng = DetRng::new("messaging.deploys");
        let services: Vec<_> = seed::application_services().collect();
        let deploys = clock.history().num_hours() / DEPLOY_INTERVAL_HOURS;
        for n in 0..deploys {
            let service = rng.pick(&services);
            let deployer = rng.pick(seed::owner_of(service.name).members);
            let minutes_ago = (n * DEPLOY_INTERVAL_HOURS) * 60 + rng.range(5, 55);
            let text = format!(
                "Deployed {} v1.{}.{} to prod",
                service.name,
                40 + n,
                rng.range(0, 9)
            );
            mailbox.insert("deploys", deployer, &text, clock.minutes_ago(minutes_ago), None);
        }

        for team in seed::TEAMS {
            let channel = format!("{}-oncall", team.name);
            let text = format!("Handing over on-call to {}, no open pages", team.oncall);
            let author = team.members[team.members.len() - 1];
            mailbox.insert(&channel, author, &text, clock.hours_ago(9), None);
        }

        tracing::info!(
            channels = mailbox.channels.len(),
            messages = mailbox.messages.len(),
            "Seeded mock chat workspace"
        );
        crate::metrics::set_seeded_records(PROVIDER_ID, mailbox.messages.len());

        Self {
            enrichment,
            mailbox: Mutex::new(mailbox),
        }
    }

    /// Channels sorted by name, optionally filtered by name or topic
    pub fn list_channels(&self, text: Option<&str>) -> Result<Vec<Channel>> {
        let query = TextQuery::parse_opt(text)?;
        let mut channels: Vec<Channel> = self
            .mailbox
            .lock()
            .channels
            .values()
            .filter(|c| query.matches(&[c.name.as_str(), c.topic.as_str()]))
            .cloned()
            .collect();
        channels.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(channels)
    }

    /// Top-level messages of a channel, oldest first
    pub fn history(&self, channel: &str, page: &Page) -> Result<Vec<Message>> {
        let mut messages: Vec<Message> = {
            let mailbox = self.mailbox.lock();
            if !mailbox.channels.contains_key(channel) {
                return Err(ProviderError::NotFound(format!("Channel {} not found", channel)));
            }
            mailbox
                .messages
                .values()
                .filter(|m| m.channel == channel && m.thread_id.is_none())
                .cloned()
                .collect()
        };
        chronological(&mut messages);
        tracing::debug!(channel = %channel, messages = messages.len(), "Read channel history");
        Ok(self.enrichment.apply_all(page.apply(messages)))
    }

    pub fn post(&self, request: NewMessage) -> Result<Message> {
        request.validate()?;
        let message = {
            let mut mailbox = self.mailbox.lock();
            let channel = mailbox.channels.get(&request.channel).ok_or_else(|| {
                ProviderError::NotFound(format!("Channel {} not found", request.channel))
            })?;
            if channel.archived {
                tracing::warn!(channel = %request.channel, "Rejected post to archived channel");
                return Err(ProviderError::InvalidStateTransition(format!(
                    "Channel {} is archived",
                    request.channel
                )));
            }
            if let Some(thread_id) = &request.thread_id {
                let root = mailbox.messages.get(thread_id).ok_or_else(|| {
                    ProviderError::NotFound(format!("Message {} not found", thread_id))
                })?;
                if root.channel != request.channel || root.thread_id.is_some() {
                    return Err(ProviderError::Validation(format!(
                        "{} is not a thread root in {}",
                        thread_id, request.channel
                    )));
                }
            }
            let message = mailbox.insert(
                &request.channel,
                &request.author,
                &request.text,
                Utc::now(),
                request.thread_id.as_deref(),
            );
            crate::metrics::set_seeded_records(PROVIDER_ID, mailbox.messages.len());
            message
        };
        tracing::info!(channel = %message.channel, message = %message.id, "Message posted");
        Ok(self.enrichment.apply(message))
    }

    /// Thread root followed by its replies, oldest first
    ///
    /// Passing the id of a reply returns the whole thread it belongs to.
    pub fn thread(&self, message_id: &str) -> Result<Vec<Message>> {
        let mut messages: Vec<Message> = {
            let mailbox = self.mailbox.lock();
            let message = mailbox
                .messages
                .get(message_id)
                .ok_or_else(|| {
                    ProviderError::NotFound(format!("Message {} not found", message_id))
                })?;
            let root_id = message.thread_id.clone().unwrap_or_else(|| message.id.clone());
            mailbox
                .messages
                .values()
                .filter(|m| m.id == root_id || m.thread_id.as_deref() == Some(root_id.as_str()))
                .cloned()
                .collect()
        };
        chronological(&mut messages);
        Ok(self.enrichment.apply_all(messages))
    }

    /// Matching messages across channels, newest first
    pub fn search(&self, query: &MessageQuery) -> Result<Vec<Message>> {
        let text = TextQuery::parse_opt(query.text.as_deref())?;
        let mut messages: Vec<Message> = self
            .mailbox
            .lock()
            .messages
            .values()
            .filter(|m| {
                matches_opt(query.channel.as_deref(), &m.channel)
                    && matches_opt(query.author.as_deref(), &m.author)
                    && text.matches(&m.search_fields())
            })
            .cloned()
            .collect();
        chronological(&mut messages);
        messages.reverse();

        tracing::debug!(matched = messages.len(), "Searched messages");
        Ok(self.enrichment.apply_all(query.page.apply(messages)))
    }
}

#[derive(Debug, Deserialize)]
struct ListChannelsParams {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    channel: String,
    #[serde(flatten)]
    page: Page,
}

#[derive(Debug, Deserialize)]
struct ThreadParams {
    message_id: String,
}

#[async_trait]
impl Provider for MockMessagingProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    fn display_name(&self) -> &str {
        "Mock Chat Workspace"
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::Messaging]
    }

    fn operations(&self, capability: Capability) -> &'static [&'static str] {
        match capability {
            Capability::Messaging => OPERATIONS,
            _ => &[],
        }
    }

    fn record_count(&self) -> usize {
        self.mailbox.lock().messages.len()
    }

    async fn handle(&self, request: &ProviderRequest) -> Result<Value> {
        match request.operation.as_str() {
            "list_channels" => {
                let p: ListChannelsParams = request.params()?;
                to_payload(&self.list_channels(p.text.as_deref())?)
            }
            "history" => {
                let p: HistoryParams = request.params()?;
                to_payload(&self.history(&p.channel, &p.page)?)
            }
            "post" => to_payload(&self.post(request.params()?)?),
            "thread" => {
                let p: ThreadParams = request.params()?;
                to_payload(&self.thread(&p.message_id)?)
            }
            "search" => to_payload(&self.search(&request.params()?)?),
            _ => Err(request.unsupported()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn provider() -> MockMessagingProvider {
        let clock = SeedClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(), 48);
        MockMessagingProvider::new(clock, Enrichment::disabled())
    }

    #[test]
    fn test_seeded_channels() {
        let p = provider();
        let channels = p.list_channels(None).unwrap();
        assert_eq!(channels.len(), 3 + seed::TEAMS.len());
        assert_eq!(channels[0].name, "commerce-oncall");

        let oncall = p.list_channels(Some("oncall")).unwrap();
        assert_eq!(oncall.len(), seed::TEAMS.len());
    }

    #[test]
    fn test_history_is_chronological_and_top_level() {
        let p = provider();
        let history = p.history("incidents", &Page::default()).unwrap();
        assert_eq!(history.len(), INCIDENT_SCRIPT.len());
        assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert!(history.iter().all(|m| m.thread_id.is_none()));
        assert_eq!(history[0].author, "sam.rivera");

        let deploys = p.history("deploys", &Page::new(5, 0)).unwrap();
        assert_eq!(deploys.len(), 5);

        assert!(matches!(
            p.history("random", &Page::default()),
            Err(ProviderError::NotFound(_))
        ));
    }

    #[test]
    fn test_thread_replies() {
        let p = provider();
        let history = p.history("incidents", &Page::default()).unwrap();
        let visa = history.last().unwrap();
        assert_eq!(visa.reply_count, 2);

        p.post(
            NewMessage::new("incidents", "kai.tanaka", "Status page updated")
                .in_thread(&visa.id),
        )
        .unwrap();
        let thread = p.thread(&visa.id).unwrap();
        assert_eq!(thread.len(), 4);
        assert_eq!(thread[0].id, visa.id);
        assert_eq!(thread[0].reply_count, 3);

        let from_reply = p.thread(&thread[1].id).unwrap();
        assert_eq!(from_reply.len(), 4);
    }

    #[test]
    fn test_post_rejections() {
        let p = provider();
        assert!(matches!(
            p.post(NewMessage::new("nowhere", "kai.tanaka", "hello")),
            Err(ProviderError::NotFound(_))
        ));
        assert!(matches!(
            p.post(NewMessage::new(ARCHIVED_CHANNEL, "kai.tanaka", "hello")),
            Err(ProviderError::InvalidStateTransition(_))
        ));
        assert!(matches!(
            p.post(NewMessage::new("deploys", "kai.tanaka", "")),
            Err(ProviderError::Validation(_))
        ));
    }

    #[test]
    fn test_search() {
        let p = provider();
        let found = p
            .search(&MessageQuery {
                text: Some("\"connection pool\" OR acquirer".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(found.len(), 3);
        assert!(found.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));

        let handovers = p
            .search(&MessageQuery {
                text: Some("handing over".to_string()),
                channel: Some("platform-oncall".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(handovers.len(), 1);
        assert_eq!(handovers[0].author, "ben.adeyemi");
    }

    #[tokio::test]
    async fn test_handle_history() {
        let p = provider();
        let value = p
            .handle(&ProviderRequest::new(
                Capability::Messaging,
                "history",
                json!({"channel": "incidents", "limit": 2}),
            ))
            .await
            .unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }
}
