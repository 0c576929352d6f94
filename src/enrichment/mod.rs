/// Cosmetic enrichment for provider records
///
/// This module layers presentation details on top of seeded data:
/// - Deep links into a fictional ops console
/// - Ownership and runbook metadata
/// - Latency sparklines on incidents
///
/// Disabled enrichment leaves records untouched.

pub mod enrichers;

pub use enrichers::Enrich;

use crate::config::EnrichmentConfig;
use chrono::{DateTime, SecondsFormat, Utc};

/// Enrichment settings bound to the seed anchor
#[derive(Debug, Clone)]
pub struct Enrichment {
    config: EnrichmentConfig,
    anchor: DateTime<Utc>,
}

impl Enrichment {
    pub fn new(config: EnrichmentConfig, anchor: DateTime<Utc>) -> Self {
        Self { config, anchor }
    }

    pub fn disabled() -> Self {
        Self::new(EnrichmentConfig::disabled(), Utc::now())
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn waveforms_enabled(&self) -> bool {
        self.config.enabled && self.config.synthetic_waveforms
    }

    pub fn sparkline_points(&self) -> usize {
        self.config.sparkline_points
    }

    pub fn anchor(&self) -> DateTime<Utc> {
        self.anchor
    }

    fn link(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn incident_url(&self, id: &str) -> String {
        self.link(&format!("incidents/{}", id))
    }

    pub fn ticket_url(&self, key: &str) -> String {
        self.link(&format!("tickets/{}", key))
    }

    pub fn service_url(&self, name: &str) -> String {
        self.link(&format!("services/{}", name))
    }

    pub fn runbook_url(&self, service: &str) -> String {
        self.link(&format!("runbooks/{}", service))
    }

    pub fn dashboard_url(&self, service: &str) -> String {
        self.link(&format!("dashboards/{}", service))
    }

    pub fn series_url(&self, series_id: &str) -> String {
        self.link(&format!("metrics/{}", series_id))
    }

    pub fn logs_url(&self, service: &str, around: DateTime<Utc>) -> String {
        self.link(&format!(
            "logs?service={}&around={}",
            service,
            around.to_rfc3339_opts(SecondsFormat::Secs, true)
        ))
    }

    pub fn message_url(&self, channel: &str, message_id: &str) -> String {
        self.link(&format!("chat/{}/{}", channel, message_id))
    }

    /// Enrich one record; a no-op when disabled
    pub fn apply<T: Enrich>(&self, mut item: T) -> T {
        if self.is_enabled() {
            item.enrich(self);
        }
        item
    }

    pub fn apply_all<T: Enrich>(&self, items: Vec<T>) -> Vec<T> {
        items.into_iter().map(|item| self.apply(item)).collect()
    }
}
