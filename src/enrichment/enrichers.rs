use super::Enrichment;
use crate::models::{Incident, LogEntry, Message, MetricKind, MetricSeries, Service, Ticket};
use crate::seed;
use crate::waveform::{service_series, sparkline};
use chrono::Duration;

const ENRICHED_BY: &str = "mock-enrichment";

/// Records that can carry cosmetic enrichment
pub trait Enrich {
    fn enrich(&mut self, enrichment: &Enrichment);
}

impl Enrich for Incident {
    fn enrich(&mut self, enrichment: &Enrichment) {
        self.url = Some(enrichment.incident_url(&self.id));
        self.metadata
            .insert("enriched_by".to_string(), ENRICHED_BY.to_string());
        self.metadata
            .insert("service_url".to_string(), enrichment.service_url(&self.service));
        self.metadata.insert(
            "dashboard_url".to_string(),
            enrichment.dashboard_url(&self.service),
        );
        self.metadata
            .insert("runbook_url".to_string(), enrichment.runbook_url(&self.service));
        self.metadata.insert(
            "logs_url".to_string(),
            enrichment.logs_url(&self.service, self.created_at),
        );
        self.metadata.insert(
            "owning_team".to_string(),
            seed::owner_of(&self.service).name.to_string(),
        );
        self.metadata
            .insert("fingerprint".to_string(), self.fingerprint());

        if enrichment.waveforms_enabled() {
            self.sparkline = incident_sparkline(self, enrichment);
        }
    }
}

/// Latency around incident creation, with the incident's own amplification
fn incident_sparkline(incident: &Incident, enrichment: &Enrichment) -> Option<Vec<f64>> {
    let waveform = service_series(
        &incident.service,
        MetricKind::LatencyP99Ms,
        enrichment.anchor(),
    )
    .with_alert_windows(vec![incident.alert_window()]);

    let start = incident.created_at - Duration::minutes(45);
    let end = incident.created_at + Duration::minutes(15);
    let points = waveform.generate(start, end, Duration::minutes(1)).ok()?;
    let values: Vec<f64> = points.iter().map(|p| (p.value * 10.0).round() / 10.0).collect();

    Some(sparkline(&values, enrichment.sparkline_points()))
}

impl Enrich for Ticket {
    fn enrich(&mut self, enrichment: &Enrichment) {
        self.url = Some(enrichment.ticket_url(&self.key));
    }
}

impl Enrich for Service {
    fn enrich(&mut self, enrichment: &Enrichment) {
        self.url = Some(enrichment.service_url(&self.name));
        self.metadata
            .insert("enriched_by".to_string(), ENRICHED_BY.to_string());
        self.metadata
            .insert("dashboard_url".to_string(), enrichment.dashboard_url(&self.name));
        self.metadata
            .insert("runbook_url".to_string(), enrichment.runbook_url(&self.name));
        self.metadata.insert(
            "oncall".to_string(),
            seed::owner_of(&self.name).oncall.to_string(),
        );
    }
}

impl Enrich for LogEntry {
    fn enrich(&mut self, enrichment: &Enrichment) {
        self.url = Some(enrichment.logs_url(&self.service, self.timestamp));
    }
}

impl Enrich for Message {
    fn enrich(&mut self, enrichment: &Enrichment) {
        self.url = Some(enrichment.message_url(&self.channel, &self.id));
    }
}

impl Enrich for MetricSeries {
    fn enrich(&mut self, enrichment: &Enrichment) {
        self.url = Some(enrichment.series_url(&self.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnrichmentConfig;
    use crate::models::{NewIncident, Severity};
    use chrono::{TimeZone, Utc};

    fn enrichment(waveforms: bool) -> Enrichment {
        Enrichment::new(
            EnrichmentConfig {
                synthetic_waveforms: waveforms,
                sparkline_points: 12,
                ..Default::default()
            },
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        )
    }

    fn incident() -> Incident {
        Incident::new(
            "INC-42".to_string(),
            NewIncident::new("Checkout latency", "checkout", Severity::Sev1),
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_incident_enrichment() {
        let enriched = enrichment(true).apply(incident());
        assert_eq!(
            enriched.url.as_deref(),
            Some("https://ops.example.test/incidents/INC-42")
        );
        assert_eq!(enriched.metadata["owning_team"], "commerce");
        assert!(enriched.metadata.contains_key("runbook_url"));

        let spark = enriched.sparkline.unwrap();
        assert_eq!(spark.len(), 12);
        // amplification after creation lifts the tail above the head
        assert!(spark[11] > spark[0]);
    }

    #[test]
    fn test_waveforms_can_be_switched_off() {
        let enriched = enrichment(false).apply(incident());
        assert!(enriched.url.is_some());
        assert!(enriched.sparkline.is_none());
    }

    #[test]
    fn test_disabled_enrichment_is_noop() {
        let original = incident();
        let enriched = Enrichment::disabled().apply(original.clone());
        assert_eq!(enriched, original);
    }
}
