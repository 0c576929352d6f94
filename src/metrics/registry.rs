/// Metrics registry management
///
/// High-level handle over the global Prometheus registry used by the CLI.

use super::*;

/// Central metrics registry
pub struct MetricsRegistry {
    enabled: bool,
}

impl MetricsRegistry {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Register metrics if enabled
    pub fn init(&self) -> Result<(), prometheus::Error> {
        if !self.enabled {
            tracing::info!("Prometheus metrics disabled in configuration");
            return Ok(());
        }
        init_metrics()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> String {
        if !self.enabled {
            return String::new();
        }
        gather_metrics()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_registry_exports_nothing() {
        let registry = MetricsRegistry::new(false);
        assert!(registry.init().is_ok());
        assert!(!registry.is_enabled());
        assert!(registry.export().is_empty());
    }

    #[test]
    fn test_enabled_registry_exports_provider_metrics() {
        let registry = MetricsRegistry::default();
        registry.init().unwrap();
        record_request("registry-test", "tickets", "get", false, 0.001);
        set_seeded_records("registry-test", 3);

        let exported = registry.export();
        assert!(exported.contains("# TYPE mock_providers_provider_requests_total counter"));
        assert!(exported.contains("# TYPE mock_providers_provider_seeded_records gauge"));
        assert!(exported.contains("registry-test"));
    }
}
