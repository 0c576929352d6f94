use crate::error::{ProviderError, Result};
use crate::plugin::Capability;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::Validate;

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Main configuration for the mock provider host
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct MockConfig {
    /// Demo data seeding
    #[validate(nested)]
    pub seed: SeedConfig,

    /// Cosmetic enrichment
    #[validate(nested)]
    pub enrichment: EnrichmentConfig,

    /// Which providers get registered
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Logging and metrics
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl MockConfig {
    /// Load configuration from the embedded defaults, an optional file and environment
    pub fn load() -> Result<Self> {
        let config_path =
            std::env::var("MOCKOPS_CONFIG").unwrap_or_else(|_| "config/mockops.toml".to_string());

        let config: MockConfig = config::Config::builder()
            .add_source(config::File::from_str(
                DEFAULT_CONFIG,
                config::FileFormat::Toml,
            ))
            .add_source(config::File::with_name(&config_path).required(false))
            // Environment overrides (prefix: MOCKOPS__)
            .add_source(
                config::Environment::with_prefix("MOCKOPS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the embedded defaults layered with a specific file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ProviderError::Configuration(format!(
                "config file {} does not exist",
                path.display()
            )));
        }

        let config: MockConfig = config::Config::builder()
            .add_source(config::File::from_str(
                DEFAULT_CONFIG,
                config::FileFormat::Toml,
            ))
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ProviderError::Serialization(e.to_string()))
    }
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            seed: SeedConfig::default(),
            enrichment: EnrichmentConfig::default(),
            providers: ProvidersConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct SeedConfig {
    /// Instant all seeded timestamps are relative to.
    /// When unset the current time truncated to the hour is used.
    #[serde(default)]
    pub anchor: Option<DateTime<Utc>>,

    /// How far back seeded history reaches
    #[serde(default = "default_history_hours")]
    #[validate(range(min = 1, max = 720))]
    pub history_hours: u32,

    /// Seeded log lines per catalog service
    #[serde(default = "default_log_entries")]
    #[validate(range(min = 1, max = 10000))]
    pub log_entries_per_service: usize,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            anchor: None,
            history_hours: default_history_hours(),
            log_entries_per_service: default_log_entries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct EnrichmentConfig {
    /// Master switch for URLs, metadata and waveforms
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base URL used for deep links
    #[serde(default = "default_base_url")]
    #[validate(length(min = 1))]
    pub base_url: String,

    /// Attach sparklines to incidents
    #[serde(default = "default_true")]
    pub synthetic_waveforms: bool,

    /// Number of points in a sparkline
    #[serde(default = "default_sparkline_points")]
    #[validate(range(min = 2, max = 240))]
    pub sparkline_points: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_base_url(),
            synthetic_waveforms: true,
            sparkline_points: default_sparkline_points(),
        }
    }
}

impl EnrichmentConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProvidersConfig {
    /// Capabilities whose providers are registered with the host
    #[serde(default = "default_capabilities")]
    pub enabled: Vec<Capability>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            enabled: default_capabilities(),
        }
    }
}

impl ProvidersConfig {
    pub fn is_enabled(&self, capability: Capability) -> bool {
        self.enabled.contains(&capability)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObservabilityConfig {
    /// tracing EnvFilter directive used when RUST_LOG is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Emit JSON formatted logs
    #[serde(default)]
    pub json_logs: bool,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            json_logs: false,
            prometheus_enabled: true,
        }
    }
}

fn default_history_hours() -> u32 {
    48
}

fn default_log_entries() -> usize {
    40
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "https://ops.example.test".to_string()
}

fn default_sparkline_points() -> usize {
    24
}

fn default_capabilities() -> Vec<Capability> {
    Capability::all().to_vec()
}

fn default_log_filter() -> String {
    "ops_mock_providers=info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_embedded_defaults_match_default_impl() {
        let parsed: MockConfig = config::Config::builder()
            .add_source(config::File::from_str(
                DEFAULT_CONFIG,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(parsed, MockConfig::default());
    }

    #[test]
    fn test_from_file_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[seed]
anchor = "2024-03-04T12:00:00Z"
history_hours = 12

[enrichment]
base_url = "https://demo.local"

[providers]
enabled = ["incidents", "secrets"]
"#
        )
        .unwrap();

        let config = MockConfig::from_file(file.path()).unwrap();
        assert_eq!(config.seed.history_hours, 12);
        assert_eq!(
            config.seed.anchor.unwrap().to_rfc3339(),
            "2024-03-04T12:00:00+00:00"
        );
        assert_eq!(config.enrichment.base_url, "https://demo.local");
        assert!(config.enrichment.enabled);
        assert!(config.providers.is_enabled(Capability::Secrets));
        assert!(!config.providers.is_enabled(Capability::Logs));
    }

    #[test]
    fn test_validation_rejects_out_of_range() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[seed]\nhistory_hours = 5000").unwrap();

        let err = MockConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = MockConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_to_toml() {
        let rendered = MockConfig::default().to_toml().unwrap();
        assert!(rendered.contains("base_url"));
        assert!(rendered.contains("history_hours = 48"));
    }
}
