//! Common test utilities for the integration suites

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use ops_mock_providers::{build_host, Capability, MockConfig, PluginHost, ProviderRequest};
use serde_json::Value;
use std::collections::HashMap;

/// Fixed seed anchor, a Wednesday at noon UTC
pub fn anchor() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

/// Default configuration pinned to [`anchor`]
pub fn test_config() -> MockConfig {
    let mut config = MockConfig::default();
    config.seed.anchor = Some(anchor());
    config
}

/// Configuration registering only `capabilities`
pub fn config_with(capabilities: &[Capability]) -> MockConfig {
    let mut config = test_config();
    config.providers.enabled = capabilities.to_vec();
    config
}

pub fn test_host() -> PluginHost {
    build_host(&test_config()).expect("host builds from test config")
}

/// Invoke through the host and return the data payload, panicking on errors
pub async fn call(
    host: &PluginHost,
    capability: Capability,
    operation: &str,
    params: Value,
) -> Value {
    let response = host
        .invoke(ProviderRequest::new(capability, operation, params))
        .await;
    assert!(
        response.ok,
        "{}.{} failed: {:?}",
        capability, operation, response.error
    );
    response.data.expect("successful responses carry data")
}

/// Error code of a failing request
pub async fn error_code(
    host: &PluginHost,
    capability: Capability,
    operation: &str,
    params: Value,
) -> String {
    let response = host
        .invoke(ProviderRequest::new(capability, operation, params))
        .await;
    assert!(!response.ok, "{}.{} unexpectedly succeeded", capability, operation);
    response.error.expect("failed responses carry an error")["code"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

/// Parse Prometheus exposition text into metric name -> sample lines
pub fn parse_prometheus_output(output: &str) -> HashMap<String, Vec<String>> {
    let mut metrics = HashMap::new();
    let mut current_metric = String::new();

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.starts_with("# TYPE") {
            if let Some(name) = line.split_whitespace().nth(2) {
                current_metric = name.to_string();
            }
        } else if !line.starts_with('#') && !current_metric.is_empty() {
            metrics
                .entry(current_metric.clone())
                .or_insert_with(Vec::new)
                .push(line.to_string());
        }
    }

    metrics
}
