//! Shared plugin interface
//!
//! Every mock provider implements [`Provider`]. A host talks to providers with
//! a JSON [`ProviderRequest`] naming a capability and an operation, and gets a
//! [`ProviderResponse`] envelope back from the [`PluginHost`].

mod host;

pub use host::{build_host, CapabilityDescriptor, HostHealth, PluginHost};

use crate::error::{ProviderError, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use uuid::Uuid;

/// Backend family a provider stands in for
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Capability {
    Incidents,
    Logs,
    Metrics,
    Tickets,
    Messaging,
    Services,
    Secrets,
}

impl Capability {
    pub fn all() -> Vec<Capability> {
        Capability::iter().collect()
    }
}

/// Request routed to a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    pub capability: Capability,
    pub operation: String,
    #[serde(default)]
    pub params: Value,
}

impl ProviderRequest {
    pub fn new(capability: Capability, operation: impl Into<String>, params: Value) -> Self {
        Self {
            capability,
            operation: operation.into(),
            params,
        }
    }

    /// Deserialize the params; `null` is treated as an empty object
    pub fn params<T: DeserializeOwned>(&self) -> Result<T> {
        let params = if self.params.is_null() {
            Value::Object(Default::default())
        } else {
            self.params.clone()
        };
        serde_json::from_value(params).map_err(|e| {
            ProviderError::Validation(format!(
                "invalid params for {}.{}: {}",
                self.capability, self.operation, e
            ))
        })
    }

    pub fn unsupported(&self) -> ProviderError {
        ProviderError::unsupported(self.capability, self.operation.clone())
    }
}

/// Envelope returned by the host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Correlates the response with host log lines
    pub request_id: Uuid,
    pub provider: Option<String>,
    pub capability: Capability,
    pub operation: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// Health report of one provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderHealth {
    pub provider: String,
    pub status: HealthStatus,
    pub records: usize,
    pub detail: String,
}

/// Serialize a provider result into the response payload
pub fn to_payload<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Contract every mock provider implements
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier, e.g. `mock-incidents`
    fn id(&self) -> &str;

    /// Human-readable name
    fn display_name(&self) -> &str;

    fn capabilities(&self) -> Vec<Capability>;

    /// Operations supported for `capability`
    fn operations(&self, capability: Capability) -> &'static [&'static str];

    /// Number of records currently held
    fn record_count(&self) -> usize;

    /// Handle a routed request
    async fn handle(&self, request: &ProviderRequest) -> Result<Value>;

    async fn health(&self) -> ProviderHealth {
        let records = self.record_count();
        let status = if records > 0 {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };
        ProviderHealth {
            provider: self.id().to_string(),
            status,
            records,
            detail: format!("{} in-memory records", records),
        }
    }

    fn supports(&self, capability: Capability, operation: &str) -> bool {
        self.capabilities().contains(&capability)
            && self.operations(capability).contains(&operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Params {
        #[serde(default)]
        limit: Option<usize>,
    }

    #[test]
    fn test_capability_strings() {
        assert_eq!(Capability::Incidents.to_string(), "incidents");
        assert_eq!("SECRETS".parse::<Capability>().unwrap(), Capability::Secrets);
        assert_eq!(
            serde_json::to_value(Capability::Messaging).unwrap(),
            json!("messaging")
        );
        assert_eq!(Capability::all().len(), 7);
    }

    #[test]
    fn test_null_params_become_empty_object() {
        let req = ProviderRequest::new(Capability::Logs, "search", Value::Null);
        let params: Params = req.params().unwrap();
        assert!(params.limit.is_none());
    }

    #[test]
    fn test_bad_params_are_validation_errors() {
        let req = ProviderRequest::new(Capability::Logs, "search", json!({"limit": "ten"}));
        let err = req.params::<Params>().unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(err.to_string().contains("logs.search"));
    }
}
