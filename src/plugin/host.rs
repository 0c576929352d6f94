//! In-process plugin host that routes requests to registered providers.

use super::{Capability, HealthStatus, Provider, ProviderHealth, ProviderRequest, ProviderResponse};
use crate::config::MockConfig;
use crate::enrichment::Enrichment;
use crate::error::{ProviderError, Result};
use crate::providers::{
    AlertWindowSource, MockIncidentProvider, MockLogProvider, MockMessagingProvider,
    MockMetricsProvider, MockSecretsProvider, MockServiceProvider, MockTicketProvider,
};
use crate::seed::SeedClock;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

/// One provider's entry in the capability registry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapabilityDescriptor {
    pub provider: String,
    pub display_name: String,
    pub capability: Capability,
    pub operations: Vec<String>,
}

/// Aggregated health of every registered provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostHealth {
    pub status: HealthStatus,
    pub providers: Vec<ProviderHealth>,
}

/// Registry of providers, in registration order
pub struct PluginHost {
    providers: RwLock<Vec<Arc<dyn Provider>>>,
}

impl PluginHost {
    /// Create an empty host
    pub fn new() -> Self {
        Self {
            providers: RwLock::new(Vec::new()),
        }
    }

    /// Seed and register every provider enabled in configuration
    pub fn from_config(config: &MockConfig) -> Result<Self> {
        let host = Self::new();
        let clock = SeedClock::from_config(&config.seed);
        let enrichment = Enrichment::new(config.enrichment.clone(), clock.anchor());
        let enabled = |c: Capability| config.providers.is_enabled(c);

        let incidents = enabled(Capability::Incidents)
            .then(|| Arc::new(MockIncidentProvider::new(clock, enrichment.clone())));
        let windows = incidents
            .as_ref()
            .map(|p| p.alert_windows())
            .unwrap_or_default();

        if let Some(incidents) = &incidents {
            host.register(incidents.clone())?;
        }
        if enabled(Capability::Logs) {
            host.register(Arc::new(MockLogProvider::new(
                clock,
                enrichment.clone(),
                config.seed.log_entries_per_service,
                &windows,
            )))?;
        }
        if enabled(Capability::Metrics) {
            let mut metrics = MockMetricsProvider::new(clock, enrichment.clone());
            if let Some(incidents) = &incidents {
                let source: Arc<dyn AlertWindowSource> = incidents.clone();
                metrics = metrics.with_alert_source(source);
            }
            host.register(Arc::new(metrics))?;
        }
        if enabled(Capability::Tickets) {
            host.register(Arc::new(MockTicketProvider::new(clock, enrichment.clone())))?;
        }
        if enabled(Capability::Messaging) {
            host.register(Arc::new(MockMessagingProvider::new(clock, enrichment.clone())))?;
        }
        if enabled(Capability::Services) {
            host.register(Arc::new(MockServiceProvider::new(enrichment.clone())))?;
        }
        if enabled(Capability::Secrets) {
            host.register(Arc::new(MockSecretsProvider::new(clock)))?;
        }

        info!(
            providers = host.len(),
            anchor = %clock.anchor(),
            "Plugin host ready"
        );
        Ok(host)
    }

    /// Register a provider; ids must be unique
    pub fn register(&self, provider: Arc<dyn Provider>) -> Result<()> {
        let mut providers = self.providers.write();
        if providers.iter().any(|p| p.id() == provider.id()) {
            return Err(ProviderError::Conflict(format!(
                "provider {} is already registered",
                provider.id()
            )));
        }
        info!(
            provider = %provider.id(),
            capabilities = ?provider.capabilities(),
            "Registered provider"
        );
        providers.push(provider);
        Ok(())
    }

    /// Remove a provider from the host
    pub fn unregister(&self, id: &str) -> Option<Arc<dyn Provider>> {
        let mut providers = self.providers.write();
        let index = providers.iter().position(|p| p.id() == id)?;
        debug!(provider = %id, "Unregistered provider");
        Some(providers.remove(index))
    }

    /// All providers in registration order
    pub fn providers(&self) -> Vec<Arc<dyn Provider>> {
        self.providers.read().clone()
    }

    pub fn provider(&self, id: &str) -> Option<Arc<dyn Provider>> {
        self.providers.read().iter().find(|p| p.id() == id).cloned()
    }

    /// Providers declaring `capability`, in registration order
    pub fn providers_for(&self, capability: Capability) -> Vec<Arc<dyn Provider>> {
        self.providers
            .read()
            .iter()
            .filter(|p| p.capabilities().contains(&capability))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }

    fn route(&self, request: &ProviderRequest) -> Option<Arc<dyn Provider>> {
        self.providers
            .read()
            .iter()
            .find(|p| p.supports(request.capability, &request.operation))
            .cloned()
    }

    /// Route a request and return the raw result
    ///
    /// The first registered provider that supports the capability and
    /// operation handles it.
    pub async fn call(&self, request: &ProviderRequest) -> Result<Value> {
        let provider = self.route(request).ok_or_else(|| Self::unrouted(request))?;
        Self::dispatch(provider.as_ref(), request).await
    }

    /// Route a request to a specific provider and return the raw result
    pub async fn call_on(&self, id: &str, request: &ProviderRequest) -> Result<Value> {
        let provider = self
            .provider(id)
            .ok_or_else(|| ProviderError::NotFound(format!("Provider {} not found", id)))?;
        if !provider.supports(request.capability, &request.operation) {
            return Err(request.unsupported());
        }
        Self::dispatch(provider.as_ref(), request).await
    }

    /// Route a request and wrap the outcome in a response envelope
    pub async fn invoke(&self, request: ProviderRequest) -> ProviderResponse {
        let request_id = Uuid::new_v4();
        let provider = self.route(&request);
        let result = match &provider {
            Some(p) => Self::dispatch(p.as_ref(), &request)
                .instrument(tracing::debug_span!("invoke", %request_id))
                .await,
            None => Err(Self::unrouted(&request)),
        };
        Self::respond(request_id, provider.map(|p| p.id().to_string()), request, result)
    }

    /// Like [`invoke`](Self::invoke) but bypasses routing
    pub async fn invoke_on(&self, id: &str, request: ProviderRequest) -> ProviderResponse {
        let request_id = Uuid::new_v4();
        let result = self
            .call_on(id, &request)
            .instrument(tracing::debug_span!("invoke", %request_id))
            .await;
        if result.is_err() && self.provider(id).is_none() {
            warn!(provider = %id, "Request for unknown provider");
        }
        Self::respond(request_id, Some(id.to_string()), request, result)
    }

    async fn dispatch(provider: &dyn Provider, request: &ProviderRequest) -> Result<Value> {
        let start = Instant::now();
        let result = provider.handle(request).await;
        let elapsed = start.elapsed().as_secs_f64();
        let capability = request.capability.to_string();

        crate::metrics::record_request(
            provider.id(),
            &capability,
            &request.operation,
            result.is_ok(),
            elapsed,
        );

        match &result {
            Ok(_) => debug!(
                provider = %provider.id(),
                capability = %capability,
                operation = %request.operation,
                "Request handled"
            ),
            Err(e) => warn!(
                provider = %provider.id(),
                capability = %capability,
                operation = %request.operation,
                error = %e,
                "Request failed"
            ),
        }
        result
    }

    fn unrouted(request: &ProviderRequest) -> ProviderError {
        let capability = request.capability.to_string();
        crate::metrics::record_request("none", &capability, &request.operation, false, 0.0);
        warn!(
            capability = %capability,
            operation = %request.operation,
            "No provider supports request"
        );
        request.unsupported()
    }

    fn respond(
        request_id: Uuid,
        provider: Option<String>,
        request: ProviderRequest,
        result: Result<Value>,
    ) -> ProviderResponse {
        let (ok, data, error) = match result {
            Ok(data) => (true, Some(data), None),
            Err(e) => (false, None, Some(e.to_json())),
        };
        ProviderResponse {
            request_id,
            provider,
            capability: request.capability,
            operation: request.operation,
            ok,
            data,
            error,
        }
    }

    /// Health of every provider; degraded when any provider is, or when
    /// nothing is registered
    pub async fn health(&self) -> HostHealth {
        let providers = self.providers();
        let reports =
            futures::future::join_all(providers.iter().map(|p| p.health())).await;

        let status = if reports.is_empty()
            || reports.iter().any(|r| r.status == HealthStatus::Degraded)
        {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        HostHealth {
            status,
            providers: reports,
        }
    }

    /// Capability registry: one entry per provider and capability
    pub fn describe(&self) -> Vec<CapabilityDescriptor> {
        self.providers
            .read()
            .iter()
            .flat_map(|p| {
                p.capabilities().into_iter().map(move |capability| CapabilityDescriptor {
                    provider: p.id().to_string(),
                    display_name: p.display_name().to_string(),
                    capability,
                    operations: p
                        .operations(capability)
                        .iter()
                        .map(|op| op.to_string())
                        .collect(),
                })
            })
            .collect()
    }
}

impl Default for PluginHost {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a host from configuration
pub fn build_host(config: &MockConfig) -> Result<PluginHost> {
    PluginHost::from_config(config)
}
