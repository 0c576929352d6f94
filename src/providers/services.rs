use crate::enrichment::Enrichment;
use crate::error::{ProviderError, Result};
use crate::filter::matches_opt;
use crate::models::{Service, ServiceOwners};
use crate::plugin::{to_payload, Capability, Provider, ProviderRequest};
use crate::query::TextQuery;
use crate::seed;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

const PROVIDER_ID: &str = "mock-services";
const OPERATIONS: &[&str] = &["list", "get", "dependencies", "dependents", "owners"];

/// Filter for listing catalog entries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceQuery {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub tier: Option<u8>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Mock service catalog
pub struct MockServiceProvider {
    enrichment: Enrichment,
    catalog: Mutex<HashMap<String, Service>>,
}

impl MockServiceProvider {
    pub fn new(enrichment: Enrichment) -> Self {
        let catalog: HashMap<String, Service> = seed::SERVICES
            .iter()
            .map(|s| {
                let service = Service {
                    name: s.name.to_string(),
                    team: s.team.to_string(),
                    tier: s.tier,
                    language: s.language.to_string(),
                    description: s.description.to_string(),
                    dependencies: s.dependencies.iter().map(|d| d.to_string()).collect(),
                    repository: format!("git@git.example.test:{}/{}.git", s.team, s.name),
                    url: None,
                    metadata: BTreeMap::new(),
                };
                (service.name.clone(), service)
            })
            .collect();

        tracing::info!(count = catalog.len(), "Seeded mock service catalog");
        crate::metrics::set_seeded_records(PROVIDER_ID, catalog.len());

        Self {
            enrichment,
            catalog: Mutex::new(catalog),
        }
    }

    /// Matching services sorted by tier, then name
    pub fn list(&self, query: &ServiceQuery) -> Result<Vec<Service>> {
        let text = TextQuery::parse_opt(query.text.as_deref())?;
        let mut services: Vec<Service> = self
            .catalog
            .lock()
            .values()
            .filter(|s| {
                matches_opt(query.team.as_deref(), &s.team)
                    && matches_opt(query.language.as_deref(), &s.language)
                    && query.tier.map_or(true, |t| t == s.tier)
                    && text.matches(&s.search_fields())
            })
            .cloned()
            .collect();
        services.sort_by(|a, b| a.tier.cmp(&b.tier).then_with(|| a.name.cmp(&b.name)));
        Ok(self.enrichment.apply_all(services))
    }

    pub fn get(&self, name: &str) -> Result<Service> {
        let service = self
            .catalog
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("Service {} not found", name)))?;
        Ok(self.enrichment.apply(service))
    }

    /// Services `name` calls, in breadth-first order
    ///
    /// With `transitive` the walk follows dependencies of dependencies and
    /// visits each service once, so cycles terminate. The starting service
    /// is never part of the result.
    pub fn dependencies(&self, name: &str, transitive: bool) -> Result<Vec<String>> {
        let catalog = self.catalog.lock();
        let root = catalog
            .get(name)
            .ok_or_else(|| ProviderError::NotFound(format!("Service {} not found", name)))?;

        if !transitive {
            return Ok(root.dependencies.clone());
        }

        let mut seen: HashSet<&str> = HashSet::from([root.name.as_str()]);
        let mut queue: VecDeque<&str> = root.dependencies.iter().map(String::as_str).collect();
        let mut order = Vec::new();

        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            order.push(current.to_string());
            if let Some(service) = catalog.get(current) {
                queue.extend(service.dependencies.iter().map(String::as_str));
            }
        }

        tracing::debug!(service = %name, count = order.len(), "Resolved transitive dependencies");
        Ok(order)
    }

    /// Services that list `name` as a direct dependency, sorted by name
    pub fn dependents(&self, name: &str) -> Result<Vec<String>> {
        let catalog = self.catalog.lock();
        if !catalog.contains_key(name) {
            return Err(ProviderError::NotFound(format!("Service {} not found", name)));
        }
        let mut dependents: Vec<String> = catalog
            .values()
            .filter(|s| s.dependencies.iter().any(|d| d == name))
            .map(|s| s.name.clone())
            .collect();
        dependents.sort();
        Ok(dependents)
    }

    pub fn owners(&self, name: &str) -> Result<ServiceOwners> {
        let service = self.get(name)?;
        let team = seed::team(&service.team).ok_or_else(|| {
            ProviderError::Internal(format!("Team {} missing from catalog", service.team))
        })?;
        Ok(ServiceOwners {
            service: service.name,
            team: team.name.to_string(),
            oncall: team.oncall.to_string(),
            members: team.members.iter().map(|m| m.to_string()).collect(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct NameParams {
    name: String,
}

#[derive(Debug, Deserialize)]
struct DependencyParams {
    name: String,
    #[serde(default)]
    transitive: bool,
}

#[async_trait]
impl Provider for MockServiceProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    fn display_name(&self) -> &str {
        "Mock Service Catalog"
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::Services]
    }

    fn operations(&self, capability: Capability) -> &'static [&'static str] {
        match capability {
            Capability::Services => OPERATIONS,
            _ => &[],
        }
    }

    fn record_count(&self) -> usize {
        self.catalog.lock().len()
    }

    async fn handle(&self, request: &ProviderRequest) -> Result<Value> {
        match request.operation.as_str() {
            "list" => to_payload(&self.list(&request.params()?)?),
            "get" => {
                let p: NameParams = request.params()?;
                to_payload(&self.get(&p.name)?)
            }
            "dependencies" => {
                let p: DependencyParams = request.params()?;
                to_payload(&self.dependencies(&p.name, p.transitive)?)
            }
            "dependents" => {
                let p: NameParams = request.params()?;
                to_payload(&self.dependents(&p.name)?)
            }
            "owners" => {
                let p: NameParams = request.params()?;
                to_payload(&self.owners(&p.name)?)
            }
            _ => Err(request.unsupported()),
        }
    }
}
