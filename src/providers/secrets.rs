use crate::error::{ProviderError, Result};
use crate::filter::ScopePattern;
use crate::models::{mask, Secret, SecretMetadata, SecretValue, SecretVersion, SecretVersionInfo};
use crate::plugin::{to_payload, Capability, Provider, ProviderRequest};
use crate::seed::{DetRng, SeedClock, ENVIRONMENTS};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

const PROVIDER_ID: &str = "mock-secrets";
const OPERATIONS: &[&str] = &["list", "get", "put", "versions", "masked"];

/// (service, name, value prefix, rotations)
const SEED_SECRETS: &[(&str, &str, &str, u32)] = &[
    ("payments", "acquirer-api-key", "ak_live", 2),
    ("payments", "ledger-db-password", "pw", 1),
    ("auth", "jwt-signing-key", "jwk", 3),
    ("auth", "user-db-password", "pw", 1),
    ("checkout", "inventory-token", "tok", 1),
    ("notifications", "smtp-password", "smtp", 2),
    ("search", "index-admin-key", "es", 1),
];

/// Validate and normalise an `env/service/name` path
fn normalise_path(path: &str) -> Result<String> {
    let trimmed = path.trim().trim_matches('/');
    let segments: Vec<&str> = trimmed.split('/').collect();
    if segments.len() != 3 || segments.iter().any(|s| s.trim().is_empty()) {
        return Err(ProviderError::Validation(format!(
            "secret path '{}' must look like env/service/name",
            path
        )));
    }
    Ok(trimmed.to_string())
}

/// Mock secrets vault
pub struct MockSecretsProvider {
    vault: Mutex<HashMap<String, Secret>>,
}

impl MockSecretsProvider {
    pub fn new(clock: SeedClock) -> Self {
        let mut vault = HashMap::new();

        for env in ENVIRONMENTS {
            for (service, name, prefix, rotations) in SEED_SECRETS {
                let path = format!("{}/{}/{}", env, service, name);
                let mut rng = DetRng::new(&path);
                let versions = (1..=*rotations)
                    .map(|version| {
                        let hours_ago = i64::from(rotations - version + 1) * 12;
                        SecretVersion {
                            version,
                            value: format!("{}_{:016x}", prefix, rng.next_u64()),
                            created_at: clock.hours_ago(hours_ago),
                        }
                    })
                    .collect();
                vault.insert(path.clone(), Secret { path, versions });
            }
        }

        tracing::info!(count = vault.len(), "Seeded mock secrets vault");
        crate::metrics::set_seeded_records(PROVIDER_ID, vault.len());

        Self {
            vault: Mutex::new(vault),
        }
    }

    /// Metadata of secrets matching `pattern`, sorted by path
    pub fn list(&self, pattern: Option<&str>) -> Result<Vec<SecretMetadata>> {
        let pattern = pattern.map(ScopePattern::new).transpose()?;
        let mut listed: Vec<SecretMetadata> = self
            .vault
            .lock()
            .values()
            .filter(|s| pattern.as_ref().map_or(true, |p| p.matches(&s.path)))
            .map(Secret::metadata)
            .collect();
        listed.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(listed)
    }

    /// Reveal a secret value
    ///
    /// The caller must hold a grant whose pattern matches the path. Access is
    /// checked before existence, so missing paths are not revealed to callers
    /// without a grant. `version` defaults to the latest.
    pub fn get(&self, path: &str, grants: &[String], version: Option<u32>) -> Result<SecretValue> {
        let path = normalise_path(path)?;
        let patterns = grants
            .iter()
            .map(|g| ScopePattern::new(g))
            .collect::<Result<Vec<_>>>()?;

        if !patterns.iter().any(|p| p.matches(&path)) {
            tracing::warn!(path = %path, grants = grants.len(), "Secret access denied");
            return Err(ProviderError::AccessDenied(format!(
                "no grant covers {}",
                path
            )));
        }

        let vault = self.vault.lock();
        let secret = vault
            .get(&path)
            .ok_or_else(|| ProviderError::NotFound(format!("Secret {} not found", path)))?;
        let entry = match version {
            Some(v) => secret.versions.iter().find(|e| e.version == v),
            None => secret.latest(),
        }
        .ok_or_else(|| {
            ProviderError::NotFound(format!(
                "Secret {} has no version {}",
                path,
                version.unwrap_or_default()
            ))
        })?;

        tracing::debug!(path = %path, version = entry.version, "Secret revealed");
        Ok(SecretValue {
            path: path.clone(),
            version: entry.version,
            value: entry.value.clone(),
        })
    }

    /// Store a new version, creating the secret when absent
    pub fn put(&self, path: &str, value: &str) -> Result<SecretMetadata> {
        let path = normalise_path(path)?;
        if value.is_empty() {
            return Err(ProviderError::Validation(
                "secret value must not be empty".to_string(),
            ));
        }

        let metadata = {
            let mut vault = self.vault.lock();
            let secret = vault.entry(path.clone()).or_insert_with(|| Secret {
                path: path.clone(),
                versions: Vec::new(),
            });
            let version = secret.latest().map_or(1, |v| v.version + 1);
            secret.versions.push(SecretVersion {
                version,
                value: value.to_string(),
                created_at: Utc::now(),
            });
            let metadata = secret.metadata();
            crate::metrics::set_seeded_records(PROVIDER_ID, vault.len());
            metadata
        };

        tracing::info!(
            path = %metadata.path,
            version = metadata.current_version,
            "Secret version stored"
        );
        Ok(metadata)
    }

    /// Version history, oldest first, without values
    pub fn versions(&self, path: &str) -> Result<Vec<SecretVersionInfo>> {
        let path = normalise_path(path)?;
        let vault = self.vault.lock();
        let secret = vault
            .get(&path)
            .ok_or_else(|| ProviderError::NotFound(format!("Secret {} not found", path)))?;
        Ok(secret
            .versions
            .iter()
            .map(|v| SecretVersionInfo {
                version: v.version,
                created_at: v.created_at,
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct ListParams {
    #[serde(default)]
    pattern: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GetParams {
    path: String,
    #[serde(default)]
    grants: Vec<String>,
    #[serde(default)]
    version: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct PutParams {
    path: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct PathParams {
    path: String,
}

#[derive(Debug, Deserialize)]
struct MaskParams {
    value: String,
}

#[async_trait]
impl Provider for MockSecretsProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    fn display_name(&self) -> &str {
        "Mock Secrets Vault"
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::Secrets]
    }

    fn operations(&self, capability: Capability) -> &'static [&'static str] {
        match capability {
            Capability::Secrets => OPERATIONS,
            _ => &[],
        }
    }

    fn record_count(&self) -> usize {
        self.vault.lock().len()
    }

    async fn handle(&self, request: &ProviderRequest) -> Result<Value> {
        match request.operation.as_str() {
            "list" => {
                let p: ListParams = request.params()?;
                to_payload(&self.list(p.pattern.as_deref())?)
            }
            "get" => {
                let p: GetParams = request.params()?;
                to_payload(&self.get(&p.path, &p.grants, p.version)?)
            }
            "put" => {
                let p: PutParams = request.params()?;
                to_payload(&self.put(&p.path, &p.value)?)
            }
            "versions" => {
                let p: PathParams = request.params()?;
                to_payload(&self.versions(&p.path)?)
            }
            "masked" => {
                let p: MaskParams = request.params()?;
                Ok(json!({ "masked": mask(&p.value) }))
            }
            _ => Err(request.unsupported()),
        }
    }
}
