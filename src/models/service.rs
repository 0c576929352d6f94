use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Service catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub name: String,
    pub team: String,
    pub tier: u8,
    pub language: String,
    pub description: String,
    pub dependencies: Vec<String>,
    pub repository: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Service {
    pub fn search_fields(&self) -> Vec<&str> {
        vec![
            self.name.as_str(),
            self.description.as_str(),
            self.team.as_str(),
            self.language.as_str(),
        ]
    }
}

/// Ownership details for a service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceOwners {
    pub service: String,
    pub team: String,
    pub oncall: String,
    pub members: Vec<String>,
}
