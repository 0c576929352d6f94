use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored secret with its full version history
#[derive(Debug, Clone, PartialEq)]
pub struct Secret {
    pub path: String,
    pub versions: Vec<SecretVersion>,
}

impl Secret {
    pub fn latest(&self) -> Option<&SecretVersion> {
        self.versions.last()
    }

    /// Metadata view; carries no part of any value
    pub fn metadata(&self) -> SecretMetadata {
        let mut segments = self.path.splitn(3, '/');
        let environment = segments.next().unwrap_or_default().to_string();
        let service = segments.next().unwrap_or_default().to_string();
        let name = segments.next().unwrap_or_default().to_string();

        let created_at = self.versions.first().map(|v| v.created_at);
        let latest = self.latest();

        SecretMetadata {
            path: self.path.clone(),
            environment,
            service,
            name,
            current_version: latest.map(|v| v.version).unwrap_or(0),
            created_at,
            updated_at: latest.map(|v| v.created_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SecretVersion {
    pub version: u32,
    pub value: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecretMetadata {
    pub path: String,
    pub environment: String,
    pub service: String,
    pub name: String,
    pub current_version: u32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Version descriptor without the value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecretVersionInfo {
    pub version: u32,
    pub created_at: DateTime<Utc>,
}

/// A revealed secret value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecretValue {
    pub path: String,
    pub version: u32,
    pub value: String,
}

/// Show only the last four characters
pub fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len().max(4));
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(8), tail)
}
