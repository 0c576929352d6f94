//! Deterministic demo data primitives
//!
//! Everything the providers seed is derived from a [`SeedClock`] anchor and
//! [`DetRng`] streams keyed by strings, so a given anchor always yields the
//! same data.

use crate::config::SeedConfig;
use chrono::{DateTime, Duration, DurationRound, Utc};
use sha2::{Digest, Sha256};

/// Anchor instant for seeded timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedClock {
    anchor: DateTime<Utc>,
    history: Duration,
}

impl SeedClock {
    pub fn new(anchor: DateTime<Utc>, history_hours: u32) -> Self {
        Self {
            anchor,
            history: Duration::hours(history_hours as i64),
        }
    }

    /// Build from configuration, falling back to the current hour
    pub fn from_config(config: &SeedConfig) -> Self {
        let anchor = config.anchor.unwrap_or_else(|| {
            let now = Utc::now();
            now.duration_trunc(Duration::hours(1)).unwrap_or(now)
        });
        Self::new(anchor, config.history_hours)
    }

    pub fn anchor(&self) -> DateTime<Utc> {
        self.anchor
    }

    pub fn history(&self) -> Duration {
        self.history
    }

    /// Oldest seeded instant
    pub fn history_start(&self) -> DateTime<Utc> {
        self.anchor - self.history
    }

    pub fn minutes_ago(&self, minutes: i64) -> DateTime<Utc> {
        self.anchor - Duration::minutes(minutes)
    }

    pub fn hours_ago(&self, hours: i64) -> DateTime<Utc> {
        self.anchor - Duration::hours(hours)
    }
}

/// Hash a key into a 64-bit seed
pub fn seed_from_key(key: &str) -> u64 {
    let digest = Sha256::digest(key.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// splitmix64 stream seeded from a string key
#[derive(Debug, Clone)]
pub struct DetRng {
    state: u64,
}

impl DetRng {
    pub fn new(key: &str) -> Self {
        Self {
            state: seed_from_key(key),
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `[0, 1)`
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform integer in `[lo, hi)`; returns `lo` when the range is empty
    pub fn range(&mut self, lo: i64, hi: i64) -> i64 {
        if hi <= lo {
            return lo;
        }
        lo + (self.next_u64() % (hi - lo) as u64) as i64
    }

    pub fn chance(&mut self, probability: f64) -> bool {
        self.next_f64() < probability
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        let idx = (self.next_u64() % items.len() as u64) as usize;
        &items[idx]
    }
}

/// Static description of a catalog service
#[derive(Debug, Clone, Copy)]
pub struct CatalogService {
    pub name: &'static str,
    pub team: &'static str,
    pub tier: u8,
    pub language: &'static str,
    pub description: &'static str,
    pub dependencies: &'static [&'static str],
}

/// Static description of an owning team
#[derive(Debug, Clone, Copy)]
pub struct CatalogTeam {
    pub name: &'static str,
    pub oncall: &'static str,
    pub members: &'static [&'static str],
}

pub const ENVIRONMENTS: &[&str] = &["prod", "staging"];

pub const TEAMS: &[CatalogTeam] = &[
    CatalogTeam {
        name: "edge",
        oncall: "maria.chen",
        members: &["maria.chen", "tom.okafor"],
    },
    CatalogTeam {
        name: "identity",
        oncall: "sam.rivera",
        members: &["sam.rivera", "lena.kowalski"],
    },
    CatalogTeam {
        name: "commerce",
        oncall: "jon.bakker",
        members: &["jon.bakker", "aisha.rahman", "li.wei"],
    },
    CatalogTeam {
        name: "payments",
        oncall: "priya.nair",
        members: &["priya.nair", "diego.santos"],
    },
    CatalogTeam {
        name: "discovery",
        oncall: "noah.fischer",
        members: &["noah.fischer", "emma.laurent"],
    },
    CatalogTeam {
        name: "platform",
        oncall: "kai.tanaka",
        members: &["kai.tanaka", "olga.petrova", "ben.adeyemi"],
    },
];

pub const SERVICES: &[CatalogService] = &[
    CatalogService {
        name: "api-gateway",
        team: "edge",
        tier: 1,
        language: "go",
        description: "Public HTTP entry point, routing and rate limiting",
        dependencies: &["auth", "checkout", "search"],
    },
    CatalogService {
        name: "auth",
        team: "identity",
        tier: 1,
        language: "rust",
        description: "Session and token issuance",
        dependencies: &["user-db"],
    },
    CatalogService {
        name: "checkout",
        team: "commerce",
        tier: 1,
        language: "java",
        description: "Cart checkout and order placement",
        dependencies: &["payments", "inventory", "auth", "notifications"],
    },
    CatalogService {
        name: "payments",
        team: "payments",
        tier: 1,
        language: "go",
        description: "Card authorisation and capture",
        dependencies: &["ledger-db", "fraud"],
    },
    CatalogService {
        name: "fraud",
        team: "payments",
        tier: 2,
        language: "python",
        description: "Transaction risk scoring",
        dependencies: &["feature-store"],
    },
    CatalogService {
        name: "inventory",
        team: "commerce",
        tier: 2,
        language: "java",
        description: "Stock levels and reservations",
        dependencies: &["inventory-db"],
    },
    CatalogService {
        name: "search",
        team: "discovery",
        tier: 2,
        language: "rust",
        description: "Product search and ranking",
        dependencies: &["search-index"],
    },
    CatalogService {
        name: "notifications",
        team: "platform",
        tier: 3,
        language: "typescript",
        description: "Email and push delivery, order status lookups",
        dependencies: &["auth", "checkout"],
    },
    CatalogService {
        name: "user-db",
        team: "identity",
        tier: 1,
        language: "postgres",
        description: "Primary user database",
        dependencies: &[],
    },
    CatalogService {
        name: "ledger-db",
        team: "payments",
        tier: 1,
        language: "postgres",
        description: "Double-entry payment ledger",
        dependencies: &[],
    },
    CatalogService {
        name: "inventory-db",
        team: "commerce",
        tier: 2,
        language: "mysql",
        description: "Inventory storage",
        dependencies: &[],
    },
    CatalogService {
        name: "search-index",
        team: "discovery",
        tier: 2,
        language: "elasticsearch",
        description: "Search document index",
        dependencies: &[],
    },
    CatalogService {
        name: "feature-store",
        team: "platform",
        tier: 3,
        language: "redis",
        description: "Online feature cache for models",
        dependencies: &[],
    },
];

/// Services that run code (excludes managed data stores)
pub fn application_services() -> impl Iterator<Item = &'static CatalogService> {
    SERVICES.iter().filter(|s| {
        !matches!(
            s.language,
            "postgres" | "mysql" | "elasticsearch" | "redis"
        )
    })
}

pub fn service(name: &str) -> Option<&'static CatalogService> {
    SERVICES.iter().find(|s| s.name == name)
}

pub fn team(name: &str) -> Option<&'static CatalogTeam> {
    TEAMS.iter().find(|t| t.name == name)
}

/// Team owning a service, falling back to platform
pub fn owner_of(service_name: &str) -> &'static CatalogTeam {
    service(service_name)
        .and_then(|s| team(s.team))
        .unwrap_or(&TEAMS[TEAMS.len() - 1])
}
