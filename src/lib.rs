//! In-memory mock providers for ops tooling.
//!
//! Seven providers (incidents, logs, metrics, tickets, messaging, services
//! and secrets) stand in for real backends behind one [`plugin::Provider`]
//! trait. Each seeds deterministic demo data from a [`seed::SeedClock`] and
//! filters it on the client side. [`plugin::PluginHost`] routes JSON requests
//! to them.
//!
//! ```no_run
//! use ops_mock_providers::{build_host, Capability, MockConfig, ProviderRequest};
//! use serde_json::json;
//!
//! # async fn demo() -> ops_mock_providers::Result<()> {
//! let host = build_host(&MockConfig::load()?)?;
//! let response = host
//!     .invoke(ProviderRequest::new(
//!         Capability::Incidents,
//!         "list",
//!         json!({ "text": "payments OR \"connection pool\"" }),
//!     ))
//!     .await;
//! println!("{}", serde_json::to_string_pretty(&response).unwrap());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod enrichment;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod models;
pub mod plugin;
pub mod providers;
pub mod query;
pub mod seed;
pub mod waveform;

pub use config::MockConfig;
pub use error::{ProviderError, Result};
pub use plugin::{
    build_host, Capability, PluginHost, Provider, ProviderRequest, ProviderResponse,
};
pub use query::TextQuery;
pub use waveform::Waveform;
