//! In-memory mock providers
//!
//! Each provider owns a single mutex guarding its records, seeds them
//! deterministically from a [`SeedClock`](crate::seed::SeedClock) and filters
//! on the client side.

pub mod incidents;
pub mod logs;
pub mod messaging;
pub mod metrics;
pub mod secrets;
pub mod services;
pub mod tickets;

pub use incidents::{IncidentQuery, MockIncidentProvider};
pub use logs::{LogQuery, MockLogProvider};
pub use messaging::{MessageQuery, MockMessagingProvider};
pub use metrics::{MockMetricsProvider, SeriesQuery};
pub use secrets::MockSecretsProvider;
pub use services::{MockServiceProvider, ServiceQuery};
pub use tickets::{MockTicketProvider, TicketQuery};

use crate::waveform::AlertWindow;

/// Supplies the alert windows that amplify correlated metrics
pub trait AlertWindowSource: Send + Sync {
    fn alert_windows(&self) -> Vec<AlertWindow>;
}
