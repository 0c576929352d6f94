pub mod incident;
pub mod log;
pub mod message;
pub mod metric;
pub mod secret;
pub mod service;
pub mod ticket;

pub use incident::*;
pub use log::*;
pub use message::*;
pub use metric::*;
pub use secret::*;
pub use service::*;
pub use ticket::*;
