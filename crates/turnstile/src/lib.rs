//! turnstile: bounded real-time ticket pool with vendor/customer workers.

mod activity;
mod config;
mod pool;
mod session;
mod ticket;
mod worker;

pub mod service;
pub mod transport;

pub use activity::{ActivityEvent, ActivityLog, EventCategory};
pub use config::{ConfigError, SimulationConfig};
pub use pool::{AddOutcome, PoolSnapshot, RemoveOutcome, TicketPool};
pub use session::Session;
pub use service::{
    SessionError, SessionState, StatusSnapshot, TicketingService, UpdateConfigError,
};
pub use ticket::{CustomerId, Ticket, VendorId};
pub use tokio_util::sync::CancellationToken;
pub use worker::{Customer, Vendor};
