//! Parlor event bus and account notifications.
//!
//! - [`EventBus`] -- in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`DomainEvent`] -- the event envelope published after successful writes.
//! - [`delivery`] -- SMTP email delivery.
//! - [`AccountNotifier`] -- subscriber that sends verification and password
//!   reset emails.
//! - [`EventLog`] -- subscriber that records every event through `tracing`.

pub mod bus;
pub mod delivery;
pub mod log;
pub mod notifier;

pub use bus::{event_types, DomainEvent, EventBus};
pub use delivery::email::{EmailConfig, EmailDelivery, EmailError};
pub use log::EventLog;
pub use notifier::AccountNotifier;
