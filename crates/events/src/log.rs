//! Event log subscriber.

use serde_json::Value;
use tokio::sync::broadcast;

use crate::bus::DomainEvent;

/// Placeholder written in place of secret payload values.
pub const REDACTED: &str = "[redacted]";

/// Records every bus event as a structured `tracing` line.
///
/// Payload keys ending in `_token` carry one-time secrets (verification and
/// reset tokens) and are never written out.
pub struct EventLog;

impl EventLog {
    /// Run until the bus is dropped.
    pub async fn run(mut receiver: broadcast::Receiver<DomainEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    tracing::info!(
                        event_type = %event.event_type,
                        subject_type = event.subject_type.as_deref().unwrap_or("-"),
                        subject_id = ?event.subject_id,
                        actor_user_id = ?event.actor_user_id,
                        payload = %redact(&event.payload),
                        "Domain event",
                    );
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event log lagged, some events were not logged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, event log shutting down");
                    break;
                }
            }
        }
    }
}

/// A copy of `payload` with every `*_token` value replaced by [`REDACTED`].
pub fn redact(payload: &Value) -> Value {
    match payload {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| {
                    let value = if key.ends_with("_token") {
                        Value::String(REDACTED.into())
                    } else {
                        redact(value)
                    };
                    (key.clone(), value)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}
