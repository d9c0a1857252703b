//! Domain events published for external observers.
//!
//! Events are transient: they are delivered to whoever is subscribed at
//! publish time and never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Published after a non-empty warning has been persisted
pub const WARNING_SET: &str = "warning.set";

/// Published after the warning has been cleared
pub const WARNING_REMOVED: &str = "warning.removed";

/// A named event with an arbitrary payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Event name, e.g. `warning.set`
    pub name: String,

    /// Event payload (shape depends on the name)
    pub payload: Value,

    /// When this event was published
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent {
    /// Create a new event with the current timestamp
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Create an event from any serializable payload
    pub fn with_payload<T: Serialize>(name: impl Into<String>, payload: &T) -> serde_json::Result<Self> {
        Ok(Self::new(name, serde_json::to_value(payload)?))
    }

    /// Decode the payload into a concrete type
    pub fn payload_as<T: for<'de> Deserialize<'de>>(&self) -> serde_json::Result<T> {
        serde_json::from_value(self.payload.clone())
    }
}

/// Payload of `warning.set` and `warning.removed`.
///
/// For `warning.removed`, `text` is the warning that was cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningPayload {
    pub text: String,
    pub username: String,
}
