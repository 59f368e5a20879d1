//! Append-only event log, the in-process analogue of transaction receipts.
//!
//! Contracts emit typed serde payloads; the log stores them as JSON values so
//! that readers decode only the events they care about.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::address::Address;

/// One emitted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Unique record identifier.
    pub id: Uuid,
    /// Block height at emission time.
    pub block: u64,
    /// Contract that emitted the event.
    pub emitter: Address,
    /// Event name, e.g. `"VaultCreated"`.
    pub name: String,
    /// Event payload as JSON.
    pub data: serde_json::Value,
    /// Wall-clock emission time.
    pub emitted_at: DateTime<Utc>,
}

impl LogRecord {
    /// Decodes the payload into a concrete event type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }
}
