//! Sync protocol payloads and the sync status shown to the user.

use crate::presence::PresenceRecord;
use crate::shapes::Element;
use crate::wire;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Body of `GET`/`POST` on the whiteboard endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementsEnvelope {
    #[serde(default, deserialize_with = "lenient_elements")]
    pub elements: Vec<Element>,
    /// Server-assigned time of the stored snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl ElementsEnvelope {
    pub fn new(elements: Vec<Element>) -> Self {
        Self {
            elements,
            timestamp: None,
        }
    }
}

/// Acknowledgement of a successful save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveAck {
    pub ok: bool,
    pub timestamp: i64,
}

/// Body of `GET` on the presence endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresenceEnvelope {
    #[serde(default)]
    pub users: Vec<PresenceRecord>,
}

fn lenient_elements<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Element>, D::Error> {
    let values = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(wire::decode_elements(values.unwrap_or_default()))
}

/// Sync state as surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncStatus {
    /// No fetch has succeeded yet.
    #[default]
    Connecting,
    /// Last fetch succeeded and nothing is pending.
    Synced,
    /// Local edits are pending or being written.
    Saving,
    /// Consecutive transport failures reached the reconnecting threshold.
    Reconnecting { failures: u32 },
}

impl SyncStatus {
    pub fn is_degraded(&self) -> bool {
        matches!(self, SyncStatus::Reconnecting { .. })
    }

    pub fn label(&self) -> String {
        match self {
            SyncStatus::Connecting => "Connecting…".to_string(),
            SyncStatus::Synced => "Synced".to_string(),
            SyncStatus::Saving => "Saving…".to_string(),
            SyncStatus::Reconnecting { failures } => {
                format!("Reconnecting… ({} failed attempts)", failures)
            }
        }
    }
}

/// Timing of the element sync loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Period of the remote poll.
    pub sync_interval: Duration,
    /// Quiet time after the last mutation before a save fires.
    pub save_debounce: Duration,
    /// Ceiling on how long a pending save may wait.
    pub forced_flush: Duration,
    /// Age under which a local element missing remotely is kept.
    pub grace_window: Duration,
    /// Consecutive failures before the status turns to reconnecting.
    pub reconnecting_after: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_millis(1000),
            save_debounce: Duration::from_millis(500),
            forced_flush: Duration::from_millis(3000),
            grace_window: Duration::from_millis(5000),
            reconnecting_after: 3,
        }
    }
}
