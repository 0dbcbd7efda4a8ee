//! Persistence gateway: the only boundary between the board and the store.

mod autosave;
mod file;
mod memory;

pub use autosave::SaveScheduler;
pub use file::FileGateway;
pub use memory::MemoryGateway;

use crate::presence::PresenceRecord;
use crate::shapes::Element;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Gateway errors.
///
/// A campaign with no stored state is not an error; fetches return an empty
/// collection for it.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Server returned {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Lock error: {0}")]
    Lock(String),
    #[error("Invalid campaign name: {0:?}")]
    InvalidCampaign(String),
}

impl From<std::io::Error> for GatewayError {
    fn from(e: std::io::Error) -> Self {
        GatewayError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Serialization(e.to_string())
    }
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Boxed future for gateway operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Load/save of a campaign's element collection and presence records.
///
/// Implementations are `Send + Sync` so one gateway can back every task of a
/// session.
pub trait Gateway: Send + Sync {
    /// Fetch the full collection. An unknown campaign yields an empty collection.
    fn fetch_elements<'a>(&'a self, campaign: &'a str) -> BoxFuture<'a, GatewayResult<Vec<Element>>>;

    /// Replace the full collection. Returns the store's save timestamp.
    fn save_elements<'a>(
        &'a self,
        campaign: &'a str,
        elements: &'a [Element],
    ) -> BoxFuture<'a, GatewayResult<i64>>;

    /// Fetch every presence record stored for the campaign.
    fn fetch_presence<'a>(
        &'a self,
        campaign: &'a str,
    ) -> BoxFuture<'a, GatewayResult<Vec<PresenceRecord>>>;

    /// Insert or replace the record with the same `user_id`.
    fn publish_presence<'a>(
        &'a self,
        campaign: &'a str,
        record: &'a PresenceRecord,
    ) -> BoxFuture<'a, GatewayResult<()>>;
}

/// Replace the record with the same user id, or append it.
pub fn upsert_presence(records: &mut Vec<PresenceRecord>, record: PresenceRecord) {
    match records.iter_mut().find(|r| r.user_id == record.user_id) {
        Some(existing) => *existing = record,
        None => records.push(record),
    }
}

/// Storage key for a campaign name: lowercase, whitespace runs become `-`,
/// characters outside `[a-z0-9._-]` are dropped, `-` runs collapse.
pub fn slugify(campaign: &str) -> String {
    let mut out = String::with_capacity(campaign.len());
    let mut in_space = false;
    for c in campaign.to_lowercase().chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('-');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        if c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-') {
            out.push(c);
        }
    }

    let mut collapsed = String::with_capacity(out.len());
    for c in out.chars() {
        if c == '-' && collapsed.ends_with('-') {
            continue;
        }
        collapsed.push(c);
    }
    collapsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Curse of Strahd"), "curse-of-strahd");
        assert_eq!(slugify("  Lost  Mine!! "), "-lost-mine-");
        assert_eq!(slugify("a - b"), "a-b");
        assert_eq!(slugify("Ünïcode_v1.2"), "ncode_v1.2");
        assert_eq!(slugify("../etc"), "..etc");
    }

    #[test]
    fn test_upsert_presence_replaces_by_user() {
        let mk = |id: &str, seen: i64| PresenceRecord {
            user_id: id.into(),
            user_name: id.into(),
            cursor_x: 0.0,
            cursor_y: 0.0,
            editing_element_id: None,
            last_seen: seen,
            color: crate::presence::color_for_user(id),
        };
        let mut records = vec![mk("a", 1), mk("b", 1)];
        upsert_presence(&mut records, mk("a", 9));
        upsert_presence(&mut records, mk("c", 9));
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].last_seen, 9);
        assert_eq!(records[1].last_seen, 1);
    }
}
