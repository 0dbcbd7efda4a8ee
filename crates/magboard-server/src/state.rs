use dashmap::DashMap;
use magboard_core::clock::{Clock, SystemClock};
use magboard_core::presence::PresenceRecord;
use magboard_core::storage::{Gateway, slugify, upsert_presence};
use std::sync::Arc;
use std::time::Duration;

/// Shared application state.
pub struct AppState {
    /// Durable element store.
    gateway: Arc<dyn Gateway>,
    clock: Arc<dyn Clock>,
    staleness: Duration,
    /// Timestamp of the last save per campaign slug.
    saved_at: DashMap<String, i64>,
    /// Live presence per campaign slug. Not persisted.
    presence: DashMap<String, Vec<PresenceRecord>>,
}

impl AppState {
    pub fn new(gateway: Arc<dyn Gateway>, staleness: Duration) -> Self {
        Self::with_clock(gateway, staleness, Arc::new(SystemClock))
    }

    pub fn with_clock(gateway: Arc<dyn Gateway>, staleness: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            gateway,
            clock,
            staleness,
            saved_at: DashMap::new(),
            presence: DashMap::new(),
        }
    }

    pub fn gateway(&self) -> &dyn Gateway {
        self.gateway.as_ref()
    }

    pub fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Remember the timestamp a save was acknowledged with.
    pub fn record_save(&self, campaign: &str, timestamp: i64) {
        self.saved_at.insert(slugify(campaign), timestamp);
    }

    /// Timestamp of the stored snapshot, or now when nothing was saved since startup.
    pub fn snapshot_timestamp(&self, campaign: &str) -> i64 {
        self.saved_at
            .get(&slugify(campaign))
            .map(|ts| *ts)
            .unwrap_or_else(|| self.now())
    }

    /// Merge a heartbeat into the campaign's presence set.
    ///
    /// Stale records of every campaign are dropped first, along with campaigns
    /// left without any record.
    pub fn publish_presence(&self, campaign: &str, record: PresenceRecord) {
        let now = self.now();
        self.presence.retain(|_, users| {
            users.retain(|r| !r.is_stale(now, self.staleness));
            !users.is_empty()
        });
        let mut users = self.presence.entry(slugify(campaign)).or_default();
        upsert_presence(&mut users, record);
    }

    /// Fresh presence records for a campaign.
    pub fn presence(&self, campaign: &str) -> Vec<PresenceRecord> {
        let now = self.now();
        self.presence
            .get(&slugify(campaign))
            .map(|users| {
                users
                    .iter()
                    .filter(|r| !r.is_stale(now, self.staleness))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of campaigns holding presence records.
    pub fn presence_campaigns(&self) -> usize {
        self.presence.len()
    }

    /// Number of stored presence records, stale ones included.
    pub fn presence_len(&self, campaign: &str) -> usize {
        self.presence
            .get(&slugify(campaign))
            .map(|users| users.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use magboard_core::clock::ManualClock;
    use magboard_core::presence::color_for_user;
    use magboard_core::storage::MemoryGateway;

    fn record(user: &str, last_seen: i64) -> PresenceRecord {
        PresenceRecord {
            user_id: user.into(),
            user_name: user.into(),
            cursor_x: 0.0,
            cursor_y: 0.0,
            editing_element_id: None,
            last_seen,
            color: color_for_user(user),
        }
    }

    fn state(clock: Arc<ManualClock>) -> AppState {
        AppState::with_clock(
            Arc::new(MemoryGateway::new()),
            Duration::from_millis(10_000),
            clock,
        )
    }

    #[test]
    fn test_presence_write_prunes_stale() {
        let clock = Arc::new(ManualClock::new(1_000));
        let state = state(clock.clone());
        state.publish_presence("Camp", record("alice", 1_000));
        clock.set(20_000);
        state.publish_presence("camp", record("bob", 20_000));
        assert_eq!(state.presence_len("camp"), 1);
        assert_eq!(state.presence("Camp")[0].user_id, "bob");
    }

    #[test]
    fn test_abandoned_campaign_is_dropped() {
        let clock = Arc::new(ManualClock::new(1_000));
        let state = state(clock.clone());
        state.publish_presence("Old Camp", record("alice", 1_000));
        assert_eq!(state.presence_campaigns(), 1);

        clock.set(20_000);
        state.publish_presence("New Camp", record("bob", 20_000));
        assert_eq!(state.presence_campaigns(), 1);
        assert_eq!(state.presence_len("old camp"), 0);
        assert_eq!(state.presence_len("new camp"), 1);
    }

    #[test]
    fn test_presence_read_filters_stale() {
        let clock = Arc::new(ManualClock::new(1_000));
        let state = state(clock.clone());
        state.publish_presence("camp", record("alice", 1_000));
        clock.set(11_000);
        assert_eq!(state.presence("camp").len(), 1);
        clock.set(11_001);
        assert!(state.presence("camp").is_empty());
        assert_eq!(state.presence_len("camp"), 1);
    }

    #[test]
    fn test_snapshot_timestamp_falls_back_to_now() {
        let clock = Arc::new(ManualClock::new(42));
        let state = state(clock);
        assert_eq!(state.snapshot_timestamp("camp"), 42);
        state.record_save("Camp", 7);
        assert_eq!(state.snapshot_timestamp("camp"), 7);
    }
}
