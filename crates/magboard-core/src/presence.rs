//! Presence: who else is on the board, where their cursor is, and what they
//! are editing.
//!
//! Records are ephemeral. Each client republishes its own record on a
//! heartbeat; readers infer departure from `last_seen` going stale.

use crate::clock::Clock;
use crate::shapes::{ElementId, HexColor};
use crate::storage::{Gateway, GatewayResult};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Cursor palette; users are assigned one entry by hashing their id.
pub const PALETTE: [HexColor; 10] = [
    HexColor::new(0xFF, 0x6B, 0x6B, 0xFF),
    HexColor::new(0x4E, 0xCD, 0xC4, 0xFF),
    HexColor::new(0x45, 0xB7, 0xD1, 0xFF),
    HexColor::new(0xFF, 0xA0, 0x7A, 0xFF),
    HexColor::new(0x98, 0xD8, 0xC8, 0xFF),
    HexColor::new(0xF7, 0xDC, 0x6F, 0xFF),
    HexColor::new(0xBB, 0x8F, 0xCE, 0xFF),
    HexColor::new(0x85, 0xC1, 0xE2, 0xFF),
    HexColor::new(0xF8, 0xB7, 0x39, 0xFF),
    HexColor::new(0x52, 0xB7, 0x88, 0xFF),
];

/// Deterministic palette color for a user id.
///
/// Uses the 32-bit `h * 31 + c` string hash over UTF-16 code units, so the
/// same id gets the same color on every client.
pub fn color_for_user(user_id: &str) -> HexColor {
    let mut hash: i64 = 0;
    for unit in user_id.encode_utf16() {
        let shifted = (hash as i32).wrapping_shl(5) as i64;
        hash = i64::from(unit) + (shifted - hash);
    }
    PALETTE[(hash.unsigned_abs() % PALETTE.len() as u64) as usize]
}

/// One user's presence as stored and exchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceRecord {
    pub user_id: String,
    pub user_name: String,
    pub cursor_x: f64,
    pub cursor_y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editing_element_id: Option<ElementId>,
    /// Epoch milliseconds of the owner's last heartbeat.
    pub last_seen: i64,
    pub color: HexColor,
}

impl PresenceRecord {
    pub fn cursor(&self) -> Point {
        Point::new(self.cursor_x, self.cursor_y)
    }

    /// `now - last_seen` exceeds the threshold.
    pub fn is_stale(&self, now: i64, staleness: Duration) -> bool {
        let threshold = i64::try_from(staleness.as_millis()).unwrap_or(i64::MAX);
        now.saturating_sub(self.last_seen) > threshold
    }
}

/// Timing of the presence loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceConfig {
    pub heartbeat_interval: Duration,
    pub discovery_interval: Duration,
    /// Records older than this are treated as gone.
    pub staleness: Duration,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_millis(1000),
            discovery_interval: Duration::from_millis(1500),
            staleness: Duration::from_millis(10_000),
        }
    }
}

/// Local view of presence for one campaign.
#[derive(Debug, Clone)]
pub struct PresenceTracker {
    user_id: String,
    user_name: String,
    color: HexColor,
    cursor: Point,
    editing: Option<ElementId>,
    others: Vec<PresenceRecord>,
    staleness: Duration,
}

impl PresenceTracker {
    pub fn new(user_id: impl Into<String>, user_name: impl Into<String>, staleness: Duration) -> Self {
        let user_id = user_id.into();
        Self {
            color: color_for_user(&user_id),
            user_id,
            user_name: user_name.into(),
            cursor: Point::ZERO,
            editing: None,
            others: Vec::new(),
            staleness,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn color(&self) -> HexColor {
        self.color
    }

    pub fn set_cursor(&mut self, cursor: Point) {
        self.cursor = cursor;
    }

    /// Set or clear the element under active interaction.
    pub fn set_editing(&mut self, element: Option<ElementId>) {
        self.editing = element;
    }

    /// Build the record published on a heartbeat.
    pub fn heartbeat(&self, now: i64) -> PresenceRecord {
        PresenceRecord {
            user_id: self.user_id.clone(),
            user_name: self.user_name.clone(),
            cursor_x: self.cursor.x,
            cursor_y: self.cursor.y,
            editing_element_id: self.editing.clone(),
            last_seen: now,
            color: self.color,
        }
    }

    /// Replace the set of foreign users with a fresh fetch, minus our own
    /// record and anything stale.
    pub fn apply_discovery(&mut self, records: Vec<PresenceRecord>, now: i64) {
        self.others = records
            .into_iter()
            .filter(|r| r.user_id != self.user_id && !r.is_stale(now, self.staleness))
            .collect();
    }

    /// Foreign users still fresh at `now`.
    pub fn visible_others(&self, now: i64) -> Vec<PresenceRecord> {
        self.others
            .iter()
            .filter(|r| !r.is_stale(now, self.staleness))
            .cloned()
            .collect()
    }

    /// The foreign user currently editing `element_id`, if any.
    pub fn editor_of(&self, element_id: &str) -> Option<&PresenceRecord> {
        self.others
            .iter()
            .find(|r| r.editing_element_id.as_deref() == Some(element_id))
    }
}

/// Publish the local user's record once.
pub async fn heartbeat_once(
    tracker: &Mutex<PresenceTracker>,
    gateway: &dyn Gateway,
    campaign: &str,
    clock: &dyn Clock,
) -> GatewayResult<()> {
    let record = {
        let tracker = tracker.lock().unwrap_or_else(PoisonError::into_inner);
        tracker.heartbeat(clock.now_millis())
    };
    gateway.publish_presence(campaign, &record).await
}

/// Fetch the campaign's presence once and fold it into the tracker.
pub async fn discover_once(
    tracker: &Mutex<PresenceTracker>,
    gateway: &dyn Gateway,
    campaign: &str,
    clock: &dyn Clock,
) -> GatewayResult<usize> {
    let records = gateway.fetch_presence(campaign).await?;
    let mut tracker = tracker.lock().unwrap_or_else(PoisonError::into_inner);
    tracker.apply_discovery(records, clock.now_millis());
    Ok(tracker.others.len())
}
