//! Sync engine: keeps the local canvas and the remote store converging.
//!
//! Local mutations arm a debounced save; a poll loop fetches the remote
//! collection and merges it in, except while a gesture or save is in
//! progress. Transport failures are logged, counted and surfaced as
//! [`SyncStatus::Reconnecting`]; they never stop the loops.

use crate::canvas::{Canvas, SurfaceResponse};
use crate::clock::Clock;
use crate::merge::{MergeOutcome, MergePolicy, merge};
use crate::shapes::{Element, ElementId, MediaKind, MediaSource};
use crate::storage::{Gateway, GatewayError, GatewayResult, SaveScheduler};
use crate::sync::{SyncConfig, SyncStatus};
use crate::tools::ToolKind;
use kurbo::Point;
use std::sync::{Mutex, PoisonError};

/// What a poll cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A gesture or save was in progress; nothing fetched.
    Skipped,
    /// Fetched; nothing to apply.
    Unchanged,
    /// Fetched and a new collection was installed.
    Applied,
    /// The fetch failed.
    Failed,
}

/// Owns one campaign's local state and its sync bookkeeping.
#[derive(Debug)]
pub struct CollaborationManager {
    campaign: String,
    canvas: Canvas,
    saves: SaveScheduler,
    config: SyncConfig,
    status: SyncStatus,
    /// Consecutive failed gateway calls.
    failures: u32,
    synced_once: bool,
}

impl CollaborationManager {
    pub fn new(campaign: impl Into<String>, config: SyncConfig) -> Self {
        Self {
            campaign: campaign.into(),
            canvas: Canvas::new(),
            saves: SaveScheduler::new(config.save_debounce, config.forced_flush),
            config,
            status: SyncStatus::Connecting,
            failures: 0,
            synced_once: false,
        }
    }

    pub fn campaign(&self) -> &str {
        &self.campaign
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Current local collection.
    pub fn elements(&self) -> &[Element] {
        self.canvas.document.elements()
    }

    pub fn status(&self) -> SyncStatus {
        self.status
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures
    }

    /// Element the local user is interacting with.
    pub fn editing_target(&self) -> Option<ElementId> {
        self.canvas.editing_target()
    }

    // --- Surface operations ---

    pub fn set_tool(&mut self, tool: ToolKind) {
        self.canvas.set_tool(tool);
    }

    /// Set the color and stroke width used for new elements.
    pub fn set_style(&mut self, color: crate::shapes::HexColor, line_width: f64) {
        self.canvas.tool_manager.color = color;
        self.canvas.tool_manager.line_width = line_width;
    }

    pub fn pointer_down(&mut self, point: Point, now: i64) -> SurfaceResponse {
        let response = self.canvas.pointer_down(point, now);
        self.after(response, now)
    }

    pub fn pointer_move(&mut self, point: Point, now: i64) -> SurfaceResponse {
        let response = self.canvas.pointer_move(point, now);
        self.after(response, now)
    }

    pub fn pointer_up(&mut self, point: Point, now: i64) -> SurfaceResponse {
        let response = self.canvas.pointer_up(point, now);
        self.after(response, now)
    }

    pub fn submit_text(&mut self, content: &str, now: i64) -> SurfaceResponse {
        let response = self.canvas.submit_text(content, now);
        self.after(response, now)
    }

    pub fn cancel_text(&mut self) -> SurfaceResponse {
        self.canvas.cancel_text()
    }

    pub fn add_media(&mut self, kind: MediaKind, source: MediaSource, now: i64) -> ElementId {
        let id = self.canvas.add_media(kind, source, now);
        self.after(SurfaceResponse::Commit, now);
        id
    }

    pub fn delete_selected(&mut self, now: i64) -> SurfaceResponse {
        let response = self.canvas.delete_selected();
        self.after(response, now)
    }

    pub fn clear(&mut self, now: i64) -> SurfaceResponse {
        let response = self.canvas.clear();
        self.after(response, now)
    }

    pub fn undo(&mut self, now: i64) -> SurfaceResponse {
        let response = self.canvas.undo(now);
        self.after(response, now)
    }

    pub fn redo(&mut self, now: i64) -> SurfaceResponse {
        let response = self.canvas.redo(now);
        self.after(response, now)
    }

    fn after(&mut self, response: SurfaceResponse, now: i64) -> SurfaceResponse {
        if response == SurfaceResponse::Commit {
            self.saves.mark_dirty(now);
            self.refresh_status();
        }
        response
    }

    // --- Poll path ---

    /// Whether a poll cycle may run now.
    pub fn should_poll(&self) -> bool {
        !self.canvas.is_gesture_active() && !self.saves.is_busy()
    }

    /// Merge a fetched collection. Returns true if the local collection changed.
    ///
    /// Suppression is checked again here since a gesture may have started
    /// while the fetch was in flight.
    pub fn apply_remote(&mut self, remote: Vec<Element>, now: i64) -> bool {
        self.record_success();
        if !self.should_poll() {
            log::debug!("Discarding fetch for {}: local edit in progress", self.campaign);
            return false;
        }
        let policy = MergePolicy {
            grace_window: self.config.grace_window,
        };
        let outcome = merge(self.elements(), &remote, now, &policy);
        let changed = outcome.is_changed();
        if let MergeOutcome::Adopted(_) = &outcome {
            log::info!("Loaded {} elements for {}", remote.len(), self.campaign);
        }
        if let Some(elements) = outcome.into_elements() {
            self.canvas.apply_remote(elements);
        }
        changed
    }

    /// Record a failed fetch; the cycle is skipped.
    pub fn poll_failed(&mut self, error: &GatewayError) {
        log::warn!("Sync fetch for {} failed: {}", self.campaign, error);
        self.record_failure();
    }

    // --- Save path ---

    /// Hand out the collection to save if a save is due at `now`.
    pub fn take_save(&mut self, now: i64) -> Option<Vec<Element>> {
        if !self.saves.should_save(now) {
            return None;
        }
        self.saves.begin();
        self.refresh_status();
        Some(self.elements().to_vec())
    }

    /// Hand out the collection if anything is unsaved, ignoring the debounce.
    pub fn take_pending_save(&mut self) -> Option<Vec<Element>> {
        if !self.saves.is_dirty() || self.saves.is_in_flight() {
            return None;
        }
        self.saves.begin();
        self.refresh_status();
        Some(self.elements().to_vec())
    }

    /// Record the outcome of a save handed out by [`take_save`](Self::take_save).
    pub fn save_finished(&mut self, result: &GatewayResult<i64>, now: i64) {
        match result {
            Ok(timestamp) => {
                log::debug!("Saved {} at {}", self.campaign, timestamp);
                self.saves.finish_ok(now);
                self.record_success();
            }
            Err(e) => {
                log::warn!("Save for {} failed: {}", self.campaign, e);
                self.saves.finish_err(now);
                self.record_failure();
            }
        }
    }

    /// Whether unsaved local changes exist.
    pub fn has_unsaved_changes(&self) -> bool {
        self.saves.is_dirty() || self.saves.is_in_flight()
    }

    fn record_success(&mut self) {
        if self.failures >= self.config.reconnecting_after {
            log::info!("Sync for {} recovered", self.campaign);
        }
        self.failures = 0;
        self.synced_once = true;
        self.refresh_status();
    }

    fn record_failure(&mut self) {
        self.failures = self.failures.saturating_add(1);
        if self.failures == self.config.reconnecting_after {
            log::error!(
                "Sync for {} degraded after {} consecutive failures",
                self.campaign,
                self.failures
            );
        }
        self.refresh_status();
    }

    fn refresh_status(&mut self) {
        self.status = if self.failures >= self.config.reconnecting_after {
            SyncStatus::Reconnecting {
                failures: self.failures,
            }
        } else if self.has_unsaved_changes() {
            SyncStatus::Saving
        } else if self.synced_once {
            SyncStatus::Synced
        } else {
            SyncStatus::Connecting
        };
    }
}

/// Run one poll cycle: suppression check, fetch, merge.
pub async fn poll_once(
    manager: &Mutex<CollaborationManager>,
    gateway: &dyn Gateway,
    clock: &dyn Clock,
) -> PollOutcome {
    let campaign = {
        let manager = manager.lock().unwrap_or_else(PoisonError::into_inner);
        if !manager.should_poll() {
            return PollOutcome::Skipped;
        }
        manager.campaign().to_string()
    };

    let fetched = gateway.fetch_elements(&campaign).await;

    let mut manager = manager.lock().unwrap_or_else(PoisonError::into_inner);
    match fetched {
        Ok(remote) => {
            if manager.apply_remote(remote, clock.now_millis()) {
                PollOutcome::Applied
            } else {
                PollOutcome::Unchanged
            }
        }
        Err(e) => {
            manager.poll_failed(&e);
            PollOutcome::Failed
        }
    }
}

/// Start a save if one is due. Returns the result of the save, if any ran.
pub async fn flush_once(
    manager: &Mutex<CollaborationManager>,
    gateway: &dyn Gateway,
    clock: &dyn Clock,
) -> Option<GatewayResult<i64>> {
    let (campaign, elements) = {
        let mut manager = manager.lock().unwrap_or_else(PoisonError::into_inner);
        let elements = manager.take_save(clock.now_millis())?;
        (manager.campaign().to_string(), elements)
    };
    run_save(manager, gateway, clock, campaign, elements).await
}

/// Save unsaved changes right away, as on shutdown.
pub async fn flush_pending(
    manager: &Mutex<CollaborationManager>,
    gateway: &dyn Gateway,
    clock: &dyn Clock,
) -> Option<GatewayResult<i64>> {
    let (campaign, elements) = {
        let mut manager = manager.lock().unwrap_or_else(PoisonError::into_inner);
        let elements = manager.take_pending_save()?;
        (manager.campaign().to_string(), elements)
    };
    run_save(manager, gateway, clock, campaign, elements).await
}

async fn run_save(
    manager: &Mutex<CollaborationManager>,
    gateway: &dyn Gateway,
    clock: &dyn Clock,
    campaign: String,
    elements: Vec<Element>,
) -> Option<GatewayResult<i64>> {
    let result = gateway.save_elements(&campaign, &elements).await;

    let mut manager = manager.lock().unwrap_or_else(PoisonError::into_inner);
    manager.save_finished(&result, clock.now_millis());
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::shapes::ElementKind;
    use crate::storage::MemoryGateway;
    use crate::test_util::block_on;

    fn manager() -> Mutex<CollaborationManager> {
        Mutex::new(CollaborationManager::new("campaign", SyncConfig::default()))
    }

    fn draw_rect(m: &Mutex<CollaborationManager>, clock: &ManualClock, from: Point, to: Point) {
        let mut m = m.lock().unwrap();
        let now = clock.now_millis();
        m.set_tool(ToolKind::Rectangle);
        m.pointer_down(from, now);
        m.pointer_move(to, now);
        m.pointer_up(to, now);
    }

    #[test]
    fn test_gesture_suppresses_poll() {
        let gateway = MemoryGateway::new();
        let clock = ManualClock::new(10_000);
        let m = manager();
        {
            let mut m = m.lock().unwrap();
            m.set_tool(ToolKind::Pen);
            m.pointer_down(Point::new(0.0, 0.0), 10_000);
        }
        assert_eq!(block_on(poll_once(&m, &gateway, &clock)), PollOutcome::Skipped);
    }

    #[test]
    fn test_pending_save_suppresses_poll_until_flushed() {
        let gateway = MemoryGateway::new();
        let clock = ManualClock::new(10_000);
        let m = manager();
        draw_rect(&m, &clock, Point::new(10.0, 10.0), Point::new(110.0, 60.0));
        assert_eq!(m.lock().unwrap().status(), SyncStatus::Saving);
        assert_eq!(block_on(poll_once(&m, &gateway, &clock)), PollOutcome::Skipped);

        // Still inside the debounce window.
        clock.advance(100);
        assert!(block_on(flush_once(&m, &gateway, &clock)).is_none());

        clock.advance(500);
        let saved = block_on(flush_once(&m, &gateway, &clock)).unwrap();
        assert!(saved.is_ok());
        assert_eq!(block_on(poll_once(&m, &gateway, &clock)), PollOutcome::Unchanged);
        assert_eq!(m.lock().unwrap().status(), SyncStatus::Synced);
    }

    #[test]
    fn test_flush_pending_ignores_debounce() {
        let gateway = MemoryGateway::new();
        let clock = ManualClock::new(10_000);
        let m = manager();
        assert!(block_on(flush_pending(&m, &gateway, &clock)).is_none());

        draw_rect(&m, &clock, Point::new(10.0, 10.0), Point::new(110.0, 60.0));
        assert!(block_on(flush_pending(&m, &gateway, &clock)).unwrap().is_ok());
        assert!(!m.lock().unwrap().has_unsaved_changes());
        assert_eq!(block_on(gateway.fetch_elements("campaign")).unwrap().len(), 1);
    }

    #[test]
    fn test_failures_surface_reconnecting_and_recover() {
        let gateway = MemoryGateway::new();
        let clock = ManualClock::new(10_000);
        let m = manager();
        gateway.set_unreachable(true);
        for _ in 0..3 {
            assert_eq!(block_on(poll_once(&m, &gateway, &clock)), PollOutcome::Failed);
        }
        assert_eq!(
            m.lock().unwrap().status(),
            SyncStatus::Reconnecting { failures: 3 }
        );

        gateway.set_unreachable(false);
        block_on(poll_once(&m, &gateway, &clock));
        assert_eq!(m.lock().unwrap().status(), SyncStatus::Synced);
    }

    #[test]
    fn test_failed_save_retries_without_blocking_polls() {
        let gateway = MemoryGateway::new();
        let clock = ManualClock::new(10_000);
        let m = manager();
        draw_rect(&m, &clock, Point::new(0.0, 0.0), Point::new(10.0, 10.0));

        gateway.set_unreachable(true);
        clock.advance(600);
        assert!(block_on(flush_once(&m, &gateway, &clock)).unwrap().is_err());
        assert!(m.lock().unwrap().should_poll());

        gateway.set_unreachable(false);
        clock.advance(3_000);
        assert!(block_on(flush_once(&m, &gateway, &clock)).unwrap().is_ok());
        let stored = block_on(gateway.fetch_elements("campaign")).unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[test]
    fn test_rectangle_reaches_second_client() {
        let gateway = MemoryGateway::new();
        let clock = ManualClock::new(10_000);
        let a = manager();
        let b = manager();
        draw_rect(&a, &clock, Point::new(10.0, 10.0), Point::new(110.0, 60.0));
        clock.advance(500);
        block_on(flush_once(&a, &gateway, &clock)).unwrap().unwrap();

        clock.advance(1_000);
        assert_eq!(block_on(poll_once(&b, &gateway, &clock)), PollOutcome::Applied);
        let b = b.lock().unwrap();
        let ElementKind::Rectangle(rect) = &b.elements()[0].kind else {
            panic!("expected rectangle");
        };
        assert_eq!(rect.position, Point::new(10.0, 10.0));
        assert_eq!((rect.width, rect.height), (100.0, 50.0));
    }

    #[test]
    fn test_unknown_kind_survives_resave() {
        let gateway = MemoryGateway::new();
        let clock = ManualClock::new(10_000);
        let sticker: Element = serde_json::from_value(serde_json::json!({
            "id": "s", "kind": "sticker", "timestamp": 1_000, "data": { "emoji": "dragon" }
        }))
        .unwrap();
        block_on(gateway.save_elements("campaign", &[sticker.clone()])).unwrap();

        let m = manager();
        assert_eq!(block_on(poll_once(&m, &gateway, &clock)), PollOutcome::Applied);
        draw_rect(&m, &clock, Point::new(10.0, 10.0), Point::new(110.0, 60.0));
        assert!(block_on(flush_pending(&m, &gateway, &clock)).unwrap().is_ok());

        let stored = block_on(gateway.fetch_elements("campaign")).unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.contains(&sticker));
    }
}
