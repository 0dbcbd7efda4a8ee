//! A joined campaign whiteboard and the background loops that keep it in sync.

use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::shortcuts::{ShortcutAction, ShortcutRegistry};
use kurbo::{Point, Size};
use magboard_core::canvas::SurfaceResponse;
use magboard_core::clock::Clock;
use magboard_core::collaboration::{CollaborationManager, flush_once, flush_pending, poll_once};
use magboard_core::presence::{PresenceRecord, PresenceTracker, discover_once, heartbeat_once};
use magboard_core::shapes::{Element, ElementId, HexColor, MediaKind, MediaSource};
use magboard_core::storage::Gateway;
use magboard_core::sync::SyncStatus;
use magboard_core::tools::ToolKind;
use magboard_render::{DisplayListRenderer, DrawCommand, RenderContext, Renderer};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// How often the flush loop checks whether a save is due.
const FLUSH_TICK: Duration = Duration::from_millis(100);

/// Shortest loop period; `tokio::time::interval` panics on zero.
const MIN_LOOP_PERIOD: Duration = Duration::from_millis(1);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An open whiteboard session.
///
/// Owns the sync and presence loops; they run until [`close`](Self::close)
/// is awaited or the session is dropped.
pub struct WhiteboardSession {
    campaign: String,
    manager: Arc<Mutex<CollaborationManager>>,
    presence: Arc<Mutex<PresenceTracker>>,
    gateway: Arc<dyn Gateway>,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
    tasks: TaskTracker,
    renderer: DisplayListRenderer,
}

impl WhiteboardSession {
    /// Join the configured campaign and start the background loops.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(gateway: Arc<dyn Gateway>, clock: Arc<dyn Clock>, config: &ClientConfig) -> Self {
        let manager = CollaborationManager::new(config.campaign.clone(), config.sync);
        let tracker = PresenceTracker::new(
            config.user_id.clone(),
            config.user_name.clone(),
            config.presence.staleness,
        );

        let session = Self {
            campaign: config.campaign.clone(),
            manager: Arc::new(Mutex::new(manager)),
            presence: Arc::new(Mutex::new(tracker)),
            gateway,
            clock,
            cancel: CancellationToken::new(),
            tasks: TaskTracker::new(),
            renderer: DisplayListRenderer::new(),
        };
        session.start(config);
        log::info!(
            "Joined campaign {} as {} ({})",
            config.campaign,
            config.user_name,
            config.user_id
        );
        session
    }

    fn start(&self, config: &ClientConfig) {
        let (manager, gateway, clock) = (self.manager.clone(), self.gateway.clone(), self.clock.clone());
        self.spawn_loop("sync", config.sync.sync_interval, move || {
            let (manager, gateway, clock) = (manager.clone(), gateway.clone(), clock.clone());
            async move {
                poll_once(&manager, gateway.as_ref(), clock.as_ref()).await;
            }
        });

        let (manager, gateway, clock) = (self.manager.clone(), self.gateway.clone(), self.clock.clone());
        self.spawn_loop("save", FLUSH_TICK, move || {
            let (manager, gateway, clock) = (manager.clone(), gateway.clone(), clock.clone());
            async move {
                flush_once(&manager, gateway.as_ref(), clock.as_ref()).await;
            }
        });

        let (tracker, gateway, clock) = (self.presence.clone(), self.gateway.clone(), self.clock.clone());
        let campaign = self.campaign.clone();
        self.spawn_loop("heartbeat", config.presence.heartbeat_interval, move || {
            let (tracker, gateway, clock) = (tracker.clone(), gateway.clone(), clock.clone());
            let campaign = campaign.clone();
            async move {
                if let Err(e) = heartbeat_once(&tracker, gateway.as_ref(), &campaign, clock.as_ref()).await {
                    log::warn!("Presence heartbeat for {} failed: {}", campaign, e);
                }
            }
        });

        let (tracker, gateway, clock) = (self.presence.clone(), self.gateway.clone(), self.clock.clone());
        let campaign = self.campaign.clone();
        self.spawn_loop("discovery", config.presence.discovery_interval, move || {
            let (tracker, gateway, clock) = (tracker.clone(), gateway.clone(), clock.clone());
            let campaign = campaign.clone();
            async move {
                match discover_once(&tracker, gateway.as_ref(), &campaign, clock.as_ref()).await {
                    Ok(count) => log::trace!("{} other users on {}", count, campaign),
                    Err(e) => log::warn!("Presence discovery for {} failed: {}", campaign, e),
                }
            }
        });
    }

    /// Run `tick` every `period` until the session is cancelled.
    fn spawn_loop<F, Fut>(&self, name: &'static str, period: Duration, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = self.cancel.clone();
        self.tasks.spawn(async move {
            let mut ticker = tokio::time::interval(period.max(MIN_LOOP_PERIOD));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        // The tick itself is not interrupted; cancellation lands between ticks.
                        tick().await;
                    }
                }
            }
            log::debug!("{} loop stopped", name);
        });
    }

    /// Stop every loop, then save anything still unsaved.
    pub async fn close(self) -> ClientResult<()> {
        self.cancel.cancel();
        self.tasks.close();
        self.tasks.wait().await;

        let result = flush_pending(&self.manager, self.gateway.as_ref(), self.clock.as_ref()).await;
        log::info!("Left campaign {}", self.campaign);
        match result {
            Some(Err(e)) => Err(e.into()),
            _ => Ok(()),
        }
    }

    /// Whether the background loops are still running.
    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    pub fn campaign(&self) -> &str {
        &self.campaign
    }

    pub fn status(&self) -> SyncStatus {
        lock(&self.manager).status()
    }

    /// Snapshot of the local collection.
    pub fn elements(&self) -> Vec<Element> {
        lock(&self.manager).elements().to_vec()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        lock(&self.manager).has_unsaved_changes()
    }

    /// Other users currently on the board.
    pub fn peers(&self) -> Vec<PresenceRecord> {
        lock(&self.presence).visible_others(self.clock.now_millis())
    }

    pub fn set_tool(&self, tool: ToolKind) {
        lock(&self.manager).set_tool(tool);
    }

    pub fn set_style(&self, color: HexColor, line_width: f64) {
        lock(&self.manager).set_style(color, line_width);
    }

    /// Apply a surface operation, then mirror the editing target into presence.
    fn surface<R>(&self, op: impl FnOnce(&mut CollaborationManager, i64) -> R) -> R {
        let now = self.clock.now_millis();
        let (result, editing) = {
            let mut manager = lock(&self.manager);
            let result = op(&mut manager, now);
            (result, manager.editing_target())
        };
        lock(&self.presence).set_editing(editing);
        result
    }

    fn track_cursor(&self, point: Point) {
        lock(&self.presence).set_cursor(point);
    }

    pub fn pointer_down(&self, point: Point) -> SurfaceResponse {
        self.track_cursor(point);
        self.surface(|m, now| m.pointer_down(point, now))
    }

    pub fn pointer_move(&self, point: Point) -> SurfaceResponse {
        self.track_cursor(point);
        self.surface(|m, now| m.pointer_move(point, now))
    }

    pub fn pointer_up(&self, point: Point) -> SurfaceResponse {
        self.track_cursor(point);
        self.surface(|m, now| m.pointer_up(point, now))
    }

    pub fn submit_text(&self, content: &str) -> SurfaceResponse {
        self.surface(|m, now| m.submit_text(content, now))
    }

    pub fn cancel_text(&self) -> SurfaceResponse {
        self.surface(|m, _| m.cancel_text())
    }

    pub fn add_media(&self, kind: MediaKind, source: MediaSource) -> ElementId {
        self.surface(|m, now| m.add_media(kind, source, now))
    }

    pub fn delete_selected(&self) -> SurfaceResponse {
        self.surface(|m, now| m.delete_selected(now))
    }

    /// Remove every element from the board.
    pub fn clear(&self) -> SurfaceResponse {
        self.surface(|m, now| m.clear(now))
    }

    pub fn undo(&self) -> SurfaceResponse {
        self.surface(|m, now| m.undo(now))
    }

    pub fn redo(&self) -> SurfaceResponse {
        self.surface(|m, now| m.redo(now))
    }

    /// Dispatch a key press. Returns `None` if the key is unbound.
    pub fn handle_shortcut(&self, key: &str, ctrl: bool, shift: bool) -> Option<SurfaceResponse> {
        let action = ShortcutRegistry::lookup(key, ctrl, shift)?;
        Some(match action {
            ShortcutAction::Tool(tool) => {
                self.set_tool(tool);
                SurfaceResponse::Redraw
            }
            ShortcutAction::Undo => self.undo(),
            ShortcutAction::Redo => self.redo(),
            ShortcutAction::DeleteSelected => self.delete_selected(),
            ShortcutAction::Cancel => self.cancel_text(),
        })
    }

    /// Build the draw commands for the current frame.
    pub fn render(&mut self, viewport: Size) -> ClientResult<Vec<DrawCommand>> {
        let now = self.clock.now_millis();
        let (peers, color) = {
            let tracker = lock(&self.presence);
            (tracker.visible_others(now), tracker.color())
        };
        let manager = lock(&self.manager);
        let ctx = RenderContext::new(manager.canvas(), viewport)
            .with_peers(&peers)
            .with_selection_color(color.into())
            .with_status(manager.status());
        self.renderer.build_scene(&ctx)?;
        Ok(self.renderer.take_commands())
    }
}

impl Drop for WhiteboardSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for WhiteboardSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhiteboardSession")
            .field("campaign", &self.campaign)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
