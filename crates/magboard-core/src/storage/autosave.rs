//! Debounced save scheduling.
//!
//! Collapses bursts of local mutations into one save, forces a save through
//! once it has been pending for the forced-flush ceiling, and tracks whether a
//! save is pending or in flight so the poller can stay out of the way.

use std::time::Duration;

fn millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

/// Decides when the local collection should be written to the gateway.
#[derive(Debug, Clone)]
pub struct SaveScheduler {
    debounce: i64,
    forced_flush: i64,
    /// Unsaved local changes exist.
    dirty: bool,
    /// When the oldest unsaved change was made.
    pending_since: Option<i64>,
    /// Debounce deadline, re-armed by every mutation.
    deadline: Option<i64>,
    /// A save has been handed out and not yet finished.
    in_flight: bool,
    /// The last save failed and nothing was mutated since.
    retrying: bool,
    /// Time of the last successful save.
    last_save: Option<i64>,
}

impl SaveScheduler {
    pub fn new(debounce: Duration, forced_flush: Duration) -> Self {
        Self {
            debounce: millis(debounce),
            forced_flush: millis(forced_flush),
            dirty: false,
            pending_since: None,
            deadline: None,
            in_flight: false,
            retrying: false,
            last_save: None,
        }
    }

    /// Record a local mutation at `now`.
    pub fn mark_dirty(&mut self, now: i64) {
        self.dirty = true;
        self.retrying = false;
        self.pending_since.get_or_insert(now);
        self.deadline = Some(now.saturating_add(self.debounce));
    }

    /// Check if the document has unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// A save is pending or in flight; remote merges must wait.
    pub fn is_busy(&self) -> bool {
        self.in_flight || (self.dirty && !self.retrying)
    }

    /// Time of the last successful save.
    pub fn last_save(&self) -> Option<i64> {
        self.last_save
    }

    /// Whether a save should be started at `now`.
    pub fn should_save(&self, now: i64) -> bool {
        if !self.dirty || self.in_flight {
            return false;
        }
        let debounced = self.deadline.is_some_and(|d| now >= d);
        let overdue = self
            .pending_since
            .is_some_and(|since| now.saturating_sub(since) >= self.forced_flush);
        debounced || overdue
    }

    /// Hand out a save. Mutations made while it is in flight dirty the
    /// scheduler again and produce a follow-up save.
    pub fn begin(&mut self) {
        self.in_flight = true;
        self.dirty = false;
        self.retrying = false;
        self.pending_since = None;
        self.deadline = None;
    }

    pub fn finish_ok(&mut self, now: i64) {
        self.in_flight = false;
        self.last_save = Some(now);
    }

    /// The save failed: keep the changes dirty, stop suppressing polls, and
    /// retry on the next mutation or after the forced-flush ceiling.
    pub fn finish_err(&mut self, now: i64) {
        self.in_flight = false;
        self.dirty = true;
        self.retrying = true;
        self.pending_since = Some(now);
        self.deadline = Some(now.saturating_add(self.forced_flush));
    }
}

impl Default for SaveScheduler {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_millis(3000))
    }
}
