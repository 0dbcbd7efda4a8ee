//! In-memory gateway implementation.

use super::{BoxFuture, Gateway, GatewayError, GatewayResult, slugify, upsert_presence};
use crate::clock::{Clock, SystemClock};
use crate::presence::PresenceRecord;
use crate::shapes::Element;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

#[derive(Default)]
struct CampaignState {
    elements: Vec<Element>,
    presence: Vec<PresenceRecord>,
}

/// In-memory gateway for tests and ephemeral servers.
///
/// Can be switched to "unreachable" to exercise failure paths.
#[derive(Default)]
pub struct MemoryGateway {
    campaigns: RwLock<HashMap<String, CampaignState>>,
    unreachable: AtomicBool,
    last_save: AtomicI64,
}

impl MemoryGateway {
    /// Create a new empty memory gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with a transport error until reset.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    fn check_reachable(&self) -> GatewayResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport("store unreachable".to_string()));
        }
        Ok(())
    }

    /// Next save timestamp: wall-clock millis, strictly increasing.
    fn next_save_timestamp(&self) -> i64 {
        let now = SystemClock.now_millis();
        let step = |prev: i64| now.max(prev.saturating_add(1));
        let prev = self
            .last_save
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| Some(step(prev)))
            .unwrap_or_else(|prev| prev);
        step(prev)
    }
}

fn lock_error<T>(e: std::sync::PoisonError<T>) -> GatewayError {
    GatewayError::Lock(e.to_string())
}

impl Gateway for MemoryGateway {
    fn fetch_elements<'a>(&'a self, campaign: &'a str) -> BoxFuture<'a, GatewayResult<Vec<Element>>> {
        Box::pin(async move {
            self.check_reachable()?;
            let campaigns = self.campaigns.read().map_err(lock_error)?;
            Ok(campaigns
                .get(&slugify(campaign))
                .map(|c| c.elements.clone())
                .unwrap_or_default())
        })
    }

    fn save_elements<'a>(
        &'a self,
        campaign: &'a str,
        elements: &'a [Element],
    ) -> BoxFuture<'a, GatewayResult<i64>> {
        Box::pin(async move {
            self.check_reachable()?;
            let mut campaigns = self.campaigns.write().map_err(lock_error)?;
            campaigns.entry(slugify(campaign)).or_default().elements = elements.to_vec();
            Ok(self.next_save_timestamp())
        })
    }

    fn fetch_presence<'a>(
        &'a self,
        campaign: &'a str,
    ) -> BoxFuture<'a, GatewayResult<Vec<PresenceRecord>>> {
        Box::pin(async move {
            self.check_reachable()?;
            let campaigns = self.campaigns.read().map_err(lock_error)?;
            Ok(campaigns
                .get(&slugify(campaign))
                .map(|c| c.presence.clone())
                .unwrap_or_default())
        })
    }

    fn publish_presence<'a>(
        &'a self,
        campaign: &'a str,
        record: &'a PresenceRecord,
    ) -> BoxFuture<'a, GatewayResult<()>> {
        Box::pin(async move {
            self.check_reachable()?;
            let mut campaigns = self.campaigns.write().map_err(lock_error)?;
            let state = campaigns.entry(slugify(campaign)).or_default();
            upsert_presence(&mut state.presence, record.clone());
            Ok(())
        })
    }
}
