//! Runs a gateway whose futures do synchronous I/O on tokio's blocking pool.
//!
//! [`FileGateway`](magboard_core::storage::FileGateway) reads and writes with
//! `std::fs` inside its futures, which would otherwise stall a runtime worker
//! for the duration of every request.

use magboard_core::presence::PresenceRecord;
use magboard_core::shapes::Element;
use magboard_core::storage::{BoxFuture, Gateway, GatewayError, GatewayResult};
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Wraps a gateway so each call runs on a `spawn_blocking` thread.
pub struct BlockingGateway<G> {
    inner: Arc<G>,
}

impl<G: Gateway + 'static> BlockingGateway<G> {
    pub fn new(inner: G) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }
}

/// Drive `task` to completion on the blocking pool.
async fn run_blocking<T, Fut>(task: Fut) -> GatewayResult<T>
where
    T: Send + 'static,
    Fut: Future<Output = GatewayResult<T>> + Send + 'static,
{
    let handle = Handle::current();
    tokio::task::spawn_blocking(move || handle.block_on(task))
        .await
        .map_err(|e| GatewayError::Io(format!("Storage task failed: {e}")))?
}

impl<G: Gateway + 'static> Gateway for BlockingGateway<G> {
    fn fetch_elements<'a>(&'a self, campaign: &'a str) -> BoxFuture<'a, GatewayResult<Vec<Element>>> {
        let (inner, campaign) = (self.inner.clone(), campaign.to_string());
        Box::pin(run_blocking(async move { inner.fetch_elements(&campaign).await }))
    }

    fn save_elements<'a>(
        &'a self,
        campaign: &'a str,
        elements: &'a [Element],
    ) -> BoxFuture<'a, GatewayResult<i64>> {
        let (inner, campaign) = (self.inner.clone(), campaign.to_string());
        let elements = elements.to_vec();
        Box::pin(run_blocking(async move { inner.save_elements(&campaign, &elements).await }))
    }

    fn fetch_presence<'a>(
        &'a self,
        campaign: &'a str,
    ) -> BoxFuture<'a, GatewayResult<Vec<PresenceRecord>>> {
        let (inner, campaign) = (self.inner.clone(), campaign.to_string());
        Box::pin(run_blocking(async move { inner.fetch_presence(&campaign).await }))
    }

    fn publish_presence<'a>(
        &'a self,
        campaign: &'a str,
        record: &'a PresenceRecord,
    ) -> BoxFuture<'a, GatewayResult<()>> {
        let (inner, campaign) = (self.inner.clone(), campaign.to_string());
        let record = record.clone();
        Box::pin(run_blocking(async move { inner.publish_presence(&campaign, &record).await }))
    }
}
