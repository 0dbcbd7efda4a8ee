//! Magboard Core Library
//!
//! Element model, merge engine, presence and persistence gateway for the
//! magboard campaign whiteboard. Independent of any async runtime or renderer.

pub mod canvas;
pub mod clock;
pub mod collaboration;
pub mod merge;
pub mod presence;
pub mod selection;
pub mod shapes;
pub mod storage;
pub mod sync;
pub mod tools;
pub mod wire;

pub use canvas::{Canvas, ElementCollection, SurfaceResponse};
pub use clock::{Clock, ManualClock, SystemClock};
pub use collaboration::{CollaborationManager, PollOutcome, flush_once, flush_pending, poll_once};
pub use merge::{MergeOutcome, MergePolicy, merge};
pub use presence::{PresenceConfig, PresenceRecord, PresenceTracker, color_for_user};
pub use selection::{Corner, Handle, Manipulation};
pub use shapes::{Element, ElementId, ElementKind, Geometry, HexColor, OpaqueElement};
pub use storage::{FileGateway, Gateway, GatewayError, GatewayResult, MemoryGateway, SaveScheduler};
pub use sync::{ElementsEnvelope, PresenceEnvelope, SaveAck, SyncConfig, SyncStatus};
pub use tools::{ToolKind, ToolManager};
pub use wire::{WireElement, WireError};

#[cfg(test)]
pub(crate) mod test_util {
    /// Simple blocking executor for the runtime-free futures in this crate.
    pub fn block_on<F: std::future::Future>(f: F) -> F::Output {
        use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

        fn dummy_raw_waker() -> RawWaker {
            fn no_op(_: *const ()) {}
            fn clone(_: *const ()) -> RawWaker {
                dummy_raw_waker()
            }
            static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
            RawWaker::new(std::ptr::null(), &VTABLE)
        }

        let waker = unsafe { Waker::from_raw(dummy_raw_waker()) };
        let mut cx = Context::from_waker(&waker);
        let mut f = std::pin::pin!(f);

        loop {
            if let Poll::Ready(result) = f.as_mut().poll(&mut cx) {
                return result;
            }
        }
    }
}
