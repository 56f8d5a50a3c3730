//! Per-execution-context I/O channels.
//!
//! A channel bundles its own backend connection and image handle with a
//! completed-request queue and a registered periodic drain. Backend handles
//! are never shared across execution contexts, even for the same device, so
//! there is no cross-thread reentrancy into the backend library; the only
//! cross-thread traffic is the completed queue (see [`completion`]).

pub(crate) mod completion;
mod lifecycle;
mod submission;
#[cfg(test)]
pub(crate) mod test_util;

use std::sync::Arc;

use crate::backend::{Backend, ConnectionOf, ImageOf};
use crate::device::Device;
use crate::request::{IoStatus, Request};

pub use lifecycle::ChannelError;
pub use submission::{FailedSubmission, SubmissionError, UnsupportedRequest};

/// The framework's upward completion interface.
///
/// Invoked by the drain poller on the channel's owning execution context,
/// exactly once per request that made it past submission. The request comes
/// back whole so the framework can reclaim its buffers.
pub trait CompletionSink: Send + Sync + 'static {
    fn io_complete(&self, request: Request, status: IoStatus);
}

/// Per-execution-context state for one device: an independent connection and
/// image handle, the completed queue, and the drain poller registration.
///
/// Created by the framework when an execution context first needs a channel
/// to a device ([`crate::RbdAdapter::create_channel`]); torn down via
/// [`IoChannel::shutdown`] or drop.
pub struct IoChannel<B: Backend> {
    device: Arc<Device>,
    // `Option` so teardown can release in order; always `Some` while the
    // channel is live.
    conn: Option<ConnectionOf<B>>,
    image: Option<ImageOf<B>>,
    shared: Arc<completion::ChannelShared>,
    sink: Arc<dyn CompletionSink>,
    poller: Option<completion::PollerRegistration>,
}

impl<B: Backend> IoChannel<B> {
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Run one drain pass on the caller's context, for frameworks that own
    /// their own periodic-callback mechanism. Returns the number delivered.
    pub fn drain(&self) -> usize {
        completion::drain(&self.shared, &*self.sink)
    }
}
