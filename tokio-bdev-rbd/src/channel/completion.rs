//! Completion capture and the drain poller.
//!
//! Completions arrive on the backend's own thread at unpredictable times
//! while submissions and drains happen on the channel's owning execution
//! context. The only state shared across threads is the channel's completed
//! stack, protected by a lock that is held only for the head-push (capture
//! side) or the detach-and-replace swap (drain side), never across a
//! backend call or an upward completion call.

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::channel::CompletionSink;
use crate::request::{Direction, IoStatus, Request};

/// The channel state shared with in-flight completion handles.
#[derive(Debug, Default)]
pub(crate) struct ChannelShared {
    /// Completed-but-undelivered requests. LIFO: capture pushes at the head
    /// (the `Vec` tail), drain delivers last-pushed first. This gives no
    /// ordering guarantee relative to submission order. Load-bearing;
    /// callers must not rely on FIFO delivery.
    completed: Mutex<Vec<Request>>,
}

impl ChannelShared {
    pub(crate) fn push_completed(&self, request: Request) {
        let mut completed = self.completed.lock().unwrap();
        completed.push(request);
    }

    /// Atomically detach the completed stack, leaving an empty live queue
    /// for captures that arrive during the delivery walk.
    pub(crate) fn detach(&self) -> Vec<Request> {
        let mut completed = self.completed.lock().unwrap();
        std::mem::take(&mut *completed)
    }
}

/// Handle correlating one issued async operation with its eventual result.
///
/// Created by the submission path, bound to the request and the channel's
/// completed queue. The backend invokes [`Completion::complete`] exactly once
/// per accepted operation; a rejected submission hands the handle back inside
/// [`crate::backend::RejectedAio`] instead.
#[derive(Debug)]
pub struct Completion {
    request: Request,
    shared: Arc<ChannelShared>,
}

impl Completion {
    pub(crate) fn new(request: Request, shared: Arc<ChannelShared>) -> Self {
        Completion { request, shared }
    }

    /// Capture one completion. Callable from any thread.
    ///
    /// Classifies the backend's result code (a read succeeds iff the number
    /// of bytes transferred equals the requested length, a write succeeds iff
    /// the code is exactly zero), then queues the request for the drain
    /// poller. Never reports upward directly: delivery is deferred so that
    /// completions are always observed on the channel's owning context.
    pub fn complete(self, result: i64, buf: Vec<u8>) {
        let Completion { mut request, shared } = self;
        let status = match request.direction() {
            Some(Direction::Read) => {
                if result == request.expected_len() as i64 {
                    IoStatus::Success
                } else {
                    IoStatus::Failed
                }
            }
            Some(Direction::Write) => {
                if result == 0 {
                    IoStatus::Success
                } else {
                    IoStatus::Failed
                }
            }
            None => unreachable!("direction is populated at submission"),
        };
        trace!(
            user_data = request.user_data(),
            result,
            ?status,
            "completion captured"
        );
        request.set_status(status);
        request.put_back_buf(buf);
        shared.push_completed(request);
    }

    /// Release the handle without completing, recovering the request.
    /// Used by the submission path when the backend rejects the operation.
    pub(crate) fn into_request(self) -> Request {
        self.request
    }
}

/// One drain pass: detach the completed stack under the lock, then deliver
/// each request upward without holding it. Returns the number delivered.
pub(crate) fn drain(shared: &ChannelShared, sink: &dyn CompletionSink) -> usize {
    let detached = shared.detach();
    let n = detached.len();
    for request in detached.into_iter().rev() {
        let status = request.status();
        trace!(user_data = request.user_data(), ?status, "delivering completion");
        sink.io_complete(request, status);
    }
    if n > 0 {
        crate::metrics::GLOBAL_STORAGE
            .completions_delivered
            .fetch_add(n as u64, std::sync::atomic::Ordering::Relaxed);
    }
    n
}

/// Registration of the periodic drain with the owning execution context.
/// Cancelling the token is the deregistration; the task performs one final
/// drain before exiting so queued completions are still delivered.
#[derive(Debug)]
pub(crate) struct PollerRegistration {
    cancel: CancellationToken,
    #[allow(dead_code)]
    task: tokio::task::JoinHandle<()>,
}

impl PollerRegistration {
    pub(crate) fn deregister(&self) {
        self.cancel.cancel();
    }
}

/// Spawn the periodic drain task on the current runtime. Must be called from
/// the execution context that owns the channel.
pub(crate) fn register_poller(
    shared: Arc<ChannelShared>,
    sink: Arc<dyn CompletionSink>,
) -> PollerRegistration {
    let cancel = CancellationToken::new();
    let task = tokio::spawn(poller_task(shared, sink, cancel.clone()));
    PollerRegistration { cancel, task }
}

async fn poller_task(
    shared: Arc<ChannelShared>,
    sink: Arc<dyn CompletionSink>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(*crate::env_tunables::DRAIN_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                drain(&shared, &*sink);
            }
        }
    }
    let leftover = drain(&shared, &*sink);
    debug!(leftover, "drain poller deregistered");
}
