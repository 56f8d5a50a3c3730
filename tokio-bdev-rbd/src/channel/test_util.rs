//! Shared fixtures: a scriptable backend and a recording completion sink.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::backend::{Backend, Completion, Connection, Image, ImageInfo, RejectedAio};
use crate::channel::CompletionSink;
use crate::device::{Device, PoolRegistry};
use crate::request::{IoResources, IoStatus, Request};

pub(crate) fn test_device() -> Arc<Device> {
    let mut pools = PoolRegistry::new();
    let pool = pools.get_or_create("rbd");
    Arc::new(Device::new(
        "Rbd0".to_owned(),
        "RBD image",
        "vol0",
        pool,
        512,
        10_485_760,
    ))
}

/// What the scripted backend does with the next async operation.
/// Behaviors are consumed in submission order; when the script runs dry the
/// backend completes with the natural success value (full length for reads,
/// zero for writes).
pub(crate) enum AioBehavior {
    /// Complete with the natural success value.
    CompleteOk,
    /// Complete with this exact result code.
    Complete(i64),
    /// Park the completion until [`ScriptState::release_held`].
    Hold,
    /// Refuse the submission synchronously.
    Reject,
}

struct Held {
    completion: Completion,
    buf: Vec<u8>,
    natural: i64,
}

pub(crate) struct ScriptState {
    size_bytes: u64,
    behaviors: Mutex<VecDeque<AioBehavior>>,
    held: Mutex<Vec<Held>>,
    pub(crate) aio_calls: AtomicUsize,
    pub(crate) flushed: AtomicBool,
}

impl ScriptState {
    pub(crate) fn push_behavior(&self, behavior: AioBehavior) {
        self.behaviors.lock().unwrap().push_back(behavior);
    }

    /// Complete all parked operations with their natural success values, in
    /// the order they were submitted, each from a foreign thread.
    pub(crate) fn release_held(&self) -> usize {
        let held = std::mem::take(&mut *self.held.lock().unwrap());
        let n = held.len();
        for h in held {
            complete_from_foreign_thread(h.completion, h.natural, h.buf);
        }
        n
    }

    fn run(&self, natural: i64, buf: Vec<u8>, completion: Completion) -> Result<(), RejectedAio> {
        self.aio_calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self
            .behaviors
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(AioBehavior::CompleteOk);
        match behavior {
            AioBehavior::CompleteOk => {
                complete_from_foreign_thread(completion, natural, buf);
                Ok(())
            }
            AioBehavior::Complete(code) => {
                complete_from_foreign_thread(completion, code, buf);
                Ok(())
            }
            AioBehavior::Hold => {
                self.held.lock().unwrap().push(Held {
                    completion,
                    buf,
                    natural,
                });
                Ok(())
            }
            AioBehavior::Reject => Err(RejectedAio {
                completion,
                buf,
                error: io::Error::from_raw_os_error(5),
            }),
        }
    }
}

// The capture contract allows any thread; always exercise a foreign one.
fn complete_from_foreign_thread(completion: Completion, code: i64, buf: Vec<u8>) {
    std::thread::spawn(move || completion.complete(code, buf))
        .join()
        .unwrap();
}

pub(crate) struct ScriptedBackend {
    pub(crate) state: Arc<ScriptState>,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        ScriptedBackend {
            state: Arc::new(ScriptState {
                size_bytes: 10_485_760,
                behaviors: Mutex::new(VecDeque::new()),
                held: Mutex::new(Vec::new()),
                aio_calls: AtomicUsize::new(0),
                flushed: AtomicBool::new(false),
            }),
        }
    }
}

impl Backend for ScriptedBackend {
    type Connection = ScriptedConnection;

    fn connect(&self, _pool_name: &str) -> io::Result<ScriptedConnection> {
        Ok(ScriptedConnection {
            state: Arc::clone(&self.state),
        })
    }
}

pub(crate) struct ScriptedConnection {
    state: Arc<ScriptState>,
}

impl Connection for ScriptedConnection {
    type Image = ScriptedImage;

    fn open_image(&self, _image_name: &str) -> io::Result<ScriptedImage> {
        Ok(ScriptedImage {
            state: Arc::clone(&self.state),
        })
    }
}

pub(crate) struct ScriptedImage {
    state: Arc<ScriptState>,
}

impl Image for ScriptedImage {
    fn stat(&self) -> io::Result<ImageInfo> {
        Ok(ImageInfo {
            size_bytes: self.state.size_bytes,
        })
    }

    fn flush(&self) -> io::Result<()> {
        self.state.flushed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn aio_read(
        &self,
        _offset: u64,
        buf: Vec<u8>,
        completion: Completion,
    ) -> Result<(), RejectedAio> {
        let natural = buf.len() as i64;
        self.state.run(natural, buf, completion)
    }

    fn aio_write(
        &self,
        _offset: u64,
        buf: Vec<u8>,
        completion: Completion,
    ) -> Result<(), RejectedAio> {
        self.state.run(0, buf, completion)
    }
}

pub(crate) struct RecordingSink {
    delivered: Mutex<Vec<(IoStatus, Request)>>,
}

impl RecordingSink {
    pub(crate) fn new() -> Self {
        RecordingSink {
            delivered: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }

    /// Delivery order as `(user_data, status)` pairs.
    pub(crate) fn order(&self) -> Vec<(u64, IoStatus)> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|(status, req)| (req.user_data(), *status))
            .collect()
    }

    pub(crate) fn status_of(&self, user_data: u64) -> Option<IoStatus> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .find(|(_, req)| req.user_data() == user_data)
            .map(|(status, _)| *status)
    }

    pub(crate) fn take_resources(&self, user_data: u64) -> Option<IoResources> {
        self.delivered
            .lock()
            .unwrap()
            .iter_mut()
            .find(|(_, req)| req.user_data() == user_data)
            .and_then(|(_, req)| req.take_resources())
    }

    pub(crate) async fn wait_for(&self, n: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.count() < n {
            if Instant::now() > deadline {
                panic!("timed out waiting for {n} completions, got {}", self.count());
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

impl CompletionSink for RecordingSink {
    fn io_complete(&self, request: Request, status: IoStatus) {
        self.delivered.lock().unwrap().push((status, request));
    }
}
