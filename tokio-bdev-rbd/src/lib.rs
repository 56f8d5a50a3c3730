//! This crate exposes remote RBD-style storage images as fixed-size,
//! block-addressable disks, bridging a block-device framework's read/write
//! requests onto a backend image library's native async operations.
//!
//! # Usage
//!
//! 1. [`RbdAdapter::initialize`] with the backend and the parsed
//!    configuration entries. Every image is probed and registered as a
//!    [`Device`]; any failure rolls the whole pass back.
//! 2. Per execution context, [`RbdAdapter::create_channel`] for the device.
//!    The channel owns its own backend connection and image handle.
//! 3. Submit with [`IoChannel::read`] / [`IoChannel::writev`], passing a
//!    framework-allocated [`Request`].
//! 4. The backend completes on its own thread; the channel's drain poller
//!    redelivers each completion on the owning context through your
//!    [`CompletionSink`], exactly once per request.
//!
//! Completion delivery is LIFO within one drain pass and carries no ordering
//! guarantee relative to submission order.
//!
//! # Example
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use tokio_bdev_rbd::{
//!     mem::MemBackend, CompletionSink, DeviceEntry, IoStatus, RbdAdapter, Request,
//! };
//!
//! struct Collect(Mutex<Vec<(u64, IoStatus)>>);
//!
//! impl CompletionSink for Collect {
//!     fn io_complete(&self, request: Request, status: IoStatus) {
//!         self.0.lock().unwrap().push((request.user_data(), status));
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let backend = MemBackend::new();
//!     backend.create_image("rbd", "vol0", 1 << 20);
//!
//!     let adapter = RbdAdapter::initialize(
//!         backend,
//!         &[DeviceEntry {
//!             pool_name: "rbd".into(),
//!             image_name: "vol0".into(),
//!             block_size: None,
//!         }],
//!     )
//!     .unwrap();
//!
//!     let sink = Arc::new(Collect(Mutex::new(Vec::new())));
//!     let device = Arc::clone(&adapter.devices()[0]);
//!     let channel = adapter.create_channel(&device, sink.clone()).unwrap();
//!
//!     channel
//!         .writev(Request::new(1), vec![vec![7u8; 512]], 512, 0)
//!         .unwrap();
//!     while sink.0.lock().unwrap().len() < 1 {
//!         tokio::time::sleep(std::time::Duration::from_millis(1)).await;
//!     }
//!     assert_eq!(sink.0.lock().unwrap()[0], (1, IoStatus::Success));
//!
//!     channel.shutdown();
//!     adapter.shutdown();
//! }
//! ```

pub mod backend;
mod channel;
mod config;
mod device;
mod lifecycle;
pub mod mem;
pub mod metrics;
mod request;

pub use channel::{
    ChannelError, CompletionSink, FailedSubmission, IoChannel, SubmissionError, UnsupportedRequest,
};
pub use config::{ConfigError, DeviceEntry, DEFAULT_BLOCK_SIZE};
pub use device::{Device, Pool, PoolRegistry};
pub use lifecycle::{InitError, RbdAdapter};
pub use request::{Direction, IoResources, IoStatus, Request};

#[doc(hidden)]
pub mod env_tunables {
    pub(crate) static DRAIN_INTERVAL: once_cell::sync::Lazy<std::time::Duration> =
        once_cell::sync::Lazy::new(|| {
            std::env::var("BDEV_RBD_DRAIN_INTERVAL_US")
                .map(|v| {
                    let us: u64 = v
                        .parse()
                        .expect("BDEV_RBD_DRAIN_INTERVAL_US must be an integer microsecond count");
                    std::time::Duration::from_micros(us)
                })
                .unwrap_or_else(|e| match e {
                    std::env::VarError::NotPresent => std::time::Duration::from_micros(100),
                    std::env::VarError::NotUnicode(_) => {
                        panic!("BDEV_RBD_DRAIN_INTERVAL_US must be a unicode string")
                    }
                })
        });
}
