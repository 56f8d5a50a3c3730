//! Channel creation and teardown.

use std::io;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::backend::{Backend, Connection, Image};
use crate::channel::{completion, CompletionSink, IoChannel};
use crate::device::Device;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("failed to connect to pool {pool:?}")]
    Connect {
        pool: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to open image {image:?}")]
    OpenImage {
        image: String,
        #[source]
        source: io::Error,
    },
}

impl<B: Backend> IoChannel<B> {
    /// Open a fresh connection and image handle for this channel, then
    /// register the periodic drain on the current runtime. Partial
    /// construction releases whatever was acquired (a failed image open
    /// drops the connection on the way out).
    pub(crate) fn create(
        backend: &B,
        device: Arc<Device>,
        sink: Arc<dyn CompletionSink>,
    ) -> Result<Self, ChannelError> {
        let conn = backend
            .connect(device.pool().name())
            .map_err(|source| ChannelError::Connect {
                pool: device.pool().name().to_owned(),
                source,
            })?;
        let image = conn
            .open_image(device.image_name())
            .map_err(|source| ChannelError::OpenImage {
                image: device.image_name().to_owned(),
                source,
            })?;

        let shared = Arc::new(completion::ChannelShared::default());
        let poller = completion::register_poller(Arc::clone(&shared), Arc::clone(&sink));

        crate::metrics::GLOBAL_STORAGE
            .channels_created
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        debug!(device = %device.name(), "channel created");

        Ok(IoChannel {
            device,
            conn: Some(conn),
            image: Some(image),
            shared,
            sink,
            poller: Some(poller),
        })
    }

    /// Explicit teardown: flush and close the image if one was opened, shut
    /// down the connection if established, deregister the drain poller, in
    /// that order. The poller performs one final drain before exiting, so
    /// completions queued at teardown time are still delivered.
    pub fn shutdown(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.image.is_none() && self.conn.is_none() && self.poller.is_none() {
            // already torn down via `shutdown`; drop has nothing left to do
            return;
        }
        debug!(device = %self.device.name(), "channel teardown start");
        scopeguard::defer_on_success! { debug!("channel teardown end") };
        scopeguard::defer_on_unwind! { tracing::error!("channel teardown panic") };

        if let Some(image) = self.image.take() {
            if let Err(error) = image.flush() {
                warn!(%error, "image flush failed during teardown");
            }
            drop(image);
        }
        if let Some(conn) = self.conn.take() {
            drop(conn);
        }
        if let Some(poller) = self.poller.take() {
            poller.deregister();
            crate::metrics::GLOBAL_STORAGE
                .channels_destroyed
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    }
}

impl<B: Backend> Drop for IoChannel<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}
