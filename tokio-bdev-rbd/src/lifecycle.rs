//! Adapter initialization and teardown.
//!
//! Initialization is strict all-or-nothing across the whole configuration
//! set: any failure aborts the pass and every pool and device built for
//! earlier entries is released with it. The pool and device registries are
//! owned by the adapter object (there is no process-global state), so the
//! rollback is structural: an `Err` means nothing was registered.

use std::io;
use std::sync::Arc;

use tracing::info;

use crate::backend::{Backend, Connection, Image};
use crate::channel::{ChannelError, CompletionSink, IoChannel};
use crate::config::{ConfigError, DeviceEntry};
use crate::device::{Device, PoolRegistry};

const PRODUCT_NAME: &str = "RBD image";

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("entry {index}: {source}")]
    Config {
        index: usize,
        #[source]
        source: ConfigError,
    },
    #[error("entry {index}: failed to connect to pool {pool:?}")]
    Connect {
        index: usize,
        pool: String,
        #[source]
        source: io::Error,
    },
    #[error("entry {index}: failed to open image {image:?}")]
    OpenImage {
        index: usize,
        image: String,
        #[source]
        source: io::Error,
    },
    #[error("entry {index}: failed to stat image {image:?}")]
    StatImage {
        index: usize,
        image: String,
        #[source]
        source: io::Error,
    },
}

/// The adapter: owns the backend handle, the pool registry, and the device
/// records. Channels are created on demand per execution context and have
/// their own lifecycle; adapter teardown does not touch them.
#[derive(Debug)]
pub struct RbdAdapter<B: Backend> {
    backend: Arc<B>,
    pools: PoolRegistry,
    devices: Vec<Arc<Device>>,
}

impl<B: Backend> RbdAdapter<B> {
    /// Process the configuration entries in order; see module docs for the
    /// all-or-nothing contract.
    ///
    /// Each entry is validated, its pool resolved or created, and the image
    /// probed over a transient connection (independent of any later
    /// channel's connection) to obtain its size.
    pub fn initialize(backend: B, entries: &[DeviceEntry]) -> Result<Self, InitError> {
        let backend = Arc::new(backend);
        let mut pools = PoolRegistry::new();
        let mut devices: Vec<Arc<Device>> = Vec::with_capacity(entries.len());

        for (index, entry) in entries.iter().enumerate() {
            let block_size = entry
                .validate()
                .map_err(|source| InitError::Config { index, source })?;
            let pool = pools.get_or_create(&entry.pool_name);

            // Transient probe: connect, open, stat, drop.
            let conn =
                backend
                    .connect(pool.name())
                    .map_err(|source| InitError::Connect {
                        index,
                        pool: pool.name().to_owned(),
                        source,
                    })?;
            let image =
                conn.open_image(&entry.image_name)
                    .map_err(|source| InitError::OpenImage {
                        index,
                        image: entry.image_name.clone(),
                        source,
                    })?;
            let info = image.stat().map_err(|source| InitError::StatImage {
                index,
                image: entry.image_name.clone(),
                source,
            })?;
            drop(image);
            drop(conn);

            let device = Arc::new(Device::new(
                format!("Rbd{index}"),
                PRODUCT_NAME,
                &entry.image_name,
                pool,
                block_size,
                info.size_bytes,
            ));
            info!(
                device = %device.name(),
                image = %device.image_name(),
                pool = %device.pool().name(),
                block_size = device.block_size(),
                block_count = device.block_count(),
                "registered device"
            );
            devices.push(device);
        }

        Ok(RbdAdapter {
            backend,
            pools,
            devices,
        })
    }

    pub fn devices(&self) -> &[Arc<Device>] {
        &self.devices
    }

    pub fn device(&self, name: &str) -> Option<&Arc<Device>> {
        self.devices.iter().find(|d| d.name() == name)
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Create an I/O channel for `device` on the calling execution context.
    /// The channel gets its own connection and image handle; `sink` receives
    /// the upward completions from its drain poller.
    pub fn create_channel(
        &self,
        device: &Arc<Device>,
        sink: Arc<dyn CompletionSink>,
    ) -> Result<IoChannel<B>, ChannelError> {
        IoChannel::create(&*self.backend, Arc::clone(device), sink)
    }

    /// Explicit teardown: releases every registered device and pool. I/O
    /// channels are owned by the framework's per-channel lifecycle and are
    /// not closed here.
    pub fn shutdown(self) {
        info!(devices = self.devices.len(), pools = self.pools.len(), "adapter teardown");
        drop(self);
    }
}
