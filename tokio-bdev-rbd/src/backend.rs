//! The backend image library as an opaque capability set.
//!
//! The real library delivers completions via callback from its own internal
//! thread(s). That contract is expressed here by the [`Completion`] handle:
//! the channel's submission path creates one bound to the request and the
//! channel's completed queue, and the backend must invoke
//! [`Completion::complete`] exactly once per accepted operation, from
//! whichever thread it likes. The drain poller then redelivers on the
//! channel's owning execution context.
//!
//! Connection and image handles are never shared across channels; each
//! channel owns its own (see [`crate::channel::IoChannel`]).

use std::io;

pub use crate::channel::completion::Completion;

/// Registration-time image metadata, from [`Image::stat`].
#[derive(Debug, Clone, Copy)]
pub struct ImageInfo {
    /// Total image size in bytes.
    pub size_bytes: u64,
}

/// Returned by [`Image::aio_read`]/[`Image::aio_write`] when the backend
/// refuses to take over the operation. The completion handle and the buffer
/// travel back so the caller can release them and fail the request
/// synchronously, bypassing the completion queue.
#[derive(Debug)]
pub struct RejectedAio {
    pub completion: Completion,
    pub buf: Vec<u8>,
    pub error: io::Error,
}

/// Entry point to the backend: connects to named pools.
pub trait Backend: Send + Sync + 'static {
    type Connection: Connection;

    /// Establish a connection plus addressing context for one pool.
    fn connect(&self, pool_name: &str) -> io::Result<Self::Connection>;
}

/// A live connection to one pool. Dropping it shuts the connection down.
pub trait Connection: Send + 'static {
    type Image: Image;

    fn open_image(&self, image_name: &str) -> io::Result<Self::Image>;
}

/// An open image handle. Dropping it closes the image.
pub trait Image: Send + 'static {
    fn stat(&self) -> io::Result<ImageInfo>;

    /// Flush buffered writes; called before close during channel teardown.
    fn flush(&self) -> io::Result<()>;

    /// Read `buf.len()` bytes at `offset` into `buf`.
    ///
    /// On `Ok(())` the backend owns `buf` and the handle until it calls
    /// [`Completion::complete`] with the result code (bytes transferred, or a
    /// negative errno). On `Err` nothing was submitted and both come back.
    fn aio_read(&self, offset: u64, buf: Vec<u8>, completion: Completion)
        -> Result<(), RejectedAio>;

    /// Write `buf` at `offset`. Result code contract: 0 on success, negative
    /// errno on failure.
    fn aio_write(
        &self,
        offset: u64,
        buf: Vec<u8>,
        completion: Completion,
    ) -> Result<(), RejectedAio>;
}

pub(crate) type ConnectionOf<B> = <B as Backend>::Connection;
pub(crate) type ImageOf<B> = <<B as Backend>::Connection as Connection>::Image;
