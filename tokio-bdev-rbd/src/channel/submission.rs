//! The submission path: populate the request, issue the native async call,
//! classify immediate failure.

use std::io;
use std::sync::Arc;

use tracing::trace;

use crate::backend::{Backend, Image, RejectedAio};
use crate::channel::{completion::Completion, IoChannel};
use crate::request::{Direction, IoResources, Request};

/// A write request the channel refuses before any backend call is attempted:
/// the channel does not assemble scattered buffers into one contiguous
/// transfer.
#[derive(Debug, thiserror::Error)]
pub enum UnsupportedRequest {
    #[error("write with {0} buffer segments is not supported")]
    MultiSegmentWrite(usize),
    #[error("write segment is {got} bytes but the request is {want} bytes")]
    SegmentLengthMismatch { got: usize, want: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Unsupported(#[from] UnsupportedRequest),
    #[error("backend rejected submission")]
    Backend(#[source] io::Error),
}

/// Synchronous submission failure. Delivered immediately to the caller,
/// bypassing the completion queue entirely, so it is distinguishable from a
/// failure that occurs after successful submission (which arrives through
/// the drain as [`crate::IoStatus::Failed`]). The request and its buffers
/// come back for the framework to reclaim.
#[derive(Debug)]
pub struct FailedSubmission {
    pub request: Request,
    pub resources: IoResources,
    pub error: SubmissionError,
}

impl<B: Backend> IoChannel<B> {
    /// Issue an async read of `len` bytes at `offset` into `buf`
    /// (`buf.len()` must equal `len`).
    pub fn read(
        &self,
        mut request: Request,
        buf: Vec<u8>,
        len: usize,
        offset: u64,
    ) -> Result<(), FailedSubmission> {
        debug_assert_eq!(buf.len(), len);
        request.prepare(Direction::Read, len);
        self.start_aio(request, buf, offset)
    }

    /// Issue an async write of `len` bytes at `offset` from `segments`.
    ///
    /// Rejected immediately, with no backend call attempted, unless there
    /// is exactly one segment and its length equals `len`.
    pub fn writev(
        &self,
        mut request: Request,
        mut segments: Vec<Vec<u8>>,
        len: usize,
        offset: u64,
    ) -> Result<(), FailedSubmission> {
        if segments.len() != 1 {
            return Err(FailedSubmission {
                request,
                error: SubmissionError::Unsupported(UnsupportedRequest::MultiSegmentWrite(
                    segments.len(),
                )),
                resources: IoResources::Write(segments),
            });
        }
        if segments[0].len() != len {
            let got = segments[0].len();
            return Err(FailedSubmission {
                request,
                error: SubmissionError::Unsupported(UnsupportedRequest::SegmentLengthMismatch {
                    got,
                    want: len,
                }),
                resources: IoResources::Write(segments),
            });
        }
        let buf = match segments.pop() {
            Some(buf) => buf,
            None => unreachable!("segment count checked above"),
        };
        request.prepare(Direction::Write, len);
        self.start_aio(request, buf, offset)
    }

    /// Create the completion handle bound to the request and the channel's
    /// queue, then issue the backend call. A backend rejection releases the
    /// handle and reports failure synchronously.
    fn start_aio(&self, request: Request, buf: Vec<u8>, offset: u64) -> Result<(), FailedSubmission> {
        let direction = match request.direction() {
            Some(d) => d,
            None => unreachable!("request was prepared by the caller"),
        };
        trace!(
            user_data = request.user_data(),
            ?direction,
            offset,
            len = buf.len(),
            "submitting"
        );

        let image = self
            .image
            .as_ref()
            .expect("image handle is live until teardown");
        let completion = Completion::new(request, Arc::clone(&self.shared));
        let res = match direction {
            Direction::Read => image.aio_read(offset, buf, completion),
            Direction::Write => image.aio_write(offset, buf, completion),
        };
        match res {
            Ok(()) => Ok(()),
            Err(RejectedAio {
                completion,
                buf,
                error,
            }) => {
                let request = completion.into_request();
                let resources = match direction {
                    Direction::Read => IoResources::Read(buf),
                    Direction::Write => IoResources::Write(vec![buf]),
                };
                Err(FailedSubmission {
                    request,
                    resources,
                    error: SubmissionError::Backend(error),
                })
            }
        }
    }
}
