//! Per-operation request state.
//!
//! The framework allocates one [`Request`] per read or write and hands it to
//! the channel's submission path. The adapter populates direction, expected
//! length, and eventually the terminal status; the buffers travel inside the
//! request so the framework can fetch them back after delivery.

/// Data direction of one in-flight operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// Terminal status of a request, as reported upward by the drain poller.
///
/// `Pending` is the initial value; it is replaced by completion capture
/// before the request ever becomes visible to the drain side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoStatus {
    Pending,
    Success,
    Failed,
}

/// Buffers associated with a request, returned to the framework either via
/// [`Request::take_resources`] after delivery or inside a failed-submission
/// error.
#[derive(Debug)]
pub enum IoResources {
    Read(Vec<u8>),
    Write(Vec<Vec<u8>>),
}

/// One in-flight read or write.
///
/// Queue membership is tracked by the channel's completed list, not by an
/// intrusive link: a request is in at most one queue at a time and is removed
/// by the drain's atomic detach before being handed back.
#[derive(Debug)]
pub struct Request {
    user_data: u64,
    direction: Option<Direction>,
    expected_len: usize,
    status: IoStatus,
    resources: Option<IoResources>,
}

impl Request {
    /// `user_data` is the framework's correlation token; the adapter never
    /// interprets it.
    pub fn new(user_data: u64) -> Self {
        Request {
            user_data,
            direction: None,
            expected_len: 0,
            status: IoStatus::Pending,
            resources: None,
        }
    }

    pub fn user_data(&self) -> u64 {
        self.user_data
    }

    pub fn status(&self) -> IoStatus {
        self.status
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    pub fn expected_len(&self) -> usize {
        self.expected_len
    }

    /// Hand the buffers back to the framework after delivery.
    pub fn take_resources(&mut self) -> Option<IoResources> {
        self.resources.take()
    }

    pub(crate) fn prepare(&mut self, direction: Direction, expected_len: usize) {
        self.direction = Some(direction);
        self.expected_len = expected_len;
        self.status = IoStatus::Pending;
    }

    pub(crate) fn set_status(&mut self, status: IoStatus) {
        self.status = status;
    }

    pub(crate) fn put_back_buf(&mut self, buf: Vec<u8>) {
        let resources = match self.direction {
            Some(Direction::Read) => IoResources::Read(buf),
            Some(Direction::Write) => IoResources::Write(vec![buf]),
            None => unreachable!("direction is populated at submission"),
        };
        self.resources = Some(resources);
    }
}
