//! In-memory reference backend.
//!
//! Serves two purposes: a RAM-backed stand-in for the real image library in
//! examples and integration-style tests, and an honest demonstration of the
//! completion contract: operations complete on a dedicated worker thread,
//! never on the submitting one, so the cross-thread capture path is always
//! exercised.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::backend::{Backend, Completion, Connection, Image, ImageInfo, RejectedAio};

type ImageStore = Arc<Mutex<Vec<u8>>>;
type ImageMap = Arc<Mutex<HashMap<(String, String), ImageStore>>>;

enum Job {
    Read {
        store: ImageStore,
        offset: u64,
        buf: Vec<u8>,
        completion: Completion,
    },
    Write {
        store: ImageStore,
        offset: u64,
        buf: Vec<u8>,
        completion: Completion,
    },
}

/// An in-memory [`Backend`]: named images in named pools, completions
/// delivered from a worker thread.
#[derive(Debug)]
pub struct MemBackend {
    images: ImageMap,
    jobs: mpsc::UnboundedSender<Job>,
}

impl MemBackend {
    pub fn new() -> Self {
        let (jobs, rx) = mpsc::unbounded_channel();
        std::thread::Builder::new()
            .name("mem-backend-worker".to_owned())
            .spawn(move || worker(rx))
            .expect("spawning the backend worker thread");
        MemBackend {
            images: Arc::new(Mutex::new(HashMap::new())),
            jobs,
        }
    }

    /// Create a zero-filled image of `size_bytes` in `pool`.
    pub fn create_image(&self, pool: &str, name: &str, size_bytes: u64) {
        let store = Arc::new(Mutex::new(vec![0u8; size_bytes as usize]));
        self.images
            .lock()
            .unwrap()
            .insert((pool.to_owned(), name.to_owned()), store);
    }
}

impl Default for MemBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MemBackend {
    type Connection = MemConnection;

    fn connect(&self, pool_name: &str) -> io::Result<MemConnection> {
        Ok(MemConnection {
            pool: pool_name.to_owned(),
            images: Arc::clone(&self.images),
            jobs: self.jobs.clone(),
        })
    }
}

pub struct MemConnection {
    pool: String,
    images: ImageMap,
    jobs: mpsc::UnboundedSender<Job>,
}

impl Connection for MemConnection {
    type Image = MemImage;

    fn open_image(&self, image_name: &str) -> io::Result<MemImage> {
        let images = self.images.lock().unwrap();
        let store = images
            .get(&(self.pool.clone(), image_name.to_owned()))
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no image {image_name:?} in pool {:?}", self.pool),
                )
            })?;
        Ok(MemImage {
            store: Arc::clone(store),
            jobs: self.jobs.clone(),
        })
    }
}

pub struct MemImage {
    store: ImageStore,
    jobs: mpsc::UnboundedSender<Job>,
}

impl MemImage {
    fn submit(
        &self,
        job: Job,
    ) -> Result<(), RejectedAio> {
        self.jobs.send(job).map_err(|send_err| {
            let (completion, buf) = match send_err.0 {
                Job::Read { buf, completion, .. } | Job::Write { buf, completion, .. } => {
                    (completion, buf)
                }
            };
            RejectedAio {
                completion,
                buf,
                error: io::Error::new(io::ErrorKind::BrokenPipe, "backend worker stopped"),
            }
        })
    }
}

impl Image for MemImage {
    fn stat(&self) -> io::Result<ImageInfo> {
        Ok(ImageInfo {
            size_bytes: self.store.lock().unwrap().len() as u64,
        })
    }

    fn flush(&self) -> io::Result<()> {
        Ok(())
    }

    fn aio_read(
        &self,
        offset: u64,
        buf: Vec<u8>,
        completion: Completion,
    ) -> Result<(), RejectedAio> {
        self.submit(Job::Read {
            store: Arc::clone(&self.store),
            offset,
            buf,
            completion,
        })
    }

    fn aio_write(
        &self,
        offset: u64,
        buf: Vec<u8>,
        completion: Completion,
    ) -> Result<(), RejectedAio> {
        self.submit(Job::Write {
            store: Arc::clone(&self.store),
            offset,
            buf,
            completion,
        })
    }
}

const EINVAL: i64 = 22;

fn worker(mut rx: mpsc::UnboundedReceiver<Job>) {
    while let Some(job) = rx.blocking_recv() {
        match job {
            Job::Read {
                store,
                offset,
                mut buf,
                completion,
            } => {
                let store = store.lock().unwrap();
                let offset = offset as usize;
                let result = if offset > store.len() {
                    -EINVAL
                } else {
                    // Reads past the end transfer fewer bytes than
                    // requested, which the channel classifies as a failure.
                    let n = buf.len().min(store.len() - offset);
                    buf[..n].copy_from_slice(&store[offset..offset + n]);
                    n as i64
                };
                drop(store);
                completion.complete(result, buf);
            }
            Job::Write {
                store,
                offset,
                buf,
                completion,
            } => {
                let mut store = store.lock().unwrap();
                let offset = offset as usize;
                let result = if offset + buf.len() > store.len() {
                    -EINVAL
                } else {
                    store[offset..offset + buf.len()].copy_from_slice(&buf);
                    0
                };
                drop(store);
                completion.complete(result, buf);
            }
        }
    }
}
