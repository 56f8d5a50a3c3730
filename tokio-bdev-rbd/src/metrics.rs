use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time snapshot of the global counters.
#[non_exhaustive]
pub struct Metrics {
    pub channels_created: u64,
    pub channels_destroyed: u64,
    pub completions_delivered: u64,
}

pub(crate) struct MetricsStorage {
    pub(crate) channels_created: AtomicU64,
    pub(crate) channels_destroyed: AtomicU64,
    pub(crate) completions_delivered: AtomicU64,
}

impl MetricsStorage {
    pub(crate) const fn new_const() -> Self {
        MetricsStorage {
            channels_created: AtomicU64::new(0),
            channels_destroyed: AtomicU64::new(0),
            completions_delivered: AtomicU64::new(0),
        }
    }

    fn make_pub(&self) -> Metrics {
        Metrics {
            channels_created: self.channels_created.load(Ordering::Relaxed),
            channels_destroyed: self.channels_destroyed.load(Ordering::Relaxed),
            completions_delivered: self.completions_delivered.load(Ordering::Relaxed),
        }
    }
}

pub(crate) static GLOBAL_STORAGE: MetricsStorage = MetricsStorage::new_const();

pub fn global() -> Metrics {
    GLOBAL_STORAGE.make_pub()
}
