use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of [`WriterStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStatsSnapshot {
    pub records_written: u64,
    pub bytes_written: u64,
    pub write_failures: u64,
    pub retries: u64,
    pub dropped_on_write: u64,
    pub dropped_on_serialize: u64,
}

/// Delivery counters for one route.
#[derive(Debug, Clone, Default)]
pub struct WriterStats {
    records_written: Arc<AtomicU64>,
    bytes_written: Arc<AtomicU64>,
    write_failures: Arc<AtomicU64>,
    retries: Arc<AtomicU64>,
    dropped_on_write: Arc<AtomicU64>,
    dropped_on_serialize: Arc<AtomicU64>,
}

impl WriterStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_written(&self, bytes: usize) {
        self.records_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped_on_write(&self) {
        self.dropped_on_write.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped_on_serialize(&self) {
        self.dropped_on_serialize.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> WriterStatsSnapshot {
        WriterStatsSnapshot {
            records_written: self.records_written.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            dropped_on_write: self.dropped_on_write.load(Ordering::Relaxed),
            dropped_on_serialize: self.dropped_on_serialize.load(Ordering::Relaxed),
        }
    }
}
