use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide `LOGID` sequence.
///
/// One generator is created per process and shared, behind an `Arc`, by every
/// adapter so that sequence numbers are global rather than per route or per
/// container.
#[derive(Debug, Default)]
pub struct SequenceGenerator {
    current: AtomicU64,
}

impl SequenceGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generator whose next value is `value + 1`.
    pub fn starting_at(value: u64) -> Self {
        Self {
            current: AtomicU64::new(value),
        }
    }

    /// Advance by one and return the new value.
    pub fn next(&self) -> u64 {
        self.current.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Last value handed out, 0 if none.
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Relaxed)
    }
}
