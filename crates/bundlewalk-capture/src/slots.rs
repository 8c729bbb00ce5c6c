//! Non-blocking worker admission for nested directory handling.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Semaphore, SemaphorePermit};

/// Fixed-capacity pool of worker slots with try-acquire semantics only.
///
/// There is no blocking acquire. A caller that finds the pool full must handle
/// its subdirectory on its own thread; slot holders wait on their children.
#[derive(Debug)]
pub struct WorkerSlots {
    capacity: usize,
    permits: Semaphore,
    peak: AtomicUsize,
}

impl WorkerSlots {
    /// Create a pool with `capacity` slots. A capacity of 0 never admits a worker.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            permits: Semaphore::new(capacity),
            peak: AtomicUsize::new(0),
        }
    }

    /// Take a slot if one is free right now.
    pub fn try_acquire(&self) -> Option<Slot<'_>> {
        let permit = self.permits.try_acquire().ok()?;
        self.peak.fetch_max(self.active(), Ordering::AcqRel);
        Some(Slot { _permit: permit })
    }

    /// Slots currently held.
    pub fn active(&self) -> usize {
        self.capacity - self.permits.available_permits()
    }

    /// Highest number of slots ever held at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }
}

/// A held worker slot, released on drop.
#[derive(Debug)]
pub struct Slot<'a> {
    _permit: SemaphorePermit<'a>,
}
