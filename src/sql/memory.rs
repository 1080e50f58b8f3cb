// src/sql/memory.rs

use std::sync::atomic::{AtomicUsize, Ordering};

/// Tracking allocator facade the runtime objects draw from. Allocations go
/// through the global allocator; the pool accounts for bytes handed out so
/// an execution context can report its footprint.
#[repr(C)]
#[derive(Debug, Default)]
pub struct MemoryPool {
    allocated: AtomicUsize,
    peak: AtomicUsize,
}

impl MemoryPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track_alloc(&self, bytes: usize) {
        let now = self.allocated.fetch_add(bytes, Ordering::Relaxed) + bytes;
        self.peak.fetch_max(now, Ordering::Relaxed);
    }

    pub fn track_free(&self, bytes: usize) {
        self.allocated.fetch_sub(bytes, Ordering::Relaxed);
    }

    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_allocations_and_peak() {
        let pool = MemoryPool::new();
        pool.track_alloc(100);
        pool.track_alloc(50);
        pool.track_free(100);
        assert_eq!(pool.allocated(), 50);
        assert_eq!(pool.peak(), 150);
    }
}
