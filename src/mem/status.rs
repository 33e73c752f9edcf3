//! Bind buffer accounting
//!
//! Counters for the buffers owned by bind slots: bytes and buffers currently
//! held, totals ever handed out and a high-water mark. A statement that
//! re-prepares, resets or closes must bring `outstanding` back to where it was.

use std::sync::atomic::{AtomicI64, Ordering};

/// Point-in-time copy of a [`MemStatus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferStats {
    /// Bytes held by live buffers
    pub bytes: i64,
    /// Live buffers (slot payloads plus text length cells)
    pub outstanding: i64,
    /// Buffers ever allocated
    pub allocated: i64,
    /// Largest `bytes` value observed
    pub high_water: i64,
}

/// Bind buffer status counters
pub struct MemStatus {
    bytes: AtomicI64,
    outstanding: AtomicI64,
    allocated: AtomicI64,
    high_water: AtomicI64,
}

impl MemStatus {
    pub const fn new() -> Self {
        Self {
            bytes: AtomicI64::new(0),
            outstanding: AtomicI64::new(0),
            allocated: AtomicI64::new(0),
            high_water: AtomicI64::new(0),
        }
    }

    /// Record `buffers` new buffers totalling `size` bytes
    pub fn record_alloc(&self, buffers: usize, size: usize) {
        let size = size as i64;
        let buffers = buffers as i64;

        let bytes = self.bytes.fetch_add(size, Ordering::SeqCst) + size;
        self.outstanding.fetch_add(buffers, Ordering::SeqCst);
        self.allocated.fetch_add(buffers, Ordering::SeqCst);
        self.high_water.fetch_max(bytes, Ordering::SeqCst);
    }

    /// Record release of `buffers` buffers totalling `size` bytes
    pub fn record_free(&self, buffers: usize, size: usize) {
        self.bytes.fetch_sub(size as i64, Ordering::SeqCst);
        self.outstanding.fetch_sub(buffers as i64, Ordering::SeqCst);
    }

    /// Current counter values
    pub fn snapshot(&self) -> BufferStats {
        BufferStats {
            bytes: self.bytes.load(Ordering::SeqCst),
            outstanding: self.outstanding.load(Ordering::SeqCst),
            allocated: self.allocated.load(Ordering::SeqCst),
            high_water: self.high_water.load(Ordering::SeqCst),
        }
    }
}

impl Default for MemStatus {
    fn default() -> Self {
        Self::new()
    }
}
