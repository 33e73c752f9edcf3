//! Bind buffer memory accounting
//!
//! Bind slots report every buffer they allocate and release here. Counters are
//! kept per thread: a statement is confined to the thread that drives it, so
//! its buffers are always accounted (and released) on that thread.

pub mod status;

pub use status::{BufferStats, MemStatus};

thread_local! {
    static BIND_STATUS: MemStatus = const { MemStatus::new() };
}

/// Record `buffers` bind buffers totalling `size` bytes
pub(crate) fn record_alloc(buffers: usize, size: usize) {
    BIND_STATUS.with(|status| status.record_alloc(buffers, size));
}

/// Record release of `buffers` bind buffers totalling `size` bytes
pub(crate) fn record_free(buffers: usize, size: usize) {
    BIND_STATUS.with(|status| status.record_free(buffers, size));
}

/// Bind buffer counters for the current thread
pub fn bind_buffer_status() -> BufferStats {
    BIND_STATUS.with(MemStatus::snapshot)
}
