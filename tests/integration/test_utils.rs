//! Shared helpers for integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;

/// Create a zero-filled tile of the given size.
pub fn make_tile(size: usize) -> Bytes {
    Bytes::from(vec![0u8; size])
}

/// Create a tile filled with a single byte value.
pub fn filled_tile(value: u8, size: usize) -> Bytes {
    Bytes::from(vec![value; size])
}

/// Pixel buffer that counts how many times it has been freed.
struct TrackedBuffer {
    data: Vec<u8>,
    frees: Arc<AtomicUsize>,
}

impl AsRef<[u8]> for TrackedBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl Drop for TrackedBuffer {
    fn drop(&mut self) {
        self.frees.fetch_add(1, Ordering::SeqCst);
    }
}

/// Create a tile whose buffer reports when it is released.
///
/// Returns the tile and a counter of how many times its buffer was freed.
pub fn tracked_tile(size: usize) -> (Bytes, Arc<AtomicUsize>) {
    let frees = Arc::new(AtomicUsize::new(0));
    let buffer = TrackedBuffer {
        data: vec![0xAB; size],
        frees: Arc::clone(&frees),
    };
    (Bytes::from_owner(buffer), frees)
}

/// Read a free counter.
pub fn frees(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}
