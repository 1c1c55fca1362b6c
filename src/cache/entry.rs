//! Reference-counted cache entries.
//!
//! A [`CacheEntry`] is a handle to one decoded tile. The cache holds one
//! reference for as long as the tile is resident, and every caller that
//! receives an entry from `get` or `put` holds another. Eviction only drops
//! the cache's reference, so a caller can keep drawing from a tile long after
//! it has left the cache. The buffer is released when the last reference is
//! dropped.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

struct EntryData {
    data: Bytes,
    size: usize,
}

/// A reference-counted handle to one decoded tile.
///
/// Cloning takes another reference; dropping (or calling [`unref`]) releases
/// one. Reference counting is atomic, so handles can be released from any
/// thread without touching the cache lock.
///
/// [`unref`]: CacheEntry::unref
#[derive(Clone)]
pub struct CacheEntry {
    inner: Arc<EntryData>,
}

impl CacheEntry {
    /// Wrap decoded tile bytes.
    ///
    /// `size` is the number of bytes the tile is accounted for in the cache.
    /// It is normally `data.len()`, but format backends may report the size
    /// of the decoded pixel buffer they allocated.
    pub(crate) fn new(data: Bytes, size: usize) -> Self {
        Self {
            inner: Arc::new(EntryData { data, size }),
        }
    }

    /// Get the decoded tile bytes.
    pub fn data(&self) -> &Bytes {
        &self.inner.data
    }

    /// Get the accounted size of the tile in bytes.
    pub fn size(&self) -> usize {
        self.inner.size
    }

    /// Get the number of live references to this entry, including the
    /// cache's own reference while the tile is resident.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Release this reference.
    pub fn unref(self) {
        drop(self);
    }

    /// Check whether two handles refer to the same entry.
    pub fn ptr_eq(&self, other: &CacheEntry) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("size", &self.inner.size)
            .field("refs", &self.ref_count())
            .finish()
    }
}
