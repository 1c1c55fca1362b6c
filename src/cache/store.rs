//! Shared, byte-bounded LRU store for decoded tiles.
//!
//! # Size-Based Eviction
//!
//! The cache tracks the accounted size of every resident tile and evicts
//! least-recently-used entries until an incoming tile fits. Recency is
//! updated on every hit and every insertion. A tile larger than the whole
//! capacity is never admitted; the caller still receives its entry, and the
//! first such rejection per cache is logged.
//!
//! # Sharing
//!
//! [`TileCache`] is a cheap handle: cloning takes another reference to the
//! same store and dropping releases it. Bindings hold references too, so a
//! store lives until the application and every binding pointing at it have
//! let go.

use std::sync::Arc;

use bytes::Bytes;
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, trace, warn};

use super::entry::CacheEntry;
use super::key::TileKey;

/// Default cache capacity: 32MB
///
/// Large enough that a handful of decoded 256x256 or 512x512 RGBA tiles per
/// slide fit comfortably.
pub const DEFAULT_CACHE_CAPACITY: usize = 32 * 1024 * 1024;

// =============================================================================
// Statistics
// =============================================================================

/// Point-in-time snapshot of a cache's bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Capacity in bytes
    pub capacity: usize,

    /// Sum of the accounted sizes of resident tiles
    pub resident_bytes: usize,

    /// Number of resident tiles
    pub entries: usize,

    /// Lookups that found a resident tile
    pub hits: u64,

    /// Lookups that found nothing
    pub misses: u64,

    /// Tiles admitted into the cache
    pub insertions: u64,

    /// Tiles evicted to make room or to honour a smaller capacity
    pub evictions: u64,

    /// Tiles refused because they were larger than the capacity
    pub rejections: u64,

    /// Binding tags handed out so far
    pub bindings_issued: u64,
}

// =============================================================================
// Cache State
// =============================================================================

struct CacheState {
    /// Resident tiles, most- to least-recently used
    entries: LruCache<TileKey, CacheEntry>,

    capacity: usize,

    total_size: usize,

    /// Next binding tag to hand out; tags are never reused
    next_tag: u64,

    /// Whether the oversized-tile advisory has been logged
    warned_oversized: bool,

    hits: u64,
    misses: u64,
    insertions: u64,
    evictions: u64,
    rejections: u64,
}

impl CacheState {
    /// Evict least-recently-used tiles until `incoming` more bytes fit.
    ///
    /// A sum that would overflow counts as not fitting, so an absurd claimed
    /// size only ever empties the cache rather than wrapping the total.
    ///
    /// Evicted entries are moved into `evicted` so the caller can drop them
    /// once the lock is released; a tile's buffer may carry an owner whose
    /// destructor calls back into the cache.
    fn evict_to_fit(&mut self, incoming: usize, evicted: &mut Vec<CacheEntry>) {
        loop {
            let fits = self
                .total_size
                .checked_add(incoming)
                .is_some_and(|needed| needed <= self.capacity);
            if fits {
                return;
            }

            let Some((key, entry)) = self.entries.pop_lru() else {
                return;
            };

            trace!(
                "Evicting tile plane={} x={} y={} tag={} ({} bytes)",
                key.plane.get(),
                key.x,
                key.y,
                key.binding_tag,
                entry.size()
            );

            self.total_size -= entry.size();
            self.evictions += 1;
            evicted.push(entry);
        }
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            capacity: self.capacity,
            resident_bytes: self.total_size,
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            insertions: self.insertions,
            evictions: self.evictions,
            rejections: self.rejections,
            bindings_issued: self.next_tag,
        }
    }
}

// =============================================================================
// Tile Cache
// =============================================================================

/// Shared LRU cache for decoded tiles with a byte capacity.
///
/// Slide handles do not use this type directly for lookups; they go through
/// a [`CacheBinding`](super::CacheBinding), which adds the tag that keeps
/// their coordinates apart from every other binding on the same cache.
///
/// # Thread Safety
///
/// All bookkeeping happens under a single mutex that is held only while the
/// index is updated. Handles can be cloned and sent across threads freely.
///
/// # Example
///
/// ```
/// use wsi_tilecache::{CacheBinding, PlaneId, TileCache};
/// use bytes::Bytes;
///
/// // One 64MB budget shared by two slides
/// let cache = TileCache::new(64 * 1024 * 1024);
/// let slide_a = CacheBinding::bound_to(&cache);
/// let slide_b = CacheBinding::bound_to(&cache);
///
/// let level0 = PlaneId::new(0);
/// let entry = slide_a.put(level0, 1, 2, Bytes::from(vec![0u8; 1024]), 1024);
/// assert_eq!(entry.data().len(), 1024);
///
/// assert!(slide_a.get(level0, 1, 2).is_some());
/// assert!(slide_b.get(level0, 1, 2).is_none());
/// assert_eq!(cache.resident_bytes(), 1024);
/// ```
#[derive(Clone)]
pub struct TileCache {
    state: Arc<Mutex<CacheState>>,
}

impl TileCache {
    /// Create a new cache with the specified capacity in bytes.
    ///
    /// A capacity of zero is allowed; such a cache admits nothing but an
    /// empty tile.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState {
                entries: LruCache::unbounded(),
                capacity,
                total_size: 0,
                next_tag: 0,
                warned_oversized: false,
                hits: 0,
                misses: 0,
                insertions: 0,
                evictions: 0,
                rejections: 0,
            })),
        }
    }

    /// Create a new cache with the default capacity (32MB).
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }

    /// Get the capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.state.lock().capacity
    }

    /// Change the capacity, evicting immediately until resident tiles fit.
    pub fn set_capacity(&self, capacity: usize) {
        let mut evicted = Vec::new();
        {
            let mut state = self.state.lock();
            debug!(
                "Changing tile cache capacity from {} to {} bytes",
                state.capacity, capacity
            );
            state.capacity = capacity;
            state.evict_to_fit(0, &mut evicted);
        }
        drop(evicted);
    }

    /// Release this reference to the cache.
    ///
    /// The cache itself is destroyed once every handle and every binding
    /// pointing at it is gone. Entries callers still hold stay valid.
    pub fn release(self) {
        drop(self);
    }

    /// Get the number of live references: application handles plus bindings.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.state)
    }

    /// Check whether two handles refer to the same cache.
    pub fn ptr_eq(&self, other: &TileCache) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// Get the current total accounted size of resident tiles in bytes.
    pub fn resident_bytes(&self) -> usize {
        self.state.lock().total_size
    }

    /// Get the number of resident tiles.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Drop every resident tile.
    ///
    /// Only the cache's references are released; tiles callers still hold
    /// remain readable.
    pub fn clear(&self) {
        let cleared = {
            let mut state = self.state.lock();
            state.total_size = 0;
            std::mem::replace(&mut state.entries, LruCache::unbounded())
        };
        drop(cleared);
    }

    /// Take a snapshot of the cache's counters.
    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats()
    }

    /// Hand out the next binding tag.
    pub(crate) fn allocate_tag(&self) -> u64 {
        let mut state = self.state.lock();
        let tag = state.next_tag;
        state.next_tag += 1;
        tag
    }

    /// Look up a tile, marking it most recently used on a hit.
    pub(crate) fn lookup(&self, key: &TileKey) -> Option<CacheEntry> {
        let mut state = self.state.lock();
        let found = state.entries.get(key).cloned();
        match found {
            Some(entry) => {
                state.hits += 1;
                Some(entry)
            }
            None => {
                state.misses += 1;
                None
            }
        }
    }

    /// Check whether a tile is resident without touching its recency.
    pub(crate) fn contains(&self, key: &TileKey) -> bool {
        self.state.lock().entries.contains(key)
    }

    /// Admit a decoded tile, returning the caller's reference to it.
    ///
    /// The entry is returned even when the tile is too large to be cached.
    /// A tile already resident under the same key is replaced.
    pub(crate) fn insert(&self, key: TileKey, data: Bytes, size: usize) -> CacheEntry {
        let entry = CacheEntry::new(data, size);
        let mut released = Vec::new();

        let mut state = self.state.lock();

        if size > state.capacity {
            state.rejections += 1;
            if !state.warned_oversized {
                state.warned_oversized = true;
                warn!(
                    "Tile of {} bytes exceeds tile cache capacity of {} bytes; not caching \
                     (further oversized tiles will not be reported)",
                    size, state.capacity
                );
            }
            return entry;
        }

        let previous = state.entries.pop(&key);
        if let Some(previous) = previous {
            state.total_size -= previous.size();
            released.push(previous);
        }

        state.evict_to_fit(size, &mut released);

        state.entries.push(key, entry.clone());
        state.total_size += size;
        state.insertions += 1;

        // Buffers of replaced or evicted tiles are freed outside the lock
        drop(state);
        drop(released);

        entry
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl std::fmt::Debug for TileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TileCache")
            .field("capacity", &state.capacity)
            .field("resident_bytes", &state.total_size)
            .field("entries", &state.entries.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
