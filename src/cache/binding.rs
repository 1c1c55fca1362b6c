//! Per-slide bindings onto a shared tile cache.
//!
//! A [`CacheBinding`] is what a slide handle holds. It points at a
//! [`TileCache`] and carries a tag assigned by that cache, so coordinates
//! from different slides never collide even when they share one store. The
//! binding can be pointed at another cache at any time; entries already
//! handed out stay valid because they are reference counted on their own.
//!
//! # Locking
//!
//! Each binding has its own mutex guarding the `(cache, tag)` pair, held
//! only long enough to snapshot or swap it. Lookups and insertions take the
//! snapshot, release the binding lock, and then work under the cache's lock.
//! Rebinding allocates the new tag under the target cache's lock first and
//! only then swaps under the binding lock. The two locks are never held at
//! the same time, so any mix of lookups and rebinds across threads cannot
//! deadlock.

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::debug;

use super::entry::CacheEntry;
use super::key::{PlaneId, TileKey};
use super::store::TileCache;

/// Result of a read-through tile lookup.
#[derive(Debug, Clone)]
pub struct CachedTile {
    /// The caller's reference to the tile
    pub entry: CacheEntry,

    /// Whether the tile was served from the cache
    pub cache_hit: bool,
}

struct BindingState {
    cache: TileCache,
    tag: u64,
}

/// A slide handle's indirection to a (possibly shared) tile cache.
///
/// # Example
///
/// ```
/// use wsi_tilecache::{CacheBinding, PlaneId, TileCache};
/// use bytes::Bytes;
///
/// let binding = CacheBinding::new();
/// let plane = PlaneId::new(0);
///
/// let held = binding.put(plane, 0, 0, Bytes::from_static(b"tile"), 4);
///
/// // Move the slide onto a shared budget without closing it
/// let shared = TileCache::new(8 * 1024 * 1024);
/// binding.set_cache(&shared);
///
/// assert!(binding.get(plane, 0, 0).is_none());
/// assert_eq!(held.data().as_ref(), b"tile");
/// ```
pub struct CacheBinding {
    state: Mutex<BindingState>,
}

impl CacheBinding {
    /// Create a binding onto a fresh private cache with the default capacity.
    pub fn new() -> Self {
        Self::bound_to(&TileCache::with_default_capacity())
    }

    /// Create a binding onto a fresh private cache of the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::bound_to(&TileCache::new(capacity))
    }

    /// Create a binding onto an existing cache.
    pub fn bound_to(cache: &TileCache) -> Self {
        let tag = cache.allocate_tag();
        Self {
            state: Mutex::new(BindingState {
                cache: cache.clone(),
                tag,
            }),
        }
    }

    /// Point this binding at another cache.
    ///
    /// Tiles inserted through the old cache stay there (and are never visible
    /// through this binding again); entries callers already hold remain
    /// valid. The reference to the old cache is released, which destroys it
    /// if nothing else points at it.
    pub fn set_cache(&self, cache: &TileCache) {
        let tag = cache.allocate_tag();
        let incoming = BindingState {
            cache: cache.clone(),
            tag,
        };

        let previous = {
            let mut state = self.state.lock();
            std::mem::replace(&mut *state, incoming)
        };

        debug!(
            "Rebound tile cache binding: tag {} -> {}",
            previous.tag, tag
        );
    }

    /// Get a handle to the cache this binding currently points at.
    pub fn cache(&self) -> TileCache {
        self.state.lock().cache.clone()
    }

    /// Get the tag this binding currently uses in its cache.
    pub fn tag(&self) -> u64 {
        self.state.lock().tag
    }

    fn snapshot(&self) -> (TileCache, u64) {
        let state = self.state.lock();
        (state.cache.clone(), state.tag)
    }

    /// Look up a tile.
    ///
    /// On a hit the tile becomes the most recently used and the caller
    /// receives its own reference.
    pub fn get(&self, plane: PlaneId, x: i64, y: i64) -> Option<CacheEntry> {
        let (cache, tag) = self.snapshot();
        cache.lookup(&TileKey::new(tag, plane, x, y))
    }

    /// Check whether a tile is resident without marking it recently used.
    pub fn contains(&self, plane: PlaneId, x: i64, y: i64) -> bool {
        let (cache, tag) = self.snapshot();
        cache.contains(&TileKey::new(tag, plane, x, y))
    }

    /// Store a decoded tile, returning the caller's reference to it.
    ///
    /// `size` is the number of bytes the tile counts against the capacity.
    /// The returned entry is always usable; a tile larger than the capacity
    /// is simply not remembered.
    pub fn put(&self, plane: PlaneId, x: i64, y: i64, data: Bytes, size: usize) -> CacheEntry {
        let (cache, tag) = self.snapshot();
        cache.insert(TileKey::new(tag, plane, x, y), data, size)
    }

    /// Look up a tile, decoding and storing it on a miss.
    ///
    /// `decode` runs without any lock held. Its error is returned unchanged
    /// and nothing is cached for the tile.
    pub fn get_or_decode<E, F>(
        &self,
        plane: PlaneId,
        x: i64,
        y: i64,
        decode: F,
    ) -> Result<CachedTile, E>
    where
        F: FnOnce() -> Result<Bytes, E>,
    {
        if let Some(entry) = self.get(plane, x, y) {
            return Ok(CachedTile {
                entry,
                cache_hit: true,
            });
        }

        let data = decode()?;
        let size = data.len();
        Ok(CachedTile {
            entry: self.put(plane, x, y, data, size),
            cache_hit: false,
        })
    }
}

impl Default for CacheBinding {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CacheBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheBinding")
            .field("tag", &self.tag())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
