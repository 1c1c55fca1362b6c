//! Decoded tile cache.
//!
//! Decoding a tile (JPEG, JPEG 2000, raw blocks, ...) is expensive, and a
//! viewer panning around a slide asks for the same tiles again and again.
//! This module provides the cache every format backend shares.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐ ┌──────────────┐ ┌──────────────┐
//! │ Slide A      │ │ Slide B      │ │ Slide C      │
//! │ CacheBinding │ │ CacheBinding │ │ CacheBinding │
//! │ (tag 0)      │ │ (tag 1)      │ │ (tag 0)      │
//! └──────┬───────┘ └──────┬───────┘ └──────┬───────┘
//!        │                │                │
//!        ▼                ▼                ▼
//! ┌─────────────────────────────┐ ┌──────────────┐
//! │ TileCache (shared budget)   │ │ TileCache    │
//! │ LRU of TileKey → CacheEntry │ │ (private)    │
//! └─────────────────────────────┘ └──────────────┘
//! ```
//!
//! # Components
//!
//! - [`TileCache`]: byte-bounded LRU store, shared by reference counting
//! - [`CacheBinding`]: a slide's handle onto a cache; can be rebound at run time
//! - [`CacheEntry`]: reference-counted decoded tile that can outlive eviction
//! - [`TileKey`] / [`PlaneId`]: identification of a tile within a cache
//!
//! # Usage
//!
//! A format backend about to decode a tile first asks its binding. On a
//! miss it decodes the tile itself, stores it, and draws from the entry it
//! gets back:
//!
//! ```
//! use wsi_tilecache::{CacheBinding, PlaneId};
//! use bytes::Bytes;
//!
//! let binding = CacheBinding::new();
//! let level = PlaneId::new(0);
//!
//! let entry = match binding.get(level, 4, 7) {
//!     Some(entry) => entry,
//!     None => {
//!         let pixels = Bytes::from(vec![0u8; 256 * 256 * 4]);
//!         let size = pixels.len();
//!         binding.put(level, 4, 7, pixels, size)
//!     }
//! };
//!
//! assert_eq!(entry.data().len(), 256 * 256 * 4);
//! entry.unref();
//! ```

mod binding;
mod entry;
mod key;
mod store;

pub use binding::{CacheBinding, CachedTile};
pub use entry::CacheEntry;
pub use key::{PlaneId, TileKey};
pub use store::{CacheStats, TileCache, DEFAULT_CACHE_CAPACITY};
