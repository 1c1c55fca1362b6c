//! # WSI Tile Cache
//!
//! A shared, byte-bounded cache for decoded Whole Slide Image tiles.
//!
//! Format backends decode tiles from JPEG, JPEG 2000, raw pixel blocks and
//! other codecs. Decoding is expensive, and a viewer panning and zooming
//! over a slide requests the same tiles constantly, so every backend keeps
//! decoded tiles in this cache.
//!
//! ## Features
//!
//! - **Byte-bounded LRU**: strict least-recently-used eviction against a
//!   capacity in bytes, adjustable at run time
//! - **Reference-counted entries**: tiles handed to a caller stay valid after
//!   eviction until the caller lets go
//! - **Rebindable slide handles**: each slide holds a [`CacheBinding`] that can
//!   be pointed at a shared [`TileCache`] at any time, so one memory budget
//!   can cover many open slides
//! - **Lock discipline**: one short-lived lock per cache and per binding,
//!   never nested, so concurrent readers and rebinds cannot deadlock
//!
//! ## Architecture
//!
//! - [`cache`] - Tile cache, bindings and entries
//! - [`diag`] - Stress and replay diagnostics used by the binary
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```
//! use wsi_tilecache::{CacheBinding, PlaneId, TileCache};
//! use bytes::Bytes;
//!
//! // Every slide starts on its own private cache
//! let slide = CacheBinding::new();
//! let level = PlaneId::new(0);
//!
//! let tile = slide
//!     .get_or_decode(level, 0, 0, || Ok::<_, std::io::Error>(Bytes::from(vec![0u8; 4096])))
//!     .unwrap();
//! assert!(!tile.cache_hit);
//!
//! // Later the application moves all slides onto one shared budget
//! let shared = TileCache::new(256 * 1024 * 1024);
//! slide.set_cache(&shared);
//! shared.release();
//!
//! // The tile decoded earlier is still readable
//! assert_eq!(tile.entry.data().len(), 4096);
//! ```

pub mod cache;
pub mod config;
pub mod diag;
pub mod error;

// Re-export commonly used types
pub use cache::{
    CacheBinding, CacheEntry, CacheStats, CachedTile, PlaneId, TileCache, TileKey,
    DEFAULT_CACHE_CAPACITY,
};
pub use config::{
    format_size, parse_size, Cli, Command, OutputFormat, SimulateConfig, StressConfig,
};
pub use diag::{run_stress, simulate, SimulationReport, StressReport};
pub use error::{SizeParseError, StressError};
