//! Sequential LRU replay.
//!
//! Inserts `tiles` distinct tiles of `tile_size` bytes into a fresh cache of
//! `capacity` bytes and reports which of them are still resident. Useful for
//! sanity-checking a capacity setting against a backend's tile size.

use bytes::Bytes;
use serde::Serialize;

use crate::cache::{CacheBinding, CacheStats, PlaneId};
use crate::config::SimulateConfig;

/// Outcome of a sequential replay.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Cache capacity in bytes
    pub capacity: usize,

    /// Size of every inserted tile in bytes
    pub tile_size: usize,

    /// Number of tiles inserted
    pub inserted: usize,

    /// Column indices of the tiles still resident, in insertion order
    pub resident: Vec<usize>,

    /// Column indices of the tiles no longer resident, in insertion order
    pub evicted: Vec<usize>,

    /// Final cache counters
    pub stats: CacheStats,
}

/// Replay the inserts described by `config`.
pub fn simulate(config: &SimulateConfig) -> SimulationReport {
    let binding = CacheBinding::with_capacity(config.capacity);
    let plane = PlaneId::new(0);

    // Only the accounted size drives eviction; no pixels are allocated
    for x in 0..config.tiles {
        binding
            .put(plane, x as i64, 0, Bytes::new(), config.tile_size)
            .unref();
    }

    let (resident, evicted): (Vec<usize>, Vec<usize>) =
        (0..config.tiles).partition(|&x| binding.contains(plane, x as i64, 0));

    SimulationReport {
        capacity: config.capacity,
        tile_size: config.tile_size,
        inserted: config.tiles,
        resident,
        evicted,
        stats: binding.cache().stats(),
    }
}
