//! Concurrent stress run against a shared, repeatedly swapped cache.
//!
//! The run mirrors how an application uses the cache in production: several
//! slide handles share one budget, reader workers fetch tiles through the
//! read-through path as a viewer would, and a separate task keeps replacing
//! the shared cache with a fresh one (alternating between two capacities)
//! and rebinding every slide to it. Each synthetic tile carries a
//! fingerprint of its slide, level and coordinates, so a reader that is ever
//! handed another slide's tile, or a torn tile, is counted as a mismatch.

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use serde::Serialize;
use tracing::{info, trace};

use crate::cache::{CacheBinding, CacheStats, PlaneId, TileCache};
use crate::config::StressConfig;
use crate::error::StressError;

/// Summary of a stress run.
#[derive(Debug, Clone, Serialize)]
pub struct StressReport {
    /// Total tile reads across all readers
    pub reads: u64,

    /// Reads served from the cache
    pub hits: u64,

    /// Reads that had to decode
    pub misses: u64,

    /// Tiles whose content did not match the requested coordinates
    pub mismatches: u64,

    /// Number of times the shared cache was replaced
    pub swaps: u64,

    /// Wall-clock duration of the run in milliseconds
    pub elapsed_ms: u64,

    /// Counters of the cache the slides ended up on
    pub final_cache: CacheStats,
}

impl StressReport {
    /// Fraction of reads served from the cache.
    pub fn hit_ratio(&self) -> f64 {
        if self.reads == 0 {
            0.0
        } else {
            self.hits as f64 / self.reads as f64
        }
    }
}

#[derive(Debug, Default)]
struct ReaderTally {
    reads: u64,
    hits: u64,
    misses: u64,
    mismatches: u64,
}

/// Mix a counter into a well-distributed 64-bit value.
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Fingerprint identifying one tile of one slide.
///
/// Each component is folded in through its own round of mixing, so no
/// coordinate range can spill into another component's bits.
fn fingerprint(slide: usize, level: usize, x: i64, y: i64) -> u64 {
    [level as u64, x as u64, y as u64]
        .into_iter()
        .fold(mix(slide as u64), |acc, part| mix(acc ^ part))
}

/// Build a synthetic decoded tile filled with its fingerprint.
fn synthesize_tile(fingerprint: u64, len: usize) -> Bytes {
    let pattern = fingerprint.to_le_bytes();
    let data: Vec<u8> = pattern.iter().copied().cycle().take(len).collect();
    Bytes::from(data)
}

/// Check the head and tail of a tile against its expected fingerprint.
fn tile_matches(data: &[u8], fingerprint: u64, len: usize) -> bool {
    if data.len() != len {
        return false;
    }
    let pattern = fingerprint.to_le_bytes();
    let head = data.iter().take(8).zip(pattern.iter()).all(|(a, b)| a == b);
    let tail = data
        .last()
        .map_or(true, |&last| last == pattern[(len - 1) % pattern.len()]);
    head && tail
}

fn run_reader(
    reader: usize,
    slides: Arc<Vec<CacheBinding>>,
    config: StressConfig,
) -> ReaderTally {
    let mut tally = ReaderTally::default();
    let tile_bytes = config.tile_bytes();
    let grid = config.grid as u64;

    for n in 0..config.reads {
        let r = mix(((reader as u64) << 32) | n as u64);
        let slide = (r % slides.len() as u64) as usize;
        let level = ((r >> 8) % config.levels as u64) as usize;
        // Bias towards a small neighbourhood so that tiles get re-requested
        let x = ((r >> 16) % grid) as i64;
        let y = ((r >> 32) % grid.min(4)) as i64;

        let expected = fingerprint(slide, level, x, y);
        let tile = slides[slide].get_or_decode(PlaneId::from(level), x, y, || {
            Ok::<_, Infallible>(synthesize_tile(expected, tile_bytes))
        });
        let tile = match tile {
            Ok(tile) => tile,
            Err(never) => match never {},
        };

        tally.reads += 1;
        if tile.cache_hit {
            tally.hits += 1;
        } else {
            tally.misses += 1;
        }
        if !tile_matches(tile.entry.data(), expected, tile_bytes) {
            tally.mismatches += 1;
        }
        tile.entry.unref();
    }

    tally
}

/// Run the stress scenario described by `config`.
pub async fn run_stress(config: &StressConfig) -> Result<StressReport, StressError> {
    config.validate().map_err(StressError::InvalidParameters)?;

    info!(
        "Stress run: {} slides x {} levels, {} readers x {} reads, {} byte tiles",
        config.slides,
        config.levels,
        config.readers,
        config.reads,
        config.tile_bytes()
    );

    let started = Instant::now();

    let shared = TileCache::new(config.capacity);
    let slides: Arc<Vec<CacheBinding>> = Arc::new(
        (0..config.slides)
            .map(|_| CacheBinding::bound_to(&shared))
            .collect(),
    );
    // From here on the slides own the only references
    shared.release();

    let done = Arc::new(AtomicBool::new(false));

    let swapper = (config.swap_interval_ms > 0).then(|| {
        let slides = Arc::clone(&slides);
        let done = Arc::clone(&done);
        let interval = Duration::from_millis(config.swap_interval_ms);
        let capacities = [config.swap_capacity, config.capacity];

        tokio::spawn(async move {
            let mut swaps = 0u64;
            while !done.load(Ordering::Acquire) {
                tokio::time::sleep(interval).await;

                let capacity = capacities[(swaps % 2) as usize];
                let next = TileCache::new(capacity);
                for slide in slides.iter() {
                    slide.set_cache(&next);
                }
                swaps += 1;
                trace!("Swapped in cache #{} ({} bytes)", swaps, capacity);
            }
            swaps
        })
    });

    let readers: Vec<_> = (0..config.readers)
        .map(|reader| {
            let slides = Arc::clone(&slides);
            let config = config.clone();
            tokio::task::spawn_blocking(move || run_reader(reader, slides, config))
        })
        .collect();

    let mut total = ReaderTally::default();
    let mut failure = None;
    for handle in readers {
        match handle.await {
            Ok(tally) => {
                total.reads += tally.reads;
                total.hits += tally.hits;
                total.misses += tally.misses;
                total.mismatches += tally.mismatches;
            }
            Err(e) => failure = Some(e),
        }
    }

    done.store(true, Ordering::Release);
    let swaps = match swapper {
        Some(handle) => handle.await?,
        None => 0,
    };

    if let Some(e) = failure {
        return Err(StressError::Worker(e));
    }

    let final_cache = slides[0].cache().stats();
    let report = StressReport {
        reads: total.reads,
        hits: total.hits,
        misses: total.misses,
        mismatches: total.mismatches,
        swaps,
        elapsed_ms: started.elapsed().as_millis() as u64,
        final_cache,
    };

    info!(
        "Stress run finished: {} reads, {:.1}% hits, {} swaps, {} mismatches in {}ms",
        report.reads,
        report.hit_ratio() * 100.0,
        report.swaps,
        report.mismatches,
        report.elapsed_ms
    );

    Ok(report)
}
