//! Concurrency tests.
//!
//! Tests verify:
//! - Many readers against shared bindings while the cache is swapped out
//!   never deadlock, never see foreign tiles, and keep the budget
//! - Concurrent puts to one key leave exactly one resident entry
//! - Entries released concurrently from many threads are freed once
//! - The stress runner reports no mismatches with swapping enabled

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use bytes::Bytes;

use wsi_tilecache::{run_stress, CacheBinding, PlaneId, StressConfig, TileCache};

use super::test_utils::{frees, make_tile, tracked_tile};

/// Tile content identifying which slide and coordinates it was decoded for.
fn tile_for(slide: usize, x: i64, y: i64) -> Bytes {
    let mut data = vec![0u8; 64];
    data[0] = slide as u8;
    data[1] = x as u8;
    data[2] = y as u8;
    Bytes::from(data)
}

#[test]
fn test_readers_and_swapper_on_shared_cache() {
    let slides: Vec<CacheBinding> = {
        let shared = TileCache::new(2048);
        (0..3).map(|_| CacheBinding::bound_to(&shared)).collect()
    };
    let done = AtomicBool::new(false);

    thread::scope(|s| {
        let readers: Vec<_> = (0..6)
            .map(|reader| {
                let slides = &slides;
                s.spawn(move || {
                    for n in 0..2000i64 {
                        let slide = (reader + n as usize) % slides.len();
                        let x = n % 8;
                        let y = (n / 8) % 4;
                        let plane = PlaneId::new((n % 2) as u64);

                        let tile = slides[slide]
                            .get_or_decode(plane, x, y, || {
                                Ok::<_, String>(tile_for(slide, x, y))
                            })
                            .unwrap();

                        let data = tile.entry.data();
                        assert_eq!(data[0], slide as u8);
                        assert_eq!(data[1], x as u8);
                        assert_eq!(data[2], y as u8);
                        tile.entry.unref();
                    }
                })
            })
            .collect();

        let swapper = s.spawn(|| {
            let mut swaps = 0usize;
            loop {
                let next = TileCache::new(if swaps % 2 == 0 { 1024 } else { 4096 });
                for slide in &slides {
                    slide.set_cache(&next);
                }
                assert!(next.resident_bytes() <= next.capacity());
                swaps += 1;
                if done.load(Ordering::Acquire) {
                    return swaps;
                }
                thread::yield_now();
            }
        });

        for reader in readers {
            reader.join().unwrap();
        }
        done.store(true, Ordering::Release);
        assert!(swapper.join().unwrap() > 0);
    });

    let cache = slides[0].cache();
    assert!(slides.iter().all(|slide| slide.cache().ptr_eq(&cache)));
    assert!(cache.resident_bytes() <= cache.capacity());
}

#[test]
fn test_concurrent_mutual_rebinding() {
    let c1 = TileCache::new(1000);
    let c2 = TileCache::new(1000);
    let a = CacheBinding::bound_to(&c1);
    let b = CacheBinding::bound_to(&c2);

    thread::scope(|s| {
        s.spawn(|| {
            for i in 0..5000 {
                a.set_cache(if i % 2 == 0 { &c2 } else { &c1 });
                a.put(PlaneId::new(0), i, 0, make_tile(10), 10).unref();
            }
        });
        s.spawn(|| {
            for i in 0..5000 {
                b.set_cache(if i % 2 == 0 { &c1 } else { &c2 });
                let _ = b.get(PlaneId::new(0), i, 0);
            }
        });
    });

    assert!(c1.resident_bytes() <= 1000);
    assert!(c2.resident_bytes() <= 1000);
    // Two explicit handles plus one binding on each after an even number of swaps
    assert_eq!(c1.ref_count() + c2.ref_count(), 4);
}

#[test]
fn test_concurrent_puts_same_key() {
    let binding = CacheBinding::with_capacity(100_000);
    let plane = PlaneId::new(0);

    let entries: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let binding = &binding;
                s.spawn(move || binding.put(plane, 1, 1, Bytes::from(vec![i; 100]), 100))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let cache = binding.cache();
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.resident_bytes(), 100);

    // Every writer received its own tile; exactly one of them is resident
    let resident = binding.get(plane, 1, 1).unwrap();
    let winners = entries.iter().filter(|e| e.ptr_eq(&resident)).count();
    assert_eq!(winners, 1);
    for (i, entry) in entries.iter().enumerate() {
        assert!(entry.data().iter().all(|&b| b == i as u8));
    }
}

#[test]
fn test_concurrent_release_frees_once() {
    let binding = CacheBinding::with_capacity(1000);
    let plane = PlaneId::new(0);
    let (tile, freed) = tracked_tile(100);

    binding.put(plane, 0, 0, tile, 100).unref();
    let holders: Vec<_> = (0..16).map(|_| binding.get(plane, 0, 0).unwrap()).collect();

    // Evict while the holders still reference the tile
    binding.cache().set_capacity(0);
    assert_eq!(frees(&freed), 0);

    thread::scope(|s| {
        for holder in holders {
            s.spawn(move || {
                assert_eq!(holder.data().len(), 100);
                holder.unref();
            });
        }
    });

    assert_eq!(frees(&freed), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stress_runner_with_swapping() {
    let config = StressConfig {
        capacity: 256 * 1024,
        swap_capacity: 64 * 1024,
        slides: 3,
        levels: 2,
        readers: 4,
        reads: 1000,
        grid: 8,
        tile_edge: 32,
        swap_interval_ms: 1,
        ..StressConfig::default()
    };

    let report = run_stress(&config).await.unwrap();

    assert_eq!(report.reads, 4000);
    assert_eq!(report.hits + report.misses, 4000);
    assert_eq!(report.mismatches, 0);
    assert!(report.final_cache.resident_bytes <= report.final_cache.capacity);
}
