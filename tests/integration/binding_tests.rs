//! Binding isolation and rebinding tests.
//!
//! Tests verify:
//! - Bindings on one cache never see each other's tiles
//! - Rebinding leaves entries handed out earlier valid
//! - Cache lifetime follows its bindings and application handles
//! - Tags are unique per cache, including across rebinds

use bytes::Bytes;

use wsi_tilecache::{CacheBinding, PlaneId, TileCache, DEFAULT_CACHE_CAPACITY};

use super::test_utils::{frees, make_tile, tracked_tile};

// =============================================================================
// Isolation
// =============================================================================

#[test]
fn test_shared_cache_isolates_bindings() {
    let cache = TileCache::new(10_000);
    let a = CacheBinding::bound_to(&cache);
    let b = CacheBinding::bound_to(&cache);
    let plane = PlaneId::new(7);

    a.put(plane, 5, 5, Bytes::from_static(b"dataA"), 10).unref();

    assert!(b.get(plane, 5, 5).is_none());
    assert_eq!(a.get(plane, 5, 5).unwrap().data().as_ref(), b"dataA");

    b.put(plane, 5, 5, Bytes::from_static(b"dataB"), 10).unref();

    assert_eq!(a.get(plane, 5, 5).unwrap().data().as_ref(), b"dataA");
    assert_eq!(b.get(plane, 5, 5).unwrap().data().as_ref(), b"dataB");
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.resident_bytes(), 20);
}

#[test]
fn test_bindings_share_one_budget() {
    let cache = TileCache::new(300);
    let a = CacheBinding::bound_to(&cache);
    let b = CacheBinding::bound_to(&cache);
    let plane = PlaneId::new(0);

    a.put(plane, 0, 0, make_tile(100), 100).unref();
    b.put(plane, 0, 0, make_tile(100), 100).unref();
    a.put(plane, 1, 0, make_tile(100), 100).unref();
    b.put(plane, 1, 0, make_tile(100), 100).unref();

    // a's first tile was the least recently used across both slides
    assert!(!a.contains(plane, 0, 0));
    assert!(b.contains(plane, 0, 0));
    assert_eq!(cache.resident_bytes(), 300);
}

#[test]
fn test_planes_are_independent_grids() {
    let binding = CacheBinding::with_capacity(1000);

    binding
        .put(PlaneId::new(0), 1, 1, Bytes::from_static(b"level0"), 6)
        .unref();
    binding
        .put(PlaneId::new(1), 1, 1, Bytes::from_static(b"level1"), 6)
        .unref();

    assert_eq!(
        binding.get(PlaneId::new(0), 1, 1).unwrap().data().as_ref(),
        b"level0"
    );
    assert_eq!(
        binding.get(PlaneId::new(1), 1, 1).unwrap().data().as_ref(),
        b"level1"
    );
}

// =============================================================================
// Rebinding
// =============================================================================

#[test]
fn test_entry_survives_rebind() {
    let c1 = TileCache::new(1000);
    let c2 = TileCache::new(1000);
    let binding = CacheBinding::bound_to(&c1);
    let plane = PlaneId::new(0);
    let (tile, freed) = tracked_tile(32);

    let held = binding.put(plane, 0, 0, tile, 32);

    binding.set_cache(&c2);
    c1.release();

    // c1 is destroyed; the held entry is the only reference left
    assert_eq!(held.ref_count(), 1);
    assert_eq!(frees(&freed), 0);
    assert!(held.data().iter().all(|&b| b == 0xAB));

    held.unref();
    assert_eq!(frees(&freed), 1);
}

#[test]
fn test_rebind_hides_old_tiles() {
    let c1 = TileCache::new(1000);
    let c2 = TileCache::new(1000);
    let binding = CacheBinding::bound_to(&c1);
    let plane = PlaneId::new(0);

    binding.put(plane, 3, 4, make_tile(10), 10).unref();
    binding.set_cache(&c2);

    assert!(binding.get(plane, 3, 4).is_none());
    assert_eq!(c1.resident_bytes(), 10);

    binding.put(plane, 3, 4, make_tile(20), 20).unref();
    assert_eq!(c2.resident_bytes(), 20);
    assert_eq!(c1.resident_bytes(), 10);
}

#[test]
fn test_rebind_back_does_not_resurrect_tiles() {
    let c1 = TileCache::new(1000);
    let c2 = TileCache::new(1000);
    let binding = CacheBinding::bound_to(&c1);
    let plane = PlaneId::new(0);

    binding.put(plane, 0, 0, make_tile(10), 10).unref();
    let first_tag = binding.tag();

    binding.set_cache(&c2);
    binding.set_cache(&c1);

    assert_ne!(binding.tag(), first_tag);
    assert!(binding.get(plane, 0, 0).is_none());
    assert_eq!(c1.len(), 1);
}

#[test]
fn test_tags_unique_across_bindings_and_rebinds() {
    let cache = TileCache::new(1000);
    let mut seen = Vec::new();

    let bindings: Vec<_> = (0..4).map(|_| CacheBinding::bound_to(&cache)).collect();
    for binding in &bindings {
        seen.push(binding.tag());
    }
    for binding in &bindings {
        binding.set_cache(&cache);
        seen.push(binding.tag());
    }

    let mut sorted = seen.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), seen.len());
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(cache.stats().bindings_issued, 8);
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_default_binding_has_private_cache() {
    let a = CacheBinding::new();
    let b = CacheBinding::default();

    assert_eq!(a.tag(), 0);
    assert_eq!(b.tag(), 0);
    assert!(!a.cache().ptr_eq(&b.cache()));
    assert_eq!(a.cache().capacity(), DEFAULT_CACHE_CAPACITY);
}

#[test]
fn test_cache_lives_while_bindings_point_at_it() {
    let cache = TileCache::new(1000);
    let probe = cache.clone();
    let a = CacheBinding::bound_to(&cache);
    let b = CacheBinding::bound_to(&cache);

    // Application gives up its explicit reference
    cache.release();
    assert_eq!(probe.ref_count(), 3);

    a.put(PlaneId::new(0), 0, 0, make_tile(10), 10).unref();
    drop(a);
    assert_eq!(probe.ref_count(), 2);
    assert_eq!(probe.resident_bytes(), 10);

    b.set_cache(&TileCache::new(10));
    assert_eq!(probe.ref_count(), 1);
}

#[test]
fn test_swap_to_smaller_cache_at_run_time() {
    let binding = CacheBinding::new();
    let plane = PlaneId::new(0);
    binding.put(plane, 0, 0, make_tile(1000), 1000).unref();

    let small = TileCache::new(500);
    binding.set_cache(&small);

    let held = binding.put(plane, 0, 0, make_tile(1000), 1000);
    assert_eq!(held.data().len(), 1000);
    assert!(!binding.contains(plane, 0, 0));

    binding.put(plane, 1, 0, make_tile(400), 400).unref();
    assert!(binding.contains(plane, 1, 0));
    assert_eq!(small.resident_bytes(), 400);
}
