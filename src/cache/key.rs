//! Cache keys for decoded tiles.

/// Opaque identity of one tile grid within an image.
///
/// A slide handle usually assigns one plane per pyramid level, using the
/// level index. Planes only need to be distinct within a single binding:
/// the binding tag already keeps different slides apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlaneId(u64);

impl PlaneId {
    /// Create a plane identity from a raw token.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw token.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for PlaneId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<usize> for PlaneId {
    fn from(level: usize) -> Self {
        Self(level as u64)
    }
}

/// Cache key for a decoded tile.
///
/// Two keys are equal only when every component matches, so bindings that
/// share a cache never see each other's tiles even when their planes and
/// coordinates collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    /// Tag of the binding that inserted the tile
    pub binding_tag: u64,

    /// Tile grid the coordinates refer to
    pub plane: PlaneId,

    /// Tile column
    pub x: i64,

    /// Tile row
    pub y: i64,
}

impl TileKey {
    /// Create a new cache key.
    pub fn new(binding_tag: u64, plane: PlaneId, x: i64, y: i64) -> Self {
        Self {
            binding_tag,
            plane,
            x,
            y,
        }
    }
}
