//! # Chunk Coordinates
//!
//! The world is a 2D grid of square chunks, each `edge × edge` columns.
//! Chunk coordinates are derived from world coordinates by floor division,
//! so negative positions land in negative chunks (`-1 → -1`, not `0`).
//!
//! ## Keys
//!
//! Hash maps are keyed by [`ChunkKey`], two signed 32-bit coordinates
//! shift-combined into one `u64`:
//!
//! ```text
//! ┌────────────────────────┬────────────────────────┐
//! │  cx as u32 (bits 63-32) │  cz as u32 (bits 31-0)  │
//! └────────────────────────┴────────────────────────┘
//! ```

use std::fmt;

/// Default chunk edge length in columns.
pub const DEFAULT_CHUNK_EDGE: u16 = 16;

/// Chunk coordinate (identifies a chunk in the world grid).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    /// X coordinate (in chunks, not blocks).
    pub x: i32,
    /// Z coordinate (in chunks, not blocks).
    pub z: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Packs this coordinate into a hash key.
    #[inline]
    #[must_use]
    pub const fn key(self) -> ChunkKey {
        ChunkKey::pack(self)
    }

    /// Squared distance to another chunk coordinate, in chunk units.
    #[inline]
    #[must_use]
    pub fn distance_squared(self, other: ChunkCoord) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dz = i64::from(self.z) - i64::from(other.z);
        dx * dx + dz * dz
    }

    /// Returns the coordinate offset by `(dx, dz)` chunks.
    #[inline]
    #[must_use]
    pub const fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            z: self.z + dz,
        }
    }

    /// Canonical `"cx cz"` text form used in persisted maps.
    #[must_use]
    pub fn to_canonical(self) -> String {
        format!("{} {}", self.x, self.z)
    }

    /// Parses the canonical `"cx cz"` text form.
    #[must_use]
    pub fn parse_canonical(text: &str) -> Option<Self> {
        let mut parts = text.split_whitespace();
        let x = parts.next()?.parse().ok()?;
        let z = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self { x, z })
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Packed 64-bit chunk key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey(u64);

impl ChunkKey {
    /// Packs a coordinate.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn pack(coord: ChunkCoord) -> Self {
        Self(((coord.x as u32 as u64) << 32) | (coord.z as u32 as u64))
    }

    /// Recovers the coordinate.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub const fn unpack(self) -> ChunkCoord {
        ChunkCoord {
            x: (self.0 >> 32) as u32 as i32,
            z: self.0 as u32 as i32,
        }
    }

    /// Raw packed value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<ChunkCoord> for ChunkKey {
    fn from(coord: ChunkCoord) -> Self {
        Self::pack(coord)
    }
}

/// A world block position (`y` is vertical).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockPos {
    /// World X.
    pub x: i32,
    /// World Y (height).
    pub y: i32,
    /// World Z.
    pub z: i32,
}

impl BlockPos {
    /// Creates a block position.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.x, self.y, self.z)
    }
}

/// Chunk geometry: edge length and the world/local conversions built on it.
///
/// Local columns are indexed row-major as `x * edge + z`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkLayout {
    edge: u16,
}

impl Default for ChunkLayout {
    fn default() -> Self {
        Self {
            edge: DEFAULT_CHUNK_EDGE,
        }
    }
}

impl ChunkLayout {
    /// Creates a layout with the given edge length.
    ///
    /// # Panics
    ///
    /// Panics if `edge` is zero.
    #[must_use]
    pub fn new(edge: u16) -> Self {
        assert!(edge > 0, "chunk edge must be non-zero");
        Self { edge }
    }

    /// Edge length in columns.
    #[inline]
    #[must_use]
    pub const fn edge(self) -> u16 {
        self.edge
    }

    /// Edge length as a signed world distance.
    #[inline]
    #[must_use]
    pub fn edge_i32(self) -> i32 {
        i32::from(self.edge)
    }

    /// Number of columns per chunk (`edge * edge`).
    #[inline]
    #[must_use]
    pub fn columns(self) -> usize {
        usize::from(self.edge) * usize::from(self.edge)
    }

    /// Chunk containing the world column `(world_x, world_z)`.
    #[inline]
    #[must_use]
    pub fn chunk_of(self, world_x: i32, world_z: i32) -> ChunkCoord {
        ChunkCoord {
            x: world_x.div_euclid(self.edge_i32()),
            z: world_z.div_euclid(self.edge_i32()),
        }
    }

    /// World X/Z of the chunk's minimum corner.
    #[inline]
    #[must_use]
    pub fn origin(self, coord: ChunkCoord) -> (i32, i32) {
        (coord.x * self.edge_i32(), coord.z * self.edge_i32())
    }

    /// Local index of a column inside its chunk.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn local_index_of(self, world_x: i32, world_z: i32) -> usize {
        let lx = world_x.rem_euclid(self.edge_i32()) as usize;
        let lz = world_z.rem_euclid(self.edge_i32()) as usize;
        self.local_index(lx, lz)
    }

    /// Local index from local `(x, z)`.
    #[inline]
    #[must_use]
    pub fn local_index(self, local_x: usize, local_z: usize) -> usize {
        local_x * usize::from(self.edge) + local_z
    }

    /// Decomposes a world column into `(chunk, local index)`.
    #[inline]
    #[must_use]
    pub fn locate(self, world_x: i32, world_z: i32) -> (ChunkCoord, usize) {
        (
            self.chunk_of(world_x, world_z),
            self.local_index_of(world_x, world_z),
        )
    }

    /// Whether a world column lies inside `coord`.
    #[inline]
    #[must_use]
    pub fn contains(self, coord: ChunkCoord, world_x: i32, world_z: i32) -> bool {
        self.chunk_of(world_x, world_z) == coord
    }
}
