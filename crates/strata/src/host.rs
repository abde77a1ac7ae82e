//! # Host World Seam
//!
//! Generation writes blocks and reads observer positions through
//! [`WorldHost`]. [`MemoryWorld`] is the in-process implementation used
//! by the headless driver and the tests: a sparse block map with a
//! vertical bound and a set of chunks the host has unloaded.

use std::collections::{HashMap, HashSet};

use strata_core::{
    BlockPos, BlockSink, ChunkCoord, ChunkKey, ChunkLayout, PlacementError, PlacementResult, AIR,
};

/// Everything generation needs from the host world.
pub trait WorldHost: BlockSink {
    /// Current observer positions (players, cameras). The first one is the
    /// primary observer.
    fn observers(&self) -> Vec<BlockPos>;
}

/// Sparse in-memory world.
#[derive(Debug, Clone)]
pub struct MemoryWorld {
    layout: ChunkLayout,
    blocks: HashMap<BlockPos, String>,
    unloaded: HashSet<ChunkKey>,
    min_y: i32,
    max_y: i32,
    observers: Vec<BlockPos>,
    writes: u64,
}

impl Default for MemoryWorld {
    fn default() -> Self {
        Self::new(ChunkLayout::default())
    }
}

impl MemoryWorld {
    /// Empty world spanning `y` in `[-64, 320)` with every chunk loaded.
    #[must_use]
    pub fn new(layout: ChunkLayout) -> Self {
        Self {
            layout,
            blocks: HashMap::new(),
            unloaded: HashSet::new(),
            min_y: -64,
            max_y: 320,
            observers: Vec::new(),
            writes: 0,
        }
    }

    /// Replaces the vertical bounds, `min_y` inclusive, `max_y` exclusive.
    #[must_use]
    pub fn with_height_bounds(mut self, min_y: i32, max_y: i32) -> Self {
        self.min_y = min_y;
        self.max_y = max_y;
        self
    }

    /// Block at `pos`, if one was written and not cleared to air.
    #[must_use]
    pub fn block_at(&self, pos: BlockPos) -> Option<&str> {
        self.blocks.get(&pos).map(String::as_str)
    }

    /// Highest non-air block in the column, if any.
    #[must_use]
    pub fn top_block(&self, x: i32, z: i32) -> Option<(i32, &str)> {
        (self.min_y..self.max_y)
            .rev()
            .find_map(|y| self.block_at(BlockPos::new(x, y, z)).map(|b| (y, b)))
    }

    /// Makes writes into `coord` fail until it is loaded again.
    pub fn unload_chunk(&mut self, coord: ChunkCoord) {
        self.unloaded.insert(coord.key());
    }

    /// Reverses [`Self::unload_chunk`].
    pub fn load_chunk(&mut self, coord: ChunkCoord) {
        self.unloaded.remove(&coord.key());
    }

    /// Whether writes into `coord` are accepted.
    #[must_use]
    pub fn is_loaded(&self, coord: ChunkCoord) -> bool {
        !self.unloaded.contains(&coord.key())
    }

    /// Replaces the observer list.
    pub fn set_observers(&mut self, observers: Vec<BlockPos>) {
        self.observers = observers;
    }

    /// Number of non-air blocks stored.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Successful writes since creation.
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.writes
    }

    /// Number of stored blocks inside `coord`.
    #[must_use]
    pub fn blocks_in_chunk(&self, coord: ChunkCoord) -> usize {
        self.blocks
            .keys()
            .filter(|pos| self.layout.chunk_of(pos.x, pos.z) == coord)
            .count()
    }
}

impl BlockSink for MemoryWorld {
    fn set_block(&mut self, pos: BlockPos, block: &str) -> PlacementResult<()> {
        if block.is_empty() {
            return Err(PlacementError::UnknownBlock(block.to_owned()));
        }
        if pos.y < self.min_y || pos.y >= self.max_y {
            return Err(PlacementError::OutOfBounds { pos });
        }
        if !self.is_loaded(self.layout.chunk_of(pos.x, pos.z)) {
            return Err(PlacementError::Unloaded { pos });
        }
        if block == AIR {
            self.blocks.remove(&pos);
        } else {
            self.blocks.insert(pos, block.to_owned());
        }
        self.writes += 1;
        Ok(())
    }
}

impl WorldHost for MemoryWorld {
    fn observers(&self) -> Vec<BlockPos> {
        self.observers.clone()
    }
}
