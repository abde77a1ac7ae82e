//! Host block placement seam.

use crate::coord::BlockPos;
use crate::error::PlacementResult;

/// Block placement primitive provided by the host world.
///
/// Fails with [`crate::PlacementError`] when the target chunk is not
/// loaded or the position is invalid.
pub trait BlockSink {
    /// Places `block` at `pos`, replacing whatever is there.
    ///
    /// # Errors
    ///
    /// Target unloaded, out of bounds, or unknown block id.
    fn set_block(&mut self, pos: BlockPos, block: &str) -> PlacementResult<()>;
}

/// Air block id, used when clearing regions.
pub const AIR: &str = "air";
