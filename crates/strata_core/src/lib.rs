//! # STRATA Core
//!
//! Foundation types shared by the procedural and runtime crates:
//! - Chunk coordinates with a packed, allocation-free 64-bit key
//! - The error taxonomy (placement, persistence, config, registry)
//! - The durable key-value store seam and segmented persistence
//! - The tunable registry exposed to operators
//!
//! ## Example
//!
//! ```rust,ignore
//! use strata_core::{ChunkCoord, ChunkLayout};
//!
//! let layout = ChunkLayout::default();
//! let coord = layout.chunk_of(-1, 17);
//! assert_eq!(coord, ChunkCoord::new(-1, 1));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod coord;
pub mod error;
pub mod segmented;
pub mod store;
pub mod tunable;
pub mod world;

pub use coord::{BlockPos, ChunkCoord, ChunkKey, ChunkLayout, DEFAULT_CHUNK_EDGE};
pub use error::{
    ConfigError, ConfigResult, PersistError, PersistResult, PlacementError, PlacementResult,
    RegistryError, RegistryResult, StoreError, StoreResult,
};
pub use segmented::{SegmentedStore, SEGMENT_LEN};
pub use store::{KeyValueStore, MemoryStore};
pub use tunable::{Tunable, TunableKind, TunableRegistry, TunableValue};
pub use world::{BlockSink, AIR};
