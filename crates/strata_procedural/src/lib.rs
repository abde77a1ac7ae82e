//! # STRATA Procedural Generation
//!
//! Deterministic terrain math for chunked, incremental generation.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: Same seed and config always produce the same columns
//! 2. **Chunked**: Columns are sampled and cached per chunk
//! 3. **Evictable**: Any cached chunk can be dropped and rebuilt bit-identically
//! 4. **Pluggable**: Biome decoration and structures are capabilities, not code here
//!
//! ## Core Components
//!
//! - `NoiseSampler`: Seeded fractal height, climate, moisture and tie fields
//! - `ColumnCache`: Per-chunk memoized columns with distance-ranked eviction
//! - `BiomeClassifier`: Weighted nearest-neighbour biome selection
//! - `Registry`: Biome and structure descriptors with a sealed index
//!
//! ## Example
//!
//! ```rust,ignore
//! use strata_procedural::{ColumnCache, NoiseSampler, TerrainParams, WorldSeed};
//!
//! let sampler = NoiseSampler::new(WorldSeed::new(12345), &TerrainParams::default());
//! let mut cache = ColumnCache::new(ChunkLayout::default());
//! let record = cache.get_or_build(ChunkCoord::new(0, 0), &sampler, &classifier);
//! assert_eq!(record.heights.len(), 256);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod cache;
pub mod classifier;
pub mod noise;
pub mod registry;
pub mod sampler;

pub use cache::{
    CacheStats, ColumnCache, ColumnNoiseRecord, EvictionReport, MISSING_BIOME, MISSING_FIELD,
    MISSING_HEIGHT,
};
pub use classifier::{BiomeClassifier, ClassifierParams, HeightBand};
pub use noise::{ConstantNoise, NoisePrimitive, SimplexNoise, WorldSeed};
pub use registry::{
    BiomeDescriptor, Decorator, Exclusion, Registry, StructureDescriptor, StructurePlacer,
    SurfaceLayers,
};
pub use sampler::{sample_fractal, ColumnSample, FractalParams, NoiseField, NoiseSampler, TerrainParams};
