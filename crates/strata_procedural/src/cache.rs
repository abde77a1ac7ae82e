//! # Column Cache
//!
//! Memoizes, per chunk, everything the builder reads about its columns:
//!
//! ```text
//! ChunkKey ──> ColumnNoiseRecord
//!              ├─ heights   [i16; S*S]
//!              ├─ biomes    [u16; S*S]
//!              ├─ climate   [f32; S*S]
//!              ├─ tie       [f32; S*S]
//!              ├─ moisture  [f32; S*S]
//!              └─ highest / lowest point
//! ```
//!
//! All arrays are built and evicted together, so the chunk count alone is
//! the cost proxy. Point queries on absent chunks return neutral defaults
//! instead of failing: [`MISSING_FIELD`] for noise fields,
//! [`MISSING_HEIGHT`] for heights, biome index `0`.

use std::collections::HashMap;

use strata_core::{ChunkCoord, ChunkKey, ChunkLayout};
use tracing::{debug, info};

use crate::classifier::BiomeClassifier;
use crate::sampler::NoiseSampler;

/// Default for climate/tie/moisture queries on absent chunks.
pub const MISSING_FIELD: f32 = 0.5;

/// Default for height queries on absent chunks.
pub const MISSING_HEIGHT: i16 = 0;

/// Default for biome queries on absent chunks.
pub const MISSING_BIOME: u16 = 0;

/// Per-chunk column data.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnNoiseRecord {
    /// Column heights, local index order.
    pub heights: Vec<i16>,
    /// Biome indices.
    pub biomes: Vec<u16>,
    /// Climate samples in [0, 1].
    pub climate: Vec<f32>,
    /// Tie-breaker samples in [0, 1].
    pub tie: Vec<f32>,
    /// Moisture samples in [0, 1].
    pub moisture: Vec<f32>,
    /// Maximum of `heights`.
    pub highest_point: i16,
    /// Minimum of `heights`.
    pub lowest_point: i16,
}

impl ColumnNoiseRecord {
    /// Samples and classifies every column of `coord`.
    #[must_use]
    pub fn build(
        coord: ChunkCoord,
        layout: ChunkLayout,
        sampler: &NoiseSampler,
        classifier: &BiomeClassifier,
    ) -> Self {
        let columns = layout.columns();
        let edge = usize::from(layout.edge());
        let (base_x, base_z) = layout.origin(coord);

        let mut record = Self {
            heights: Vec::with_capacity(columns),
            biomes: Vec::with_capacity(columns),
            climate: Vec::with_capacity(columns),
            tie: Vec::with_capacity(columns),
            moisture: Vec::with_capacity(columns),
            highest_point: i16::MIN,
            lowest_point: i16::MAX,
        };

        // Push order matches `x * edge + z`.
        for lx in 0..layout.edge_i32() {
            for lz in 0..layout.edge_i32() {
                let sample = sampler.column(base_x + lx, base_z + lz);
                record.highest_point = record.highest_point.max(sample.height);
                record.lowest_point = record.lowest_point.min(sample.height);
                record.heights.push(sample.height);
                record.climate.push(sample.climate);
                record.tie.push(sample.tie);
                record.moisture.push(sample.moisture);
                record.biomes.push(classifier.classify(
                    sample.climate,
                    sample.height,
                    sample.tie,
                    sample.moisture,
                ));
            }
        }
        debug_assert_eq!(record.heights.len(), edge * edge);
        record
    }

    /// Height at a local index.
    #[inline]
    #[must_use]
    pub fn height(&self, local: usize) -> i16 {
        self.heights[local]
    }

    /// Biome at a local index.
    #[inline]
    #[must_use]
    pub fn biome(&self, local: usize) -> u16 {
        self.biomes[local]
    }
}

/// Cache activity counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// `get_or_build` calls served from the cache.
    pub hits: u64,
    /// `get_or_build` calls that built a record.
    pub misses: u64,
    /// Records removed by eviction.
    pub evicted: u64,
}

/// Outcome of one eviction pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EvictionReport {
    /// Records kept.
    pub kept: usize,
    /// Records removed.
    pub removed: usize,
}

/// Chunk-keyed column cache.
#[derive(Debug)]
pub struct ColumnCache {
    layout: ChunkLayout,
    records: HashMap<ChunkKey, ColumnNoiseRecord>,
    stats: CacheStats,
}

impl ColumnCache {
    /// Creates an empty cache for `layout`.
    #[must_use]
    pub fn new(layout: ChunkLayout) -> Self {
        Self {
            layout,
            records: HashMap::new(),
            stats: CacheStats::default(),
        }
    }

    /// Chunk geometry.
    #[must_use]
    pub fn layout(&self) -> ChunkLayout {
        self.layout
    }

    /// Record for `coord`, building and inserting it on miss.
    pub fn get_or_build(
        &mut self,
        coord: ChunkCoord,
        sampler: &NoiseSampler,
        classifier: &BiomeClassifier,
    ) -> &ColumnNoiseRecord {
        let layout = self.layout;
        let stats = &mut self.stats;
        self.records
            .entry(coord.key())
            .and_modify(|_| stats.hits += 1)
            .or_insert_with(|| {
                stats.misses += 1;
                ColumnNoiseRecord::build(coord, layout, sampler, classifier)
            })
    }

    /// Record for `coord` without building.
    #[must_use]
    pub fn get(&self, coord: ChunkCoord) -> Option<&ColumnNoiseRecord> {
        self.records.get(&coord.key())
    }

    /// Whether `coord` is cached.
    #[must_use]
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.records.contains_key(&coord.key())
    }

    fn lookup(&self, world_x: i32, world_z: i32) -> Option<(&ColumnNoiseRecord, usize)> {
        let (coord, local) = self.layout.locate(world_x, world_z);
        self.get(coord).map(|record| (record, local))
    }

    /// Height of the world column, or [`MISSING_HEIGHT`].
    #[must_use]
    pub fn height_at(&self, world_x: i32, world_z: i32) -> i16 {
        self.lookup(world_x, world_z)
            .map_or(MISSING_HEIGHT, |(r, i)| r.heights[i])
    }

    /// Biome of the world column, or [`MISSING_BIOME`].
    #[must_use]
    pub fn biome_at(&self, world_x: i32, world_z: i32) -> u16 {
        self.lookup(world_x, world_z)
            .map_or(MISSING_BIOME, |(r, i)| r.biomes[i])
    }

    /// Climate of the world column, or [`MISSING_FIELD`].
    #[must_use]
    pub fn climate_at(&self, world_x: i32, world_z: i32) -> f32 {
        self.lookup(world_x, world_z)
            .map_or(MISSING_FIELD, |(r, i)| r.climate[i])
    }

    /// Tie-breaker of the world column, or [`MISSING_FIELD`].
    #[must_use]
    pub fn tie_at(&self, world_x: i32, world_z: i32) -> f32 {
        self.lookup(world_x, world_z)
            .map_or(MISSING_FIELD, |(r, i)| r.tie[i])
    }

    /// Moisture of the world column, or [`MISSING_FIELD`].
    #[must_use]
    pub fn moisture_at(&self, world_x: i32, world_z: i32) -> f32 {
        self.lookup(world_x, world_z)
            .map_or(MISSING_FIELD, |(r, i)| r.moisture[i])
    }

    /// Highest column of a cached chunk.
    #[must_use]
    pub fn highest_point(&self, coord: ChunkCoord) -> Option<i16> {
        self.get(coord).map(|r| r.highest_point)
    }

    /// Number of cached chunks.
    #[must_use]
    pub fn total_cache_size(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Activity counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Drops one chunk's record.
    pub fn remove(&mut self, coord: ChunkCoord) -> bool {
        self.records.remove(&coord.key()).is_some()
    }

    /// Drops every record.
    pub fn clear(&mut self) {
        let removed = self.records.len();
        self.records.clear();
        self.stats.evicted += removed as u64;
        debug!(removed, "column cache cleared");
    }

    /// Keeps the `ceil(size * keep_fraction)` chunks nearest `reference`
    /// and removes the rest. Chunks for which `pinned` holds are never
    /// removed and do not count against the keep budget.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn evict_far(
        &mut self,
        reference: ChunkCoord,
        keep_fraction: f64,
        pinned: impl Fn(ChunkCoord) -> bool,
    ) -> EvictionReport {
        let size = self.records.len();
        let keep = ((size as f64) * keep_fraction.clamp(0.0, 1.0)).ceil() as usize;

        let mut ranked: Vec<(i64, ChunkKey)> = self
            .records
            .keys()
            .filter(|key| !pinned(key.unpack()))
            .map(|key| (key.unpack().distance_squared(reference), *key))
            .collect();
        ranked.sort_unstable();

        let mut removed = 0;
        for (_, key) in ranked.iter().skip(keep) {
            if self.records.remove(key).is_some() {
                removed += 1;
            }
        }
        self.stats.evicted += removed as u64;

        let report = EvictionReport {
            kept: self.records.len(),
            removed,
        };
        info!(
            reference = %reference,
            kept = report.kept,
            removed = report.removed,
            "column cache eviction"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifierParams;
    use crate::noise::WorldSeed;
    use crate::registry::{BiomeDescriptor, Registry};
    use crate::sampler::TerrainParams;

    fn fixtures() -> (NoiseSampler, BiomeClassifier) {
        let terrain = TerrainParams::default();
        let mut reg = Registry::new();
        reg.add_biome(BiomeDescriptor::new("plains").bias(0.5, 0.5, 1.0 / 3.0))
            .unwrap();
        reg.add_biome(BiomeDescriptor::new("desert").bias(0.9, 0.1, 1.0 / 3.0))
            .unwrap();
        reg.build_indexes().unwrap();
        let classifier =
            BiomeClassifier::new(&reg, ClassifierParams::default(), terrain.height_max()).unwrap();
        (NoiseSampler::new(WorldSeed::new(42), &terrain), classifier)
    }

    #[test]
    fn test_build_is_deterministic() {
        let (sampler, classifier) = fixtures();
        let mut cache = ColumnCache::new(ChunkLayout::default());
        let first = cache.get_or_build(ChunkCoord::new(3, -2), &sampler, &classifier).clone();
        let second = cache.get_or_build(ChunkCoord::new(3, -2), &sampler, &classifier).clone();
        assert_eq!(first, second);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);

        let rebuilt = ColumnNoiseRecord::build(
            ChunkCoord::new(3, -2),
            ChunkLayout::default(),
            &sampler,
            &classifier,
        );
        assert_eq!(first, rebuilt);
    }

    #[test]
    fn test_record_shape() {
        let (sampler, classifier) = fixtures();
        let record = ColumnNoiseRecord::build(
            ChunkCoord::new(0, 0),
            ChunkLayout::default(),
            &sampler,
            &classifier,
        );
        for len in [
            record.heights.len(),
            record.biomes.len(),
            record.climate.len(),
            record.tie.len(),
            record.moisture.len(),
        ] {
            assert_eq!(len, 256);
        }
        assert_eq!(record.highest_point, *record.heights.iter().max().unwrap());
        assert_eq!(record.lowest_point, *record.heights.iter().min().unwrap());
    }

    #[test]
    fn test_point_queries_match_record() {
        let (sampler, classifier) = fixtures();
        let mut cache = ColumnCache::new(ChunkLayout::default());
        cache.get_or_build(ChunkCoord::new(-1, 0), &sampler, &classifier);

        let (x, z) = (-3, 5);
        assert_eq!(cache.height_at(x, z), sampler.height(x, z));
        assert_eq!(cache.climate_at(x, z), sampler.climate(x, z));
        assert_eq!(cache.tie_at(x, z), sampler.tie(x, z));
        assert_eq!(cache.moisture_at(x, z), sampler.moisture(x, z));
    }

    #[test]
    fn test_absent_chunk_defaults() {
        let cache = ColumnCache::new(ChunkLayout::default());
        assert_eq!(cache.height_at(1000, 1000), MISSING_HEIGHT);
        assert_eq!(cache.biome_at(1000, 1000), MISSING_BIOME);
        assert_eq!(cache.climate_at(-5, 9), MISSING_FIELD);
        assert_eq!(cache.tie_at(-5, 9), MISSING_FIELD);
        assert_eq!(cache.moisture_at(-5, 9), MISSING_FIELD);
        assert_eq!(cache.highest_point(ChunkCoord::new(0, 0)), None);
    }

    #[test]
    fn test_evict_keep_all_is_noop() {
        let (sampler, classifier) = fixtures();
        let mut cache = ColumnCache::new(ChunkLayout::default());
        for x in 0..6 {
            cache.get_or_build(ChunkCoord::new(x, x), &sampler, &classifier);
        }
        let before: Vec<_> = (0..6)
            .map(|x| cache.get(ChunkCoord::new(x, x)).cloned())
            .collect();
        let report = cache.evict_far(ChunkCoord::new(0, 0), 1.0, |_| false);
        assert_eq!(report, EvictionReport { kept: 6, removed: 0 });
        let after: Vec<_> = (0..6)
            .map(|x| cache.get(ChunkCoord::new(x, x)).cloned())
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_evict_ranks_by_distance() {
        let (sampler, classifier) = fixtures();
        let mut cache = ColumnCache::new(ChunkLayout::default());
        // Squared distances 0, 1, 4, 9, 16 from the origin.
        for x in 0..5 {
            cache.get_or_build(ChunkCoord::new(x, 0), &sampler, &classifier);
        }
        let report = cache.evict_far(ChunkCoord::new(0, 0), 0.4, |_| false);
        assert_eq!(report, EvictionReport { kept: 2, removed: 3 });
        assert!(cache.contains(ChunkCoord::new(0, 0)));
        assert!(cache.contains(ChunkCoord::new(1, 0)));

        // Every field of an evicted chunk falls back to its default.
        let (x, z) = (16 * 4 + 2, 7);
        assert_eq!(cache.height_at(x, z), MISSING_HEIGHT);
        assert_eq!(cache.biome_at(x, z), MISSING_BIOME);
        assert_eq!(cache.climate_at(x, z), MISSING_FIELD);
        assert_eq!(cache.tie_at(x, z), MISSING_FIELD);
        assert_eq!(cache.moisture_at(x, z), MISSING_FIELD);
        assert_eq!(cache.stats().evicted, 3);
    }

    #[test]
    fn test_evict_spares_pinned() {
        let (sampler, classifier) = fixtures();
        let mut cache = ColumnCache::new(ChunkLayout::default());
        for x in 0..5 {
            cache.get_or_build(ChunkCoord::new(x, 0), &sampler, &classifier);
        }
        let far = ChunkCoord::new(4, 0);
        let report = cache.evict_far(ChunkCoord::new(0, 0), 0.0, |c| c == far);
        assert_eq!(report.removed, 4);
        assert!(cache.contains(far));
        assert_eq!(cache.total_cache_size(), 1);
    }
}
