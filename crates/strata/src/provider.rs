//! # Generation Provider
//!
//! The one owned context every job runs against. It holds the config,
//! the noise sampler, the classifier, the column cache, the stage map and
//! the admission and eviction controllers, plus the host world and store.
//!
//! Jobs receive `&mut GenerationProvider` for exactly one step, so every
//! mutation made inside a step is atomic with respect to other jobs.

use std::sync::Arc;

use strata_core::{
    ChunkCoord, ChunkLayout, ConfigError, KeyValueStore, PlacementError, RegistryError,
    SegmentedStore,
};
use strata_procedural::{
    BiomeClassifier, ColumnCache, EvictionReport, NoiseSampler, Registry, MISSING_BIOME,
    MISSING_HEIGHT,
};
use tracing::{debug, info, warn};

use crate::admission::AdmissionController;
use crate::config::{GenerationConfig, CONFIG_KEY};
use crate::debug::DebugOverlay;
use crate::error::StrataResult;
use crate::eviction::EvictionController;
use crate::host::WorldHost;
use crate::notice::{NoticeSender, OperatorNotice};
use crate::stage::{BuildStage, StageMap};

/// Lifetime counters shown in the debug overlay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProviderCounters {
    /// Block writes that failed and bailed a chunk.
    pub placement_failures: u64,
    /// Chunks that reached `Finished`.
    pub finished: u64,
    /// Eviction passes run.
    pub evictions: u64,
    /// Chunks removed by eviction.
    pub evicted_chunks: u64,
}

/// Owned generation context.
pub struct GenerationProvider<W: WorldHost> {
    pub(crate) config: GenerationConfig,
    pub(crate) layout: ChunkLayout,
    pub(crate) sampler: NoiseSampler,
    pub(crate) classifier: BiomeClassifier,
    pub(crate) registry: Arc<Registry>,
    pub(crate) cache: ColumnCache,
    pub(crate) stages: StageMap,
    pub(crate) admission: AdmissionController,
    pub(crate) eviction: EvictionController,
    pub(crate) store: Arc<dyn KeyValueStore>,
    pub(crate) notices: NoticeSender,
    pub(crate) world: W,
    pub(crate) counters: ProviderCounters,
}

impl<W: WorldHost> GenerationProvider<W> {
    /// Builds the context. Calibrates eviction from the memory tier.
    ///
    /// # Errors
    ///
    /// The registry is not sealed, or the chunk edge is zero.
    pub fn new(
        config: GenerationConfig,
        registry: Arc<Registry>,
        world: W,
        store: Arc<dyn KeyValueStore>,
        notices: NoticeSender,
    ) -> StrataResult<Self> {
        if !registry.is_sealed() {
            return Err(RegistryError::NotSealed.into());
        }
        if config.chunk_edge == 0 {
            return Err(ConfigError::OutOfRange {
                name: "chunk_edge".to_owned(),
                value: 0.0,
                min: 1.0,
                max: f64::from(u16::MAX),
            }
            .into());
        }
        let layout = ChunkLayout::new(config.chunk_edge);
        let sampler = NoiseSampler::new(config.seed, &config.terrain);
        let classifier = BiomeClassifier::new(
            &registry,
            config.classifier.clone(),
            config.terrain.height_max(),
        )?;
        let admission = AdmissionController::new(config.max_building_chunks);
        let eviction = EvictionController::calibrate(config.memory_tier, config.max_cached_chunks);

        info!(
            seed = config.seed.value(),
            chunk_edge = config.chunk_edge,
            biomes = registry.biome_count(),
            structures = registry.structures().len(),
            "generation provider ready"
        );

        Ok(Self {
            config,
            layout,
            sampler,
            classifier,
            registry,
            cache: ColumnCache::new(layout),
            stages: StageMap::new(),
            admission,
            eviction,
            store,
            notices,
            world,
            counters: ProviderCounters::default(),
        })
    }

    /// Active config.
    #[must_use]
    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Chunk geometry.
    #[must_use]
    pub fn layout(&self) -> ChunkLayout {
        self.layout
    }

    /// Noise sampler for the active config.
    #[must_use]
    pub fn sampler(&self) -> &NoiseSampler {
        &self.sampler
    }

    /// Biome classifier for the active config.
    #[must_use]
    pub fn classifier(&self) -> &BiomeClassifier {
        &self.classifier
    }

    /// Biome and structure registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Column cache.
    #[must_use]
    pub fn cache(&self) -> &ColumnCache {
        &self.cache
    }

    /// Per-chunk resume points.
    #[must_use]
    pub fn stages(&self) -> &StageMap {
        &self.stages
    }

    /// Working set and in-flight counter.
    #[must_use]
    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    /// Eviction trigger.
    #[must_use]
    pub fn eviction(&self) -> &EvictionController {
        &self.eviction
    }

    /// Lifetime counters.
    #[must_use]
    pub fn counters(&self) -> ProviderCounters {
        self.counters
    }

    /// Host world.
    #[must_use]
    pub fn world(&self) -> &W {
        &self.world
    }

    /// Host world, mutably.
    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    /// Cached column height, or the missing default for absent chunks.
    #[must_use]
    pub fn height_at(&self, world_x: i32, world_z: i32) -> i16 {
        self.cache.height_at(world_x, world_z)
    }

    /// Cached biome index, or the missing default for absent chunks.
    #[must_use]
    pub fn biome_at(&self, world_x: i32, world_z: i32) -> u16 {
        self.cache.biome_at(world_x, world_z)
    }

    /// Chunk of the primary observer, if any observer is present.
    #[must_use]
    pub fn reference_chunk(&self) -> Option<ChunkCoord> {
        self.world
            .observers()
            .first()
            .map(|pos| self.layout.chunk_of(pos.x, pos.z))
    }

    /// Aborts the current build attempt of `coord` after a failed write.
    ///
    /// The chunk keeps its last advanced stage and becomes eligible for
    /// dispatch again.
    pub fn bail_generation(&mut self, coord: ChunkCoord, error: &PlacementError) {
        self.admission.release(coord);
        self.counters.placement_failures += 1;
        debug!(
            %coord,
            stage = ?self.stages.get(coord),
            %error,
            "chunk build bailed"
        );
    }

    /// Marks `coord` finished and releases it.
    ///
    /// # Panics
    ///
    /// If `current` is not the last stage before `Finished`.
    pub fn finish_chunk(&mut self, coord: ChunkCoord, current: BuildStage) {
        assert!(
            current.next() == Some(BuildStage::Finished),
            "finish_chunk called for {coord} at stage {current:?}"
        );
        self.stages.advance(coord, BuildStage::Finished);
        self.admission.release(coord);
        self.counters.finished += 1;
        debug!(%coord, "chunk finished");
    }

    /// Evicts around `reference`, never removing chunks in the working set.
    pub fn evict(&mut self, reference: ChunkCoord, keep_fraction: f64) -> EvictionReport {
        let admission = &self.admission;
        let report = self
            .cache
            .evict_far(reference, keep_fraction, |coord| admission.is_building(coord));
        self.counters.evictions += 1;
        self.counters.evicted_chunks += report.removed as u64;
        report
    }

    /// Drops every cached column, the working set and the stage map.
    pub fn drop_all(&mut self) {
        self.cache.clear();
        self.admission.reset();
        self.stages.clear();
        info!("column cache, working set and stage map dropped");
    }

    /// Flushes the stage map.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn save_progress(&mut self) -> StrataResult<()> {
        let store = SegmentedStore::new(self.store.as_ref());
        self.stages.save(&store)?;
        Ok(())
    }

    /// Replaces the stage map with the persisted one.
    pub fn load_progress(&mut self) {
        let store = SegmentedStore::new(self.store.as_ref());
        self.stages = StageMap::load(&store);
    }

    /// Persists the operator tunables.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn save_config(&self) -> StrataResult<()> {
        let store = SegmentedStore::new(self.store.as_ref());
        self.config.tunables().save(&store, CONFIG_KEY)?;
        Ok(())
    }

    /// Applies persisted tunables over the active config. Returns `false`
    /// when nothing usable was saved.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::apply_config`] failures.
    pub fn load_config(&mut self) -> StrataResult<bool> {
        let mut tunables = self.config.tunables();
        let loaded = {
            let store = SegmentedStore::new(self.store.as_ref());
            tunables.load(&store, CONFIG_KEY)
        };
        if !loaded {
            return Ok(false);
        }
        let mut config = self.config.clone();
        config.apply_tunables(&tunables);
        self.apply_config(config)?;
        Ok(true)
    }

    /// Removes the persisted tunables.
    pub fn delete_config(&self) {
        SegmentedStore::new(self.store.as_ref()).delete(CONFIG_KEY);
        info!("saved config deleted");
    }

    /// Switches to `config`, rebuilding the sampler and classifier and
    /// clearing the column cache. The chunk edge and memory tier are fixed
    /// for the provider's lifetime. The stage map is untouched.
    ///
    /// # Errors
    ///
    /// The classifier rejects the registry.
    pub fn apply_config(&mut self, mut config: GenerationConfig) -> StrataResult<()> {
        if config.chunk_edge != self.config.chunk_edge {
            warn!(
                requested = config.chunk_edge,
                active = self.config.chunk_edge,
                "chunk edge cannot change at runtime, keeping active edge"
            );
            config.chunk_edge = self.config.chunk_edge;
        }
        config.memory_tier = self.config.memory_tier;

        self.classifier = BiomeClassifier::new(
            &self.registry,
            config.classifier.clone(),
            config.terrain.height_max(),
        )?;
        self.sampler = NoiseSampler::new(config.seed, &config.terrain);
        self.cache.clear();
        self.admission.set_ceiling(config.max_building_chunks);
        self.eviction.set_clear_limit(config.eviction_policy().clear_limit);
        self.config = config;
        info!("generation config applied, column cache cleared");
        Ok(())
    }

    /// Sends an operator notice.
    pub fn notify(&self, notice: OperatorNotice) {
        self.notices.send(notice);
    }

    /// Snapshot of runtime state for the operator overlay.
    #[must_use]
    pub fn debug_overlay(&self) -> DebugOverlay {
        let mut overlay = DebugOverlay::new();
        overlay.add_line("STRATA");
        overlay.add_value(
            "in flight",
            format!("{} / {}", self.admission.in_flight(), self.admission.ceiling()),
        );
        overlay.add_value(
            "cached chunks",
            format!(
                "{} / {}",
                self.cache.total_cache_size(),
                self.eviction.policy().clear_limit
            ),
        );
        overlay.add_value("stage map", self.stages.len());
        overlay.add_value("finished", self.stages.finished_count());
        overlay.add_value("placement failures", self.counters.placement_failures);
        overlay.add_value("evictions", self.counters.evictions);
        if let Some(pos) = self.world.observers().first() {
            let height = self.height_at(pos.x, pos.z);
            let biome = self.biome_at(pos.x, pos.z);
            let name = self
                .registry
                .try_biome(biome)
                .map_or("?", |b| b.id.as_str());
            overlay.add_value("height", height);
            overlay.add_value("biome", format!("{biome} ({name})"));
            if height == MISSING_HEIGHT && biome == MISSING_BIOME {
                overlay.add_line("(column not cached)");
            }
        }
        overlay
    }
}
