//! # Generation Pipeline Integration Tests
//!
//! Drives the full runtime against an in-memory world: observer dispatch,
//! bail and resume, restart from persisted progress, eviction pinning.

use std::sync::Arc;

use strata::{content, Admission, BuildStage, GenerationConfig, MemoryWorld, Strata, STAGE_MAP_KEY};
use strata_core::{BlockPos, ChunkCoord, ChunkLayout, KeyValueStore, MemoryStore};
use strata_procedural::{BiomeDescriptor, Registry};

fn grass_only() -> Arc<Registry> {
    let mut registry = Registry::new();
    registry
        .add_biome(BiomeDescriptor::new("meadow").blocks("grass", "dirt", "stone"))
        .unwrap();
    registry.build_indexes().unwrap();
    Arc::new(registry)
}

fn runtime(
    config: GenerationConfig,
    registry: Arc<Registry>,
    world: MemoryWorld,
    store: Arc<MemoryStore>,
) -> Strata<MemoryWorld> {
    Strata::new(config, registry, world, store).unwrap()
}

fn observed_world(range_origin: BlockPos) -> MemoryWorld {
    let mut world = MemoryWorld::new(ChunkLayout::default());
    world.set_observers(vec![range_origin]);
    world
}

/// Test: Every chunk around the observer finishes and every column carries
/// its surface block at the cached height.
#[test]
fn test_observer_area_generates_completely() {
    let config = GenerationConfig {
        chunk_range: 2,
        ..GenerationConfig::default()
    };
    let mut strata = runtime(
        config,
        grass_only(),
        observed_world(BlockPos::new(8, 80, 8)),
        Arc::new(MemoryStore::new()),
    );

    let ticks = strata.run_until_idle(10_000);
    let provider = strata.provider();
    println!("generated 16 chunks in {ticks} ticks");

    assert_eq!(provider.stages().finished_count(), 16);
    assert_eq!(provider.admission().in_flight(), 0);
    for cx in -2..2 {
        for cz in -2..2 {
            assert!(provider.stages().is_finished(ChunkCoord::new(cx, cz)));
        }
    }
    for x in 0..16 {
        for z in 0..16 {
            let height = i32::from(provider.height_at(x, z));
            assert_eq!(
                provider.world().block_at(BlockPos::new(x, height, z)),
                Some("grass"),
                "missing surface at ({x}, {z})"
            );
        }
    }
}

/// Test: The standard content builds without failures and only produces
/// its own biome indices.
#[test]
fn test_standard_content_end_to_end() {
    let config = GenerationConfig {
        chunk_range: 2,
        ..GenerationConfig::default()
    };
    let registry = Arc::new(content::standard_registry().unwrap());
    let mut strata = runtime(
        config,
        registry,
        observed_world(BlockPos::new(0, 80, 0)),
        Arc::new(MemoryStore::new()),
    );
    strata.run_until_idle(10_000);

    let provider = strata.provider();
    assert_eq!(provider.stages().finished_count(), 16);
    assert_eq!(provider.counters().placement_failures, 0);
    for x in -32..32 {
        for z in -32..32 {
            assert!(provider.biome_at(x, z) < 2);
        }
    }
    println!("blocks placed: {}", provider.world().block_count());
}

/// Test: Dispatching a chunk twice while it builds starts one builder.
#[test]
fn test_at_most_one_builder_per_chunk() {
    let mut strata = runtime(
        GenerationConfig::default(),
        grass_only(),
        MemoryWorld::default(),
        Arc::new(MemoryStore::new()),
    );
    let coord = ChunkCoord::new(4, -4);
    assert_eq!(strata.dispatch(coord), Admission::Admitted);
    assert_eq!(strata.dispatch(coord), Admission::AlreadyBuilding);
    assert_eq!(strata.scheduler().len(), 1);
    assert_eq!(strata.provider().admission().in_flight(), 1);

    strata.run_until_idle(1_000);
    assert_eq!(strata.dispatch(coord), Admission::Finished);
}

/// Test: An unloaded target bails the chunk at its last recorded stage; a
/// later dispatch resumes and finishes it.
#[test]
fn test_bail_then_resume() {
    let coord = ChunkCoord::new(1, 0);
    let mut world = MemoryWorld::default();
    world.unload_chunk(coord);
    let mut strata = runtime(
        GenerationConfig::default(),
        grass_only(),
        world,
        Arc::new(MemoryStore::new()),
    );

    assert_eq!(strata.dispatch(coord), Admission::Admitted);
    strata.run_until_idle(1_000);

    let provider = strata.provider();
    assert_eq!(provider.stages().get(coord), BuildStage::BaseLayer);
    assert!(!provider.admission().is_building(coord));
    assert_eq!(provider.admission().in_flight(), 0);
    assert_eq!(provider.counters().placement_failures, 1);

    strata.provider_mut().world_mut().load_chunk(coord);
    assert_eq!(strata.dispatch(coord), Admission::Admitted);
    strata.run_until_idle(1_000);
    assert!(strata.provider().stages().is_finished(coord));
    assert!(strata.provider().world().blocks_in_chunk(coord) >= 256);
}

/// Test: A restart resumes at the persisted stage instead of starting over.
#[test]
fn test_restart_resumes_mid_ladder() {
    let store = Arc::new(MemoryStore::new());
    let coord = ChunkCoord::new(0, 0);
    let config = GenerationConfig {
        steps_per_tick: 20,
        ..GenerationConfig::default()
    };

    let mut first = runtime(config.clone(), grass_only(), MemoryWorld::default(), Arc::clone(&store));
    first.dispatch(coord);
    first.tick();
    // One step for the record, sixteen rows of surface, three of downfill.
    assert_eq!(first.provider().stages().get(coord), BuildStage::DownStack);
    first.execute(strata::Command::SaveProgress).unwrap();
    drop(first);

    let mut second = runtime(config, grass_only(), MemoryWorld::default(), store);
    assert_eq!(second.provider().stages().get(coord), BuildStage::DownStack);
    assert_eq!(second.dispatch(coord), Admission::Admitted);
    second.run_until_idle(1_000);
    assert!(second.provider().stages().is_finished(coord));
}

/// Test: Finished chunks survive a restart and are never dispatched again.
#[test]
fn test_finished_chunks_persist_when_last_observer_leaves() {
    let store = Arc::new(MemoryStore::new());
    let config = GenerationConfig {
        chunk_range: 1,
        ..GenerationConfig::default()
    };
    let mut first = runtime(
        config.clone(),
        grass_only(),
        observed_world(BlockPos::new(0, 80, 0)),
        Arc::clone(&store),
    );
    first.run_until_idle(1_000);
    assert_eq!(first.provider().stages().finished_count(), 4);
    first.observer_left(0).unwrap();

    let mut second = runtime(config, grass_only(), MemoryWorld::default(), store);
    assert_eq!(second.provider().stages().finished_count(), 4);
    assert_eq!(second.dispatch(ChunkCoord::new(-1, -1)), Admission::Finished);
}

/// Test: The stage map autosaves on the configured interval.
#[test]
fn test_autosave_interval() {
    let store = Arc::new(MemoryStore::new());
    let config = GenerationConfig {
        autosave_interval_ticks: 3,
        ..GenerationConfig::default()
    };
    let mut strata = runtime(config, grass_only(), MemoryWorld::default(), Arc::clone(&store));
    strata.dispatch(ChunkCoord::new(0, 0));

    strata.tick();
    strata.tick();
    assert!(store.get(&format!("{STAGE_MAP_KEY}_count")).is_none());
    strata.tick();
    assert!(store.get(&format!("{STAGE_MAP_KEY}_count")).is_some());
    assert!(!strata.provider().stages().is_dirty());
}

/// Test: Eviction never removes a chunk that is still building.
#[test]
fn test_eviction_pins_working_set() {
    let mut strata = runtime(
        GenerationConfig::default(),
        grass_only(),
        MemoryWorld::default(),
        Arc::new(MemoryStore::new()),
    );
    let building = [ChunkCoord::new(0, 0), ChunkCoord::new(1, 0)];
    for coord in building {
        strata.dispatch(coord);
    }
    // First step of each builder populates its record.
    strata.tick();

    let report = strata
        .provider_mut()
        .evict(ChunkCoord::new(500, 500), 0.0);
    assert_eq!(report.removed, 0);
    for coord in building {
        assert!(strata.provider().cache().contains(coord));
    }

    strata.run_until_idle(1_000);
    let report = strata
        .provider_mut()
        .evict(ChunkCoord::new(500, 500), 0.0);
    assert_eq!(report.removed, 2);
    assert!(strata.provider().cache().is_empty());
}

/// Test: A small clear limit triggers eviction passes during generation
/// and generation still completes.
#[test]
fn test_tick_triggers_eviction() {
    let config = GenerationConfig {
        chunk_range: 2,
        max_cached_chunks: Some(4),
        ..GenerationConfig::default()
    };
    let mut strata = runtime(
        config,
        grass_only(),
        observed_world(BlockPos::new(0, 80, 0)),
        Arc::new(MemoryStore::new()),
    );
    strata.run_until_idle(10_000);
    strata.tick();

    let provider = strata.provider();
    println!(
        "eviction passes: {}, chunks evicted: {}",
        provider.eviction().passes(),
        provider.counters().evicted_chunks
    );
    assert_eq!(provider.stages().finished_count(), 16);
    assert!(provider.eviction().passes() >= 1);
    assert!(provider.cache().total_cache_size() <= 16);
}

/// Test: Re-applying config clears the cache but keeps progress.
#[test]
fn test_config_change_keeps_progress() {
    let mut strata = runtime(
        GenerationConfig::default(),
        grass_only(),
        MemoryWorld::default(),
        Arc::new(MemoryStore::new()),
    );
    strata.dispatch(ChunkCoord::new(0, 0));
    strata.run_until_idle(1_000);

    let mut config = strata.provider().config().clone();
    config.terrain.amplitude = 30.0;
    strata.provider_mut().apply_config(config).unwrap();

    assert!(strata.provider().cache().is_empty());
    assert!(strata.provider().stages().is_finished(ChunkCoord::new(0, 0)));
}
