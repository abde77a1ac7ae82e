//! # Operator Command Tests
//!
//! Exercises the `strata:` command surface end to end, including the
//! banners sent on the operator notice channel.

use std::sync::Arc;

use strata::{
    config::names, Admission, Command, CommandOutcome, GenerationConfig, MemoryWorld,
    OperatorNotice, Strata, CONFIG_KEY,
};
use strata_core::{BlockPos, BlockSink, ChunkCoord, KeyValueStore, MemoryStore, TunableValue};
use strata_procedural::{BiomeDescriptor, Registry};

fn registry() -> Arc<Registry> {
    let mut registry = Registry::new();
    registry.add_biome(BiomeDescriptor::new("plains")).unwrap();
    registry.build_indexes().unwrap();
    Arc::new(registry)
}

fn runtime(config: GenerationConfig, store: Arc<MemoryStore>) -> Strata<MemoryWorld> {
    Strata::new(config, registry(), MemoryWorld::default(), store).unwrap()
}

fn run(strata: &mut Strata<MemoryWorld>, text: &str) -> CommandOutcome {
    strata.execute(Command::parse(text).unwrap()).unwrap()
}

/// Test: `config` returns the operator schema with current values.
#[test]
fn test_config_snapshot() {
    let config = GenerationConfig {
        chunk_range: 9,
        ..GenerationConfig::default()
    };
    let mut strata = runtime(config, Arc::new(MemoryStore::new()));
    let CommandOutcome::Schema(schema) = run(&mut strata, "strata:config") else {
        panic!("expected a schema");
    };
    assert_eq!(schema.get_int(names::CHUNK_RANGE), Some(9));
    assert_eq!(schema.get_text(names::MAX_CACHED), Some(""));
    assert_eq!(schema.entries().len(), 12);
}

/// Test: `clear_jobs` unblocks a saturated admission controller.
#[test]
fn test_clear_jobs_resets_admission() {
    let config = GenerationConfig {
        max_building_chunks: 1,
        ..GenerationConfig::default()
    };
    let mut strata = runtime(config, Arc::new(MemoryStore::new()));
    assert_eq!(strata.dispatch(ChunkCoord::new(0, 0)), Admission::Admitted);
    assert_eq!(strata.dispatch(ChunkCoord::new(0, 1)), Admission::Saturated);

    assert_eq!(run(&mut strata, "strata:clear_jobs"), CommandOutcome::JobsCleared(1));
    assert!(strata.scheduler().is_empty());
    assert_eq!(strata.provider().admission().in_flight(), 0);
    assert_eq!(strata.dispatch(ChunkCoord::new(0, 1)), Admission::Admitted);
}

/// Test: `dropcache` empties cache, working set and stage map, with banners.
#[test]
fn test_dropcache() {
    let mut strata = runtime(GenerationConfig::default(), Arc::new(MemoryStore::new()));
    strata.dispatch(ChunkCoord::new(0, 0));
    strata.dispatch(ChunkCoord::new(3, 3));
    strata.run_until_idle(1_000);
    strata.dispatch(ChunkCoord::new(7, 7));
    strata.tick();
    assert!(!strata.provider().cache().is_empty());

    let outcome = run(&mut strata, "strata:dropcache");
    assert!(matches!(outcome, CommandOutcome::Evicted(report) if report.kept == 0));
    let provider = strata.provider();
    assert!(provider.cache().is_empty());
    assert!(provider.stages().is_empty());
    assert_eq!(provider.admission().in_flight(), 0);
    assert!(strata.scheduler().is_empty());

    let notices = strata.notices().drain();
    assert!(matches!(notices.first(), Some(OperatorNotice::Started(_))));
    assert!(matches!(notices.last(), Some(OperatorNotice::Finished(_))));
}

/// Test: `cache` keeps the half of the cache nearest the primary observer.
#[test]
fn test_partial_cache_drop() {
    let mut strata = runtime(GenerationConfig::default(), Arc::new(MemoryStore::new()));
    for x in 0..4 {
        strata.dispatch(ChunkCoord::new(x, 0));
    }
    strata.run_until_idle(1_000);
    strata
        .provider_mut()
        .world_mut()
        .set_observers(vec![BlockPos::new(0, 80, 0)]);

    let CommandOutcome::Evicted(report) = run(&mut strata, "strata:cache") else {
        panic!("expected an eviction report");
    };
    assert_eq!(report.kept, 2);
    assert!(strata.provider().cache().contains(ChunkCoord::new(0, 0)));
    assert!(strata.provider().cache().contains(ChunkCoord::new(1, 0)));
}

/// Test: `force_save` / `delete_config` / `force_load` round-trip.
#[test]
fn test_force_save_and_load() {
    let store = Arc::new(MemoryStore::new());
    let mut strata = runtime(GenerationConfig::default(), Arc::clone(&store));
    let mut config = strata.provider().config().clone();
    config
        .set_tunable(names::OCTAVES, TunableValue::Int(2))
        .unwrap();
    strata.provider_mut().apply_config(config).unwrap();

    run(&mut strata, "strata:force_save");
    assert!(store.get(&format!("{CONFIG_KEY}_count")).is_some());

    let mut fresh = runtime(GenerationConfig::default(), Arc::clone(&store));
    assert_eq!(fresh.provider().config().terrain.octaves, 2);

    run(&mut fresh, "strata:delete_config");
    assert!(store.get(&format!("{CONFIG_KEY}_count")).is_none());
    run(&mut fresh, "strata:force_load");
    let notices = fresh.notices().drain();
    assert!(notices.contains(&OperatorNotice::Info("no saved config".to_owned())));
}

/// Test: `clear_area` fills the box with air over several steps and
/// skips positions it cannot write.
#[test]
fn test_clear_area_job() {
    let mut strata = runtime(GenerationConfig::default(), Arc::new(MemoryStore::new()));
    {
        let world = strata.provider_mut().world_mut();
        for x in 0..12 {
            world.set_block(BlockPos::new(x, 70, 20), "stone").unwrap();
        }
        world.unload_chunk(ChunkCoord::new(-1, 1));
    }

    let outcome = run(&mut strata, "strata:clear_area -3 70 20 11 70 20");
    assert!(matches!(outcome, CommandOutcome::Queued(_)));
    strata.tick();
    assert!(strata.scheduler().is_empty());

    assert_eq!(strata.provider().world().block_count(), 0);
    let notices = strata.notices().drain();
    let Some(OperatorNotice::Finished(text)) = notices.last() else {
        panic!("expected a finish banner, got {notices:?}");
    };
    assert!(text.contains("3 skipped"), "{text}");
}

/// Test: `force_load` cancels live builders before restoring a stage map
/// that is already ahead of them.
#[test]
fn test_force_load_over_running_builder() {
    let coord = ChunkCoord::new(0, 0);
    let config = GenerationConfig {
        steps_per_tick: 2,
        ..GenerationConfig::default()
    };
    let mut strata = runtime(config, Arc::new(MemoryStore::new()));
    strata.dispatch(coord);
    strata.run_until_idle(1_000);
    assert!(strata.provider().stages().is_finished(coord));
    run(&mut strata, "strata:force_save");
    run(&mut strata, "strata:dropcache");

    assert_eq!(strata.dispatch(coord), Admission::Admitted);
    strata.tick();
    strata.tick();
    let before = strata.provider().stages().get(coord);
    println!("stage before force_load: {before:?}");
    assert!(!strata.provider().stages().is_finished(coord));

    run(&mut strata, "strata:force_load");
    assert!(strata.scheduler().is_empty());
    assert_eq!(strata.provider().admission().in_flight(), 0);
    assert!(strata.provider().stages().is_finished(coord));

    strata.run_until_idle(1_000);
    assert_eq!(strata.dispatch(coord), Admission::Finished);
}
