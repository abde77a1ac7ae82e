//! # STRATA Headless
//!
//! Generates terrain around a fixed observer into an in-memory world and
//! prints progress. Useful for profiling and for checking a config file.
//!
//! ```bash
//! strata_headless                 # defaults
//! strata_headless strata.toml     # config from file
//! ```

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use strata::{content, GenerationConfig, MemoryWorld, Strata};
use strata_core::{BlockPos, ChunkLayout, MemoryStore};

const MAX_TICKS: u64 = 100_000;

fn main() -> ExitCode {
    println!("═══════════════════════════════════════════════════════════════════");
    println!("                    STRATA HEADLESS v{}", env!("CARGO_PKG_VERSION"));
    println!("═══════════════════════════════════════════════════════════════════");
    println!();

    let config = match std::env::args().nth(1) {
        Some(path) => match GenerationConfig::from_toml_file(Path::new(&path)) {
            Ok(config) => {
                println!("  Config:   {path} ✓");
                config
            }
            Err(e) => {
                eprintln!("  ✗ FATAL: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => {
            println!("  Config:   defaults");
            GenerationConfig::default()
        }
    };
    println!("  Seed:     {}", config.seed.value());
    println!("  Range:    {} chunks", config.chunk_range);
    println!("  Tier:     {:?}", config.memory_tier);
    println!();

    let registry = match content::standard_registry() {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            eprintln!("  ✗ FATAL: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut world = MemoryWorld::new(ChunkLayout::new(config.chunk_edge.max(1)));
    world.set_observers(vec![BlockPos::new(0, 80, 0)]);

    let mut strata = match Strata::new(config, registry, world, Arc::new(MemoryStore::new())) {
        Ok(strata) => strata,
        Err(e) => {
            eprintln!("  ✗ FATAL: {e}");
            return ExitCode::FAILURE;
        }
    };

    let start = Instant::now();
    let ticks = strata.run_until_idle(MAX_TICKS);
    let elapsed = start.elapsed();

    for notice in strata.notices().drain() {
        println!("  {notice}");
    }

    let provider = strata.provider();
    println!("🌍 Generation idle after {ticks} ticks ({elapsed:.2?})");
    println!("   Chunks finished: {}", provider.stages().finished_count());
    println!("   Blocks placed:   {}", provider.world().block_count());
    println!("   Jobs stepped:    {}", strata.scheduler().stats().steps);
    println!();
    print!("{}", provider.debug_overlay().render());

    if let Err(e) = strata.observer_left(0) {
        eprintln!("  ✗ Failed to save progress: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
