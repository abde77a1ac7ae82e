//! # Chunk Builder
//!
//! Resumable per-chunk state machine. One [`ChunkBuildJob`] exists per
//! chunk in the working set; it starts at the chunk's recorded stage and
//! climbs the ladder one row of columns per scheduler step.
//!
//! ```text
//! None       ensure the column record exists
//! BaseLayer  surface block(s) per column, support block beneath
//! DownStack  fill down to the lowest 4-neighbour
//! Decorate   biome decorator at the surface
//! Structure  structure rolls, skipping claimed columns
//! HardSurface  surface pass again, only after structures were placed
//! ```
//!
//! Finishing a stage records the next one in the stage map before the
//! step returns, so an interrupted build resumes at the stage it was in.
//! Every stage starts by reseeding its RNG from the chunk key, which makes
//! a re-run stage replay the same rolls and write the same blocks.
//!
//! A failed write bails the chunk: it is released from the working set at
//! its last recorded stage and the job ends. Structures are the exception;
//! a structure spilling into an unloaded neighbour is logged by the
//! registry and the scan continues.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use strata_core::{BlockPos, BlockSink, ChunkCoord, ChunkLayout, PlacementResult};
use strata_procedural::{BiomeDescriptor, ColumnNoiseRecord, NoiseSampler, WorldSeed};

use crate::host::WorldHost;
use crate::provider::GenerationProvider;
use crate::scheduler::{Job, JobStep};
use crate::stage::BuildStage;

/// Purpose constant for decoration and structure rolls.
pub const DECOR_PURPOSE: u64 = 0x5EED_DEC0 + 0x0A7;

const NEIGHBOURS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Builder for one chunk.
pub struct ChunkBuildJob {
    coord: ChunkCoord,
    stage: BuildStage,
    row: usize,
    claimed: Vec<bool>,
    structures_placed: usize,
    resumed_into_hard_surface: bool,
    rng: ChaCha8Rng,
}

impl ChunkBuildJob {
    /// Builder for `coord` resuming at `stage`.
    #[must_use]
    pub fn new(coord: ChunkCoord, stage: BuildStage) -> Self {
        Self {
            coord,
            stage,
            row: 0,
            claimed: Vec::new(),
            structures_placed: 0,
            resumed_into_hard_surface: stage == BuildStage::HardSurface,
            rng: ChaCha8Rng::seed_from_u64(0),
        }
    }

    /// Chunk being built.
    #[must_use]
    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Stage currently executing.
    #[must_use]
    pub fn stage(&self) -> BuildStage {
        self.stage
    }

    fn stage_seed(&self, seed: WorldSeed) -> u64 {
        seed.derive(DECOR_PURPOSE).value() ^ self.coord.key().raw() ^ (self.stage as u64)
    }

    fn wants_resurface<W: WorldHost>(&self, provider: &GenerationProvider<W>) -> bool {
        provider.config.resurface_after_structures
            && (self.structures_placed > 0 || self.resumed_into_hard_surface)
    }

    /// Records the next stage, or finishes the chunk after the last one.
    fn advance<W: WorldHost>(&mut self, provider: &mut GenerationProvider<W>) -> JobStep {
        match self.stage.next() {
            Some(BuildStage::Finished) | None => {
                provider.finish_chunk(self.coord, self.stage);
                JobStep::Done
            }
            Some(next) => {
                provider.stages.advance(self.coord, next);
                self.stage = next;
                self.row = 0;
                JobStep::Continue
            }
        }
    }

    /// Runs the current stage on local row `x`.
    fn run_row<W: WorldHost>(
        &mut self,
        provider: &mut GenerationProvider<W>,
        x: usize,
    ) -> PlacementResult<()> {
        let layout = provider.layout;
        let edge = usize::from(layout.edge());
        let (origin_x, origin_z) = layout.origin(self.coord);
        let record = provider
            .cache
            .get_or_build(self.coord, &provider.sampler, &provider.classifier);
        let registry = &provider.registry;
        let world = &mut provider.world;

        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let wx = origin_x + x as i32;

        for z in 0..edge {
            let local = layout.local_index(x, z);
            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            let wz = origin_z + z as i32;
            let height = i32::from(record.height(local));
            let biome = registry.biome(record.biome(local));
            let surface = BlockPos::new(wx, height, wz);

            match self.stage {
                BuildStage::BaseLayer | BuildStage::HardSurface => {
                    place_surface(&mut *world, biome, surface)?;
                }
                BuildStage::DownStack => {
                    let lowest = lowest_neighbour(record, &provider.sampler, layout, (x, z), (wx, wz));
                    fill_down(&mut *world, biome, surface, lowest)?;
                }
                BuildStage::Decorate => {
                    if let Some(decorator) = &biome.decorator {
                        decorator.decorate(surface, &mut *world, &mut self.rng)?;
                    }
                }
                BuildStage::Structure => {
                    if self.claimed.get(local).copied().unwrap_or(false) {
                        continue;
                    }
                    let placed = registry.spawn_structure(
                        record.biome(local),
                        surface,
                        &mut *world,
                        &mut self.rng,
                    );
                    if let Some(structure) = placed {
                        self.structures_placed += 1;
                        let exclusion = structure.exclusion;
                        claim(&mut self.claimed, edge, (x, z), exclusion.low, exclusion.high);
                    }
                }
                BuildStage::None | BuildStage::Finished => {}
            }
        }
        Ok(())
    }
}

impl<W: WorldHost> Job<GenerationProvider<W>> for ChunkBuildJob {
    fn label(&self) -> String {
        format!("build {} at {:?}", self.coord, self.stage)
    }

    fn step(&mut self, provider: &mut GenerationProvider<W>) -> JobStep {
        match self.stage {
            BuildStage::None => {
                provider
                    .cache
                    .get_or_build(self.coord, &provider.sampler, &provider.classifier);
                self.advance(provider)
            }
            BuildStage::Finished => {
                provider.admission.release(self.coord);
                JobStep::Done
            }
            BuildStage::HardSurface if !self.wants_resurface(provider) => self.advance(provider),
            _ => {
                let edge = usize::from(provider.layout.edge());
                if self.row == 0 {
                    self.rng = ChaCha8Rng::seed_from_u64(self.stage_seed(provider.config.seed));
                    if self.stage == BuildStage::Structure {
                        self.claimed = vec![false; provider.layout.columns()];
                    }
                }
                match self.run_row(provider, self.row) {
                    Ok(()) => {
                        self.row += 1;
                        if self.row >= edge {
                            self.advance(provider)
                        } else {
                            JobStep::Continue
                        }
                    }
                    Err(error) => {
                        provider.bail_generation(self.coord, &error);
                        JobStep::Done
                    }
                }
            }
        }
    }
}

/// Surface block(s) at `surface` and below, plus the support block.
fn place_surface(
    world: &mut dyn BlockSink,
    biome: &BiomeDescriptor,
    surface: BlockPos,
) -> PlacementResult<()> {
    let depth = i32::from(biome.layers.depth());
    for d in 0..depth {
        world.set_block(BlockPos::new(surface.x, surface.y - d, surface.z), &biome.surface_block)?;
    }
    if biome.surface_needs_support {
        world.set_block(
            BlockPos::new(surface.x, surface.y - depth, surface.z),
            &biome.underground_block,
        )?;
    }
    Ok(())
}

/// Underground blocks below the surface layers while a neighbour column
/// is still lower.
fn fill_down(
    world: &mut dyn BlockSink,
    biome: &BiomeDescriptor,
    surface: BlockPos,
    lowest_neighbour: i32,
) -> PlacementResult<()> {
    let mut offset = biome.surface_offset() + 1;
    while lowest_neighbour < surface.y - offset {
        world.set_block(
            BlockPos::new(surface.x, surface.y - offset, surface.z),
            &biome.underground_block,
        )?;
        offset += 1;
    }
    Ok(())
}

/// Lowest of the four neighbour heights. Neighbours outside the chunk are
/// sampled directly so no neighbour record gets built.
fn lowest_neighbour(
    record: &ColumnNoiseRecord,
    sampler: &NoiseSampler,
    layout: ChunkLayout,
    (x, z): (usize, usize),
    (wx, wz): (i32, i32),
) -> i32 {
    let edge = usize::from(layout.edge());
    NEIGHBOURS
        .iter()
        .map(|&(dx, dz)| {
            let inside = x
                .checked_add_signed(dx as isize)
                .zip(z.checked_add_signed(dz as isize))
                .filter(|&(nx, nz)| nx < edge && nz < edge);
            match inside {
                Some((nx, nz)) => i32::from(record.height(layout.local_index(nx, nz))),
                None => i32::from(sampler.height(wx + dx, wz + dz)),
            }
        })
        .min()
        .unwrap_or(i32::MIN)
}

/// Marks the exclusion footprint around local column `(x, z)` as claimed.
fn claim(claimed: &mut [bool], edge: usize, (x, z): (usize, usize), low: (i32, i32), high: (i32, i32)) {
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let (x, z, edge) = (x as i32, z as i32, edge as i32);
    for cx in (x - low.0).max(0)..=(x + high.0).min(edge - 1) {
        for cz in (z - low.1).max(0)..=(z + high.1).min(edge - 1) {
            #[allow(clippy::cast_sign_loss)]
            let index = (cx * edge + cz) as usize;
            if let Some(slot) = claimed.get_mut(index) {
                *slot = true;
            }
        }
    }
}
