//! # Standard Content
//!
//! The stock biome and structure set:
//!
//! | Id         | Kind      | Notes                                             |
//! |------------|-----------|---------------------------------------------------|
//! | `plains`   | biome     | grass over dirt, short and tall grass             |
//! | `desert`   | biome     | three layers of sand on sandstone, dead bushes    |
//! | `oak_tree` | structure | plains only, 1% per roll, 5-block trunk + canopy  |

use std::sync::Arc;

use rand::{Rng, RngCore};
use strata_core::{BlockPos, BlockSink, PlacementResult, RegistryResult};
use strata_procedural::{
    BiomeDescriptor, Decorator, Exclusion, Registry, StructureDescriptor, StructurePlacer,
    SurfaceLayers,
};

/// Short and tall grass on top of plains columns.
#[derive(Debug, Default, Clone, Copy)]
pub struct GrassDecorator;

impl Decorator for GrassDecorator {
    fn decorate(
        &self,
        surface: BlockPos,
        world: &mut dyn BlockSink,
        rng: &mut dyn RngCore,
    ) -> PlacementResult<()> {
        let roll: f32 = rng.gen();
        let above = BlockPos::new(surface.x, surface.y + 1, surface.z);
        if roll > 0.96 {
            world.set_block(above, "tall_grass")
        } else if roll > 0.86 {
            world.set_block(above, "short_grass")
        } else {
            Ok(())
        }
    }
}

/// Dead bushes on desert columns.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeadBushDecorator;

impl Decorator for DeadBushDecorator {
    fn decorate(
        &self,
        surface: BlockPos,
        world: &mut dyn BlockSink,
        rng: &mut dyn RngCore,
    ) -> PlacementResult<()> {
        let roll: f32 = rng.gen();
        if roll > 0.9 {
            world.set_block(BlockPos::new(surface.x, surface.y + 1, surface.z), "dead_bush")?;
        }
        Ok(())
    }
}

/// Height of the oak trunk.
pub const OAK_TRUNK: i32 = 5;

/// Oak: a log trunk with a two-tier leaf canopy.
#[derive(Debug, Default, Clone, Copy)]
pub struct OakTree;

impl StructurePlacer for OakTree {
    fn place(
        &self,
        surface: BlockPos,
        world: &mut dyn BlockSink,
        _rng: &mut dyn RngCore,
    ) -> PlacementResult<()> {
        let base = surface.y + 1;
        let top = base + OAK_TRUNK - 1;

        // Wide tier around the upper trunk, corners trimmed.
        for y in top - 2..=top - 1 {
            for dx in -2..=2_i32 {
                for dz in -2..=2_i32 {
                    if (dx, dz) == (0, 0) || (dx.abs() == 2 && dz.abs() == 2) {
                        continue;
                    }
                    world.set_block(BlockPos::new(surface.x + dx, y, surface.z + dz), "oak_leaves")?;
                }
            }
        }
        // Narrow tier and cap.
        for dx in -1..=1_i32 {
            for dz in -1..=1_i32 {
                if (dx, dz) != (0, 0) {
                    world.set_block(BlockPos::new(surface.x + dx, top, surface.z + dz), "oak_leaves")?;
                }
            }
        }
        world.set_block(BlockPos::new(surface.x, top + 1, surface.z), "oak_leaves")?;

        for y in base..=top {
            world.set_block(BlockPos::new(surface.x, y, surface.z), "oak_log")?;
        }
        Ok(())
    }
}

/// Plains biome descriptor.
#[must_use]
pub fn plains() -> BiomeDescriptor {
    BiomeDescriptor::new("plains")
        .blocks("grass", "dirt", "stone")
        .surface(SurfaceLayers::Single, false)
        .bias(0.5, 0.5, 1.0 / 3.0)
        .decorator(Arc::new(GrassDecorator))
}

/// Desert biome descriptor.
#[must_use]
pub fn desert() -> BiomeDescriptor {
    BiomeDescriptor::new("desert")
        .blocks("sand", "sandstone", "stone")
        .surface(SurfaceLayers::Multi(3), true)
        .bias(0.9, 0.1, 1.0 / 3.0)
        .decorator(Arc::new(DeadBushDecorator))
}

/// Oak tree structure descriptor.
#[must_use]
pub fn oak_tree() -> StructureDescriptor {
    StructureDescriptor {
        id: "oak_tree".to_owned(),
        size: (5, 5),
        biomes: vec!["plains".to_owned()],
        spawn_weight: 0.01,
        exclusion: Exclusion {
            low: (2, 2),
            high: (2, 2),
        },
        placer: Arc::new(OakTree),
    }
}

/// Sealed registry holding the standard content.
///
/// # Errors
///
/// Only on registry misuse, which the fixed content never triggers.
pub fn standard_registry() -> RegistryResult<Registry> {
    let mut registry = Registry::new();
    registry.add_biome(plains())?;
    registry.add_biome(desert())?;
    registry.add_structure(oak_tree())?;
    registry.build_indexes()?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::host::MemoryWorld;

    #[test]
    fn test_standard_registry() {
        let registry = standard_registry().unwrap();
        assert!(registry.is_sealed());
        assert_eq!(registry.biome_index("plains"), Some(0));
        assert_eq!(registry.biome_index("desert"), Some(1));
        assert_eq!(registry.structures_for(0).count(), 1);
        assert_eq!(registry.structures_for(1).count(), 0);
        assert_eq!(desert().surface_offset(), 3);
    }

    #[test]
    fn test_oak_tree_shape() {
        let mut world = MemoryWorld::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        OakTree
            .place(BlockPos::new(0, 64, 0), &mut world, &mut rng)
            .unwrap();
        for y in 65..70 {
            assert_eq!(world.block_at(BlockPos::new(0, y, 0)), Some("oak_log"));
        }
        assert_eq!(world.block_at(BlockPos::new(0, 70, 0)), Some("oak_leaves"));
        assert_eq!(world.block_at(BlockPos::new(2, 67, 1)), Some("oak_leaves"));
        assert_eq!(world.block_at(BlockPos::new(2, 67, 2)), None);
    }

    #[test]
    fn test_decorators_stay_in_their_bands() {
        let mut world = MemoryWorld::default();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for x in 0..400 {
            GrassDecorator
                .decorate(BlockPos::new(x, 70, 0), &mut world, &mut rng)
                .unwrap();
        }
        let placed = world.block_count();
        println!("grass placed on {placed} of 400 columns");
        assert!(placed > 10 && placed < 100);
        for x in 0..400 {
            if let Some(block) = world.block_at(BlockPos::new(x, 71, 0)) {
                assert!(block == "short_grass" || block == "tall_grass");
            }
        }
    }
}
