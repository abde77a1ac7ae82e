//! # Biome and Structure Registry
//!
//! Descriptors are plain data plus a capability trait object:
//! [`Decorator`] for per-column biome decoration and [`StructurePlacer`]
//! for structures. Registration is closed-world:
//!
//! ```text
//! add_biome / add_structure ... ──> build_indexes() ──> sealed
//!                                        │
//!                                        └─ biome index → eligible structures
//! ```
//!
//! Adding entries after [`Registry::build_indexes`] is rejected.

use std::fmt;
use std::sync::Arc;

use rand::{Rng, RngCore};
use strata_core::{BlockPos, BlockSink, PlacementResult, RegistryError, RegistryResult};
use tracing::{debug, warn};

/// Per-column decoration capability of a biome.
pub trait Decorator: Send + Sync {
    /// Decorates the column whose surface block is at `surface`.
    ///
    /// # Errors
    ///
    /// Propagates placement failures so the chunk stage can bail.
    fn decorate(
        &self,
        surface: BlockPos,
        world: &mut dyn BlockSink,
        rng: &mut dyn RngCore,
    ) -> PlacementResult<()>;
}

/// Placement capability of a structure.
pub trait StructurePlacer: Send + Sync {
    /// Places the structure with its anchor on top of `surface`.
    ///
    /// # Errors
    ///
    /// The first failed write. Blocks written before it stay in place.
    fn place(
        &self,
        surface: BlockPos,
        world: &mut dyn BlockSink,
        rng: &mut dyn RngCore,
    ) -> PlacementResult<()>;
}

/// Surface layering of a biome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceLayers {
    /// One surface block on top of the column.
    Single,
    /// `depth` surface blocks stacked down from the top.
    Multi(u8),
}

impl SurfaceLayers {
    /// Number of surface blocks written per column.
    #[must_use]
    pub fn depth(self) -> u8 {
        match self {
            Self::Single => 1,
            Self::Multi(depth) => depth.max(1),
        }
    }
}

/// Biome registry entry.
#[derive(Clone)]
pub struct BiomeDescriptor {
    /// Unique id.
    pub id: String,
    /// Top block.
    pub surface_block: String,
    /// Block used for support and downfill.
    pub underground_block: String,
    /// Block used for cave walls.
    pub cave_block: String,
    /// Whether the surface needs an underground block beneath it.
    pub surface_needs_support: bool,
    /// Surface layering.
    pub layers: SurfaceLayers,
    /// Target climate in [0, 1].
    pub climate_bias: f32,
    /// Target moisture in [0, 1].
    pub moisture_bias: f32,
    /// Target height band in [0, 1].
    pub height_bias: f32,
    /// Decoration capability.
    pub decorator: Option<Arc<dyn Decorator>>,
}

impl fmt::Debug for BiomeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BiomeDescriptor")
            .field("id", &self.id)
            .field("surface_block", &self.surface_block)
            .field("layers", &self.layers)
            .field("climate_bias", &self.climate_bias)
            .field("moisture_bias", &self.moisture_bias)
            .field("height_bias", &self.height_bias)
            .field("decorated", &self.decorator.is_some())
            .finish_non_exhaustive()
    }
}

impl BiomeDescriptor {
    /// Biome with stone/dirt/grass defaults and centred biases.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_owned(),
            surface_block: "grass".to_owned(),
            underground_block: "dirt".to_owned(),
            cave_block: "stone".to_owned(),
            surface_needs_support: false,
            layers: SurfaceLayers::Single,
            climate_bias: 0.5,
            moisture_bias: 0.5,
            height_bias: 0.0,
            decorator: None,
        }
    }

    /// Sets surface, underground, and cave blocks.
    #[must_use]
    pub fn blocks(mut self, surface: &str, underground: &str, cave: &str) -> Self {
        self.surface_block = surface.to_owned();
        self.underground_block = underground.to_owned();
        self.cave_block = cave.to_owned();
        self
    }

    /// Sets surface layering and support.
    #[must_use]
    pub fn surface(mut self, layers: SurfaceLayers, needs_support: bool) -> Self {
        self.layers = layers;
        self.surface_needs_support = needs_support;
        self
    }

    /// Sets the classification target.
    #[must_use]
    pub fn bias(mut self, climate: f32, moisture: f32, height: f32) -> Self {
        self.climate_bias = climate;
        self.moisture_bias = moisture;
        self.height_bias = height;
        self
    }

    /// Attaches a decoration capability.
    #[must_use]
    pub fn decorator(mut self, decorator: Arc<dyn Decorator>) -> Self {
        self.decorator = Some(decorator);
        self
    }

    /// Blocks below the top already written by the base layer.
    #[must_use]
    pub fn surface_offset(&self) -> i32 {
        i32::from(self.layers.depth()) - 1 + i32::from(self.surface_needs_support)
    }
}

/// Columns around a placed structure where further spawns are suppressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Exclusion {
    /// Extent towards negative x/z.
    pub low: (i32, i32),
    /// Extent towards positive x/z.
    pub high: (i32, i32),
}

/// Structure registry entry.
#[derive(Clone)]
pub struct StructureDescriptor {
    /// Unique id.
    pub id: String,
    /// Footprint in columns (x, z).
    pub size: (u8, u8),
    /// Ids of biomes the structure may spawn in.
    pub biomes: Vec<String>,
    /// Spawn probability once selected, in [0, 1].
    pub spawn_weight: f32,
    /// Spawn suppression footprint.
    pub exclusion: Exclusion,
    /// Placement capability.
    pub placer: Arc<dyn StructurePlacer>,
}

impl fmt::Debug for StructureDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructureDescriptor")
            .field("id", &self.id)
            .field("size", &self.size)
            .field("biomes", &self.biomes)
            .field("spawn_weight", &self.spawn_weight)
            .field("exclusion", &self.exclusion)
            .finish_non_exhaustive()
    }
}

/// Ordered biome and structure registry.
#[derive(Debug, Default)]
pub struct Registry {
    biomes: Vec<BiomeDescriptor>,
    structures: Vec<StructureDescriptor>,
    by_biome: Vec<Vec<usize>>,
    sealed: bool,
}

impl Registry {
    /// Creates an empty, unsealed registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a biome and returns its index.
    ///
    /// # Errors
    ///
    /// Registry sealed or id already taken.
    pub fn add_biome(&mut self, biome: BiomeDescriptor) -> RegistryResult<u16> {
        if self.sealed {
            return Err(RegistryError::Sealed(biome.id));
        }
        if self.biome_index(&biome.id).is_some() {
            return Err(RegistryError::DuplicateId(biome.id));
        }
        let index = u16::try_from(self.biomes.len()).map_err(|_| RegistryError::IndexOutOfRange {
            index: self.biomes.len(),
            count: usize::from(u16::MAX),
        })?;
        self.biomes.push(biome);
        Ok(index)
    }

    /// Registers a structure.
    ///
    /// # Errors
    ///
    /// Registry sealed or id already taken.
    pub fn add_structure(&mut self, structure: StructureDescriptor) -> RegistryResult<()> {
        if self.sealed {
            return Err(RegistryError::Sealed(structure.id));
        }
        if self.structures.iter().any(|s| s.id == structure.id) {
            return Err(RegistryError::DuplicateId(structure.id));
        }
        self.structures.push(structure);
        Ok(())
    }

    /// Builds the biome → structures index and seals the registry.
    ///
    /// # Errors
    ///
    /// No biomes registered, or a structure names an unknown biome.
    pub fn build_indexes(&mut self) -> RegistryResult<()> {
        if self.biomes.is_empty() {
            return Err(RegistryError::Empty);
        }
        let mut by_biome = vec![Vec::new(); self.biomes.len()];
        for (structure_index, structure) in self.structures.iter().enumerate() {
            for biome_id in &structure.biomes {
                let biome = self
                    .biome_index(biome_id)
                    .ok_or_else(|| RegistryError::UnknownBiome {
                        structure: structure.id.clone(),
                        biome: biome_id.clone(),
                    })?;
                by_biome[usize::from(biome)].push(structure_index);
            }
        }
        self.by_biome = by_biome;
        self.sealed = true;
        debug!(
            biomes = self.biomes.len(),
            structures = self.structures.len(),
            "registry sealed"
        );
        Ok(())
    }

    /// Whether [`Self::build_indexes`] has run.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Number of registered biomes.
    #[must_use]
    pub fn biome_count(&self) -> usize {
        self.biomes.len()
    }

    /// All biomes in registration order.
    #[must_use]
    pub fn biomes(&self) -> &[BiomeDescriptor] {
        &self.biomes
    }

    /// All structures in registration order.
    #[must_use]
    pub fn structures(&self) -> &[StructureDescriptor] {
        &self.structures
    }

    /// Index of the biome with `id`.
    #[must_use]
    pub fn biome_index(&self, id: &str) -> Option<u16> {
        self.biomes
            .iter()
            .position(|b| b.id == id)
            .and_then(|i| u16::try_from(i).ok())
    }

    /// Biome at `index`.
    ///
    /// # Errors
    ///
    /// Index outside the registry.
    pub fn try_biome(&self, index: u16) -> RegistryResult<&BiomeDescriptor> {
        self.biomes
            .get(usize::from(index))
            .ok_or(RegistryError::IndexOutOfRange {
                index: usize::from(index),
                count: self.biomes.len(),
            })
    }

    /// Biome at `index`.
    ///
    /// # Panics
    ///
    /// An out-of-range index is a logic error and panics.
    #[must_use]
    pub fn biome(&self, index: u16) -> &BiomeDescriptor {
        match self.try_biome(index) {
            Ok(biome) => biome,
            Err(err) => panic!("{err}"),
        }
    }

    /// Structures eligible in the biome at `index`.
    #[must_use]
    pub fn structures_for(&self, index: u16) -> impl Iterator<Item = &StructureDescriptor> {
        self.by_biome
            .get(usize::from(index))
            .into_iter()
            .flatten()
            .map(|&i| &self.structures[i])
    }

    /// Rolls for a structure on the column with surface block `surface`.
    ///
    /// Picks one eligible structure uniformly, then spawns it only if a
    /// second roll lands under its spawn weight. Returns the placed
    /// descriptor.
    ///
    /// A structure whose placer fails part way (typically a canopy reaching
    /// into an unloaded neighbour chunk) is logged and still reported as
    /// placed, so its footprint is claimed and the roll never retries.
    pub fn spawn_structure(
        &self,
        biome: u16,
        surface: BlockPos,
        world: &mut dyn BlockSink,
        rng: &mut dyn RngCore,
    ) -> Option<&StructureDescriptor> {
        let eligible = self.by_biome.get(usize::from(biome))?;
        if eligible.is_empty() {
            return None;
        }
        let pick = eligible[rng.gen_range(0..eligible.len())];
        let structure = &self.structures[pick];
        if rng.gen::<f32>() >= structure.spawn_weight {
            return None;
        }
        if let Err(error) = structure.placer.place(surface, world, rng) {
            warn!(structure = %structure.id, %surface, %error, "structure placed partially");
        }
        Some(structure)
    }
}
