//! # Build Stages
//!
//! Every chunk climbs the same ladder exactly once:
//!
//! ```text
//! None → BaseLayer → DownStack → Decorate → Structure → HardSurface → Finished
//! ```
//!
//! The [`StageMap`] records, per chunk, the stage its builder resumes at.
//! Stages only move forward and `Finished` is terminal. The map persists
//! as `{"cx cz": "Stage"}` JSON through segmented storage so generation
//! resumes after a restart without redoing completed stages.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use strata_core::{ChunkCoord, ChunkKey, PersistResult, SegmentedStore};
use tracing::{info, warn};

/// Store key of the persisted stage map.
pub const STAGE_MAP_KEY: &str = "strata_stage_map";

/// One rung of the build ladder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BuildStage {
    /// Nothing done yet.
    #[default]
    None,
    /// Surface blocks per column.
    BaseLayer,
    /// Gap filling against lower neighbours.
    DownStack,
    /// Biome decoration.
    Decorate,
    /// Structure scan.
    Structure,
    /// Optional surface re-run after structures.
    HardSurface,
    /// Terminal.
    Finished,
}

impl BuildStage {
    /// The rung after this one.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::None => Some(Self::BaseLayer),
            Self::BaseLayer => Some(Self::DownStack),
            Self::DownStack => Some(Self::Decorate),
            Self::Decorate => Some(Self::Structure),
            Self::Structure => Some(Self::HardSurface),
            Self::HardSurface => Some(Self::Finished),
            Self::Finished => None,
        }
    }

    /// Whether the chunk is done.
    #[must_use]
    pub fn is_finished(self) -> bool {
        self == Self::Finished
    }
}

/// Per-chunk resume points.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StageMap {
    stages: HashMap<ChunkKey, BuildStage>,
    dirty: bool,
}

impl StageMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage recorded for `coord`; [`BuildStage::None`] if unseen.
    #[must_use]
    pub fn get(&self, coord: ChunkCoord) -> BuildStage {
        self.stages.get(&coord.key()).copied().unwrap_or_default()
    }

    /// Whether `coord` has finished.
    #[must_use]
    pub fn is_finished(&self, coord: ChunkCoord) -> bool {
        self.get(coord).is_finished()
    }

    /// Moves `coord` forward to `stage`.
    ///
    /// # Panics
    ///
    /// Moving a chunk backwards is a logic error and panics.
    pub fn advance(&mut self, coord: ChunkCoord, stage: BuildStage) {
        let current = self.get(coord);
        assert!(
            stage >= current,
            "stage of chunk {coord} cannot move back from {current:?} to {stage:?}"
        );
        if stage != current {
            self.stages.insert(coord.key(), stage);
            self.dirty = true;
        }
    }

    /// Number of tracked chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Number of finished chunks.
    #[must_use]
    pub fn finished_count(&self) -> usize {
        self.stages.values().filter(|s| s.is_finished()).count()
    }

    /// Whether the map changed since the last save or load.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Forgets every chunk.
    pub fn clear(&mut self) {
        if !self.stages.is_empty() {
            self.dirty = true;
        }
        self.stages.clear();
    }

    /// Canonical serializable form.
    #[must_use]
    pub fn to_entries(&self) -> BTreeMap<String, BuildStage> {
        self.stages
            .iter()
            .map(|(key, stage)| (key.unpack().to_canonical(), *stage))
            .collect()
    }

    /// Rebuilds a map from its canonical form, skipping malformed keys.
    #[must_use]
    pub fn from_entries(entries: BTreeMap<String, BuildStage>) -> Self {
        let mut stages = HashMap::with_capacity(entries.len());
        for (text, stage) in entries {
            match ChunkCoord::parse_canonical(&text) {
                Some(coord) => {
                    stages.insert(coord.key(), stage);
                }
                None => warn!(key = %text, "malformed chunk key in stage map, skipping"),
            }
        }
        Self {
            stages,
            dirty: false,
        }
    }

    /// Writes the map and clears the dirty flag.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn save(&mut self, store: &SegmentedStore<'_>) -> PersistResult<()> {
        store.save_json(STAGE_MAP_KEY, &self.to_entries())?;
        self.dirty = false;
        info!(chunks = self.stages.len(), "stage map saved");
        Ok(())
    }

    /// Loads the persisted map. Absent or corrupt state yields an empty map.
    #[must_use]
    pub fn load(store: &SegmentedStore<'_>) -> Self {
        let map = store
            .load_json::<BTreeMap<String, BuildStage>>(STAGE_MAP_KEY)
            .map(Self::from_entries)
            .unwrap_or_default();
        info!(chunks = map.len(), "stage map loaded");
        map
    }
}
