//! # Generation Configuration
//!
//! Loaded once from TOML at startup; every field has a default so a
//! partial file is valid. The operator-facing subset is exposed as a
//! [`TunableRegistry`] and round-trips through the durable store as flat
//! JSON.
//!
//! ```toml
//! seed = 1234
//! max_building_chunks = 200
//! memory_tier = "High"
//!
//! [terrain]
//! amplitude = 60.0
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use strata_core::{ConfigError, ConfigResult, TunableRegistry, TunableValue, DEFAULT_CHUNK_EDGE};
use strata_procedural::{ClassifierParams, TerrainParams, WorldSeed};
use tracing::warn;

/// Store key of the persisted operator config.
pub const CONFIG_KEY: &str = "strata_config";

/// Tunable names.
pub mod names {
    /// Height octave count.
    pub const OCTAVES: &str = "Terrain Shape Octave Count";
    /// Height amplitude.
    pub const AMPLITUDE: &str = "Terrain Shape Amplitude";
    /// Height frequency.
    pub const FREQUENCY: &str = "Terrain Shape Frequency";
    /// Height base offset.
    pub const BASE_OFFSET: &str = "Terrain Shape Base Offset";
    /// Height persistence.
    pub const PERSISTENCE: &str = "Terrain Shape Persistance";
    /// Admission ceiling.
    pub const MAX_BUILDING: &str = "Max Building Chunks";
    /// Dispatch radius around observers.
    pub const CHUNK_RANGE: &str = "Chunk Range";
    /// Clear-limit override; empty means the memory-tier default.
    pub const MAX_CACHED: &str = "Max Cached Chunks";
    /// Classifier climate weight.
    pub const CLIMATE_WEIGHT: &str = "Biome Climate Weight";
    /// Classifier moisture weight.
    pub const MOISTURE_WEIGHT: &str = "Biome Moisture Weight";
    /// Classifier height weight.
    pub const HEIGHT_WEIGHT: &str = "Biome Height Weight";
    /// Hard-surface pass toggle.
    pub const RESURFACE: &str = "Resurface After Structures";
}

/// Coarse host memory signal, read once at startup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryTier {
    /// Very constrained devices.
    SuperLow,
    /// Constrained devices.
    Low,
    /// Typical hosts.
    #[default]
    Mid,
    /// Large hosts.
    High,
    /// Dedicated servers.
    SuperHigh,
}

/// Cache size bound and eviction aggressiveness.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EvictionPolicy {
    /// Evict once the cache holds more chunks than this.
    pub clear_limit: usize,
    /// Fraction of chunks kept by an eviction pass.
    pub keep_fraction: f64,
}

impl MemoryTier {
    /// Policy for this tier.
    #[must_use]
    pub fn policy(self) -> EvictionPolicy {
        let (clear_limit, keep_fraction) = match self {
            Self::SuperLow => (1_000, 0.03),
            Self::Low => (2_500, 0.06),
            Self::Mid => (30_000, 0.1),
            Self::High => (50_000, 0.1),
            Self::SuperHigh => (100_000, 0.1),
        };
        EvictionPolicy {
            clear_limit,
            keep_fraction,
        }
    }
}

fn default_seed() -> WorldSeed {
    WorldSeed::default()
}

fn default_chunk_edge() -> u16 {
    DEFAULT_CHUNK_EDGE
}

fn default_max_building_chunks() -> usize {
    100
}

fn default_chunk_range() -> i32 {
    6
}

fn default_autosave_interval_ticks() -> u64 {
    200
}

fn default_steps_per_tick() -> usize {
    64
}

/// Everything that shapes generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// World seed.
    #[serde(default = "default_seed")]
    pub seed: WorldSeed,
    /// Chunk edge length in columns.
    #[serde(default = "default_chunk_edge")]
    pub chunk_edge: u16,
    /// Height field.
    #[serde(default)]
    pub terrain: TerrainParams,
    /// Biome classifier.
    #[serde(default)]
    pub classifier: ClassifierParams,
    /// Concurrent build ceiling.
    #[serde(default = "default_max_building_chunks")]
    pub max_building_chunks: usize,
    /// Dispatch radius in chunks around each observer.
    #[serde(default = "default_chunk_range")]
    pub chunk_range: i32,
    /// Overrides the memory tier's clear limit.
    #[serde(default)]
    pub max_cached_chunks: Option<usize>,
    /// Re-run the surface pass on chunks that received structures.
    #[serde(default)]
    pub resurface_after_structures: bool,
    /// Ticks between stage-map flushes.
    #[serde(default = "default_autosave_interval_ticks")]
    pub autosave_interval_ticks: u64,
    /// Scheduler steps per tick.
    #[serde(default = "default_steps_per_tick")]
    pub steps_per_tick: usize,
    /// Host memory signal.
    #[serde(default)]
    pub memory_tier: MemoryTier,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            chunk_edge: default_chunk_edge(),
            terrain: TerrainParams::default(),
            classifier: ClassifierParams::default(),
            max_building_chunks: default_max_building_chunks(),
            chunk_range: default_chunk_range(),
            max_cached_chunks: None,
            resurface_after_structures: false,
            autosave_interval_ticks: default_autosave_interval_ticks(),
            steps_per_tick: default_steps_per_tick(),
            memory_tier: MemoryTier::default(),
        }
    }
}

impl GenerationConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] on malformed TOML or invalid values.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        if config.chunk_edge == 0 {
            return Err(ConfigError::Parse("chunk_edge must be non-zero".to_owned()));
        }
        Ok(config)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if unreadable, otherwise as [`Self::from_toml_str`].
    pub fn from_toml_file(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Effective eviction policy: the tier's, with the clear-limit override.
    #[must_use]
    pub fn eviction_policy(&self) -> EvictionPolicy {
        let mut policy = self.memory_tier.policy();
        if let Some(limit) = self.max_cached_chunks {
            policy.clear_limit = limit;
        }
        policy
    }

    /// Operator-facing schema populated with the current values.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn tunables(&self) -> TunableRegistry {
        let max_cached = self
            .max_cached_chunks
            .map(|v| v.to_string())
            .unwrap_or_default();
        TunableRegistry::new()
            .int_slider(names::OCTAVES, 1, 10, 1, i64::from(self.terrain.octaves))
            .int_slider(names::AMPLITUDE, 1, 100, 1, self.terrain.amplitude.round() as i64)
            .float_slider(names::FREQUENCY, 0.0001, 0.02, 0.0001, 10_000.0, self.terrain.frequency)
            .int_slider(names::BASE_OFFSET, 0, 256, 1, self.terrain.base_offset.round() as i64)
            .float_slider(names::PERSISTENCE, 0.1, 1.0, 0.05, 100.0, self.terrain.persistence)
            .int_slider(names::MAX_BUILDING, 0, 1000, 10, self.max_building_chunks as i64)
            .int_slider(names::CHUNK_RANGE, 1, 16, 1, i64::from(self.chunk_range))
            .text(names::MAX_CACHED, &max_cached)
            .float_slider(names::CLIMATE_WEIGHT, 0.0, 4.0, 0.05, 100.0, f64::from(self.classifier.climate_weight))
            .float_slider(names::MOISTURE_WEIGHT, 0.0, 4.0, 0.05, 100.0, f64::from(self.classifier.moisture_weight))
            .float_slider(names::HEIGHT_WEIGHT, 0.0, 4.0, 0.05, 100.0, f64::from(self.classifier.height_weight))
            .toggle(names::RESURFACE, self.resurface_after_structures)
    }

    /// Copies tunable values back into the config.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn apply_tunables(&mut self, tunables: &TunableRegistry) {
        if let Some(v) = tunables.get_int(names::OCTAVES) {
            self.terrain.octaves = v as u32;
        }
        if let Some(v) = tunables.get_int(names::AMPLITUDE) {
            self.terrain.amplitude = v as f64;
        }
        if let Some(v) = tunables.get_float(names::FREQUENCY) {
            self.terrain.frequency = v;
        }
        if let Some(v) = tunables.get_int(names::BASE_OFFSET) {
            self.terrain.base_offset = v as f64;
        }
        if let Some(v) = tunables.get_float(names::PERSISTENCE) {
            self.terrain.persistence = v;
        }
        if let Some(v) = tunables.get_int(names::MAX_BUILDING) {
            self.max_building_chunks = v as usize;
        }
        if let Some(v) = tunables.get_int(names::CHUNK_RANGE) {
            self.chunk_range = v as i32;
        }
        if let Some(text) = tunables.get_text(names::MAX_CACHED) {
            let text = text.trim();
            self.max_cached_chunks = if text.is_empty() {
                None
            } else if let Ok(limit) = text.parse() {
                Some(limit)
            } else {
                warn!(value = %text, "Max Cached Chunks is not a number, keeping tier default");
                None
            };
        }
        if let Some(v) = tunables.get_float(names::CLIMATE_WEIGHT) {
            self.classifier.climate_weight = v as f32;
        }
        if let Some(v) = tunables.get_float(names::MOISTURE_WEIGHT) {
            self.classifier.moisture_weight = v as f32;
        }
        if let Some(v) = tunables.get_float(names::HEIGHT_WEIGHT) {
            self.classifier.height_weight = v as f32;
        }
        if let Some(v) = tunables.get_bool(names::RESURFACE) {
            self.resurface_after_structures = v;
        }
    }

    /// Sets one tunable by name and applies it.
    ///
    /// # Errors
    ///
    /// Unknown name, wrong kind, or out-of-range value.
    pub fn set_tunable(&mut self, name: &str, value: TunableValue) -> ConfigResult<()> {
        let mut tunables = self.tunables();
        tunables.set(name, value)?;
        self.apply_tunables(&tunables);
        Ok(())
    }
}
