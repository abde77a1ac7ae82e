//! Error types shared across the STRATA crates.

use thiserror::Error;

use crate::coord::BlockPos;

/// A block write failed at the host boundary.
///
/// Always recoverable: the owning chunk's stage aborts and retries later.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlacementError {
    /// The target chunk is not loaded.
    #[error("position {pos} is not in a loaded chunk")]
    Unloaded {
        /// Rejected position.
        pos: BlockPos,
    },

    /// The position is outside the host's valid height range.
    #[error("position {pos} is outside the world bounds")]
    OutOfBounds {
        /// Rejected position.
        pos: BlockPos,
    },

    /// The host does not know the block identifier.
    #[error("unknown block id: {0}")]
    UnknownBlock(String),
}

/// Result type for block placement.
pub type PlacementResult<T> = Result<T, PlacementError>;

/// The durable key-value backend failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Value exceeds the backend's per-value ceiling.
    #[error("value for key {key} is {len} bytes, limit is {limit}")]
    ValueTooLarge {
        /// Key being written.
        key: String,
        /// Attempted length.
        len: usize,
        /// Backend limit.
        limit: usize,
    },

    /// Backend-specific failure.
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Persisted state could not be read or written.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistError {
    /// A count header exists but one of its segments is missing.
    #[error("segment {index} of {key} is missing")]
    MissingSegment {
        /// Base key.
        key: String,
        /// Missing segment index.
        index: usize,
    },

    /// The count header is not a number.
    #[error("segment count for {key} is malformed: {raw}")]
    BadCount {
        /// Base key.
        key: String,
        /// Raw header value.
        raw: String,
    },

    /// JSON payload did not parse.
    #[error("corrupt JSON under {key}: {reason}")]
    Corrupt {
        /// Base key.
        key: String,
        /// Parser message.
        reason: String,
    },

    /// Payload could not be serialized.
    #[error("failed to serialize {key}: {reason}")]
    Serialize {
        /// Base key.
        key: String,
        /// Serializer message.
        reason: String,
    },

    /// Underlying store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for persistence.
pub type PersistResult<T> = Result<T, PersistError>;

/// Configuration could not be applied.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// No tunable registered under this name.
    #[error("unknown tunable: {0}")]
    UnknownTunable(String),

    /// Value kind does not match the tunable's kind.
    #[error("tunable {name} expects {expected}")]
    WrongKind {
        /// Tunable name.
        name: String,
        /// Expected kind, for display.
        expected: &'static str,
    },

    /// Value lies outside the slider range.
    #[error("tunable {name} value {value} outside [{min}, {max}]")]
    OutOfRange {
        /// Tunable name.
        name: String,
        /// Rejected value.
        value: f64,
        /// Minimum.
        min: f64,
        /// Maximum.
        max: f64,
    },

    /// TOML document did not parse.
    #[error("config parse error: {0}")]
    Parse(String),

    /// Config file could not be read.
    #[error("config io error: {0}")]
    Io(String),
}

/// Result type for configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Biome/structure registry misuse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Registration attempted after indexes were built.
    #[error("registry is sealed; cannot add {0}")]
    Sealed(String),

    /// Two entries share an id.
    #[error("duplicate registry id: {0}")]
    DuplicateId(String),

    /// A structure names a biome that was never registered.
    #[error("structure {structure} references unknown biome {biome}")]
    UnknownBiome {
        /// Structure id.
        structure: String,
        /// Missing biome id.
        biome: String,
    },

    /// Biome index out of registry range.
    #[error("biome index {index} out of range (registry holds {count})")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Registered biome count.
        count: usize,
    },

    /// Classification needs at least one biome.
    #[error("no biomes registered")]
    Empty,

    /// Generation needs a sealed registry.
    #[error("registry indexes have not been built")]
    NotSealed,
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
