//! # STRATA
//!
//! Chunked, incremental terrain generation driven by a cooperative job
//! queue.
//!
//! ## Architecture
//!
//! ```text
//!            observers (host)
//!                  │
//!                  ▼
//! ┌──────────────────────────────┐   admit    ┌────────────────────┐
//! │ Strata::tick                 │──────────> │ AdmissionController│
//! │  dispatch · evict · autosave │            │ working set, limit │
//! └──────────────┬───────────────┘            └────────────────────┘
//!                │ step(budget)
//!                ▼
//! ┌──────────────────────────────┐  &mut     ┌──────────────────────┐
//! │ Scheduler (round-robin)      │─────────> │ GenerationProvider   │
//! │  ChunkBuildJob · EvictionJob │           │ sampler · classifier │
//! │  ClearAreaJob                │           │ cache · stage map    │
//! └──────────────────────────────┘           │ world · store        │
//!                                            └──────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use strata::{content, GenerationConfig, MemoryWorld, Strata};
//! use strata_core::{BlockPos, MemoryStore};
//!
//! let registry = Arc::new(content::standard_registry()?);
//! let mut world = MemoryWorld::default();
//! world.set_observers(vec![BlockPos::new(0, 80, 0)]);
//! let mut strata = Strata::new(GenerationConfig::default(), registry, world, Arc::new(MemoryStore::new()))?;
//! strata.run_until_idle(10_000);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod admission;
pub mod builder;
pub mod commands;
pub mod config;
pub mod content;
pub mod debug;
pub mod driver;
pub mod error;
pub mod eviction;
pub mod host;
pub mod notice;
pub mod provider;
pub mod scheduler;
pub mod stage;

pub use admission::{Admission, AdmissionController};
pub use builder::ChunkBuildJob;
pub use commands::{ClearAreaJob, Command, CommandOutcome};
pub use config::{EvictionPolicy, GenerationConfig, MemoryTier, CONFIG_KEY};
pub use debug::DebugOverlay;
pub use driver::Strata;
pub use error::{StrataError, StrataResult};
pub use eviction::{EvictionController, EvictionJob};
pub use host::{MemoryWorld, WorldHost};
pub use notice::{notice_channel, NoticeReceiver, NoticeSender, OperatorNotice};
pub use provider::{GenerationProvider, ProviderCounters};
pub use scheduler::{Job, JobHandle, JobStep, Scheduler, SchedulerStats, TickReport};
pub use stage::{BuildStage, StageMap, STAGE_MAP_KEY};
