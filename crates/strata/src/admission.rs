//! # Admission Control
//!
//! Bounds in-flight chunk builds and keeps at most one builder per chunk.
//!
//! A chunk enters the working set on admission and leaves it exactly once
//! per build attempt, through [`AdmissionController::release`], on both the
//! finish and the bail path.

use std::collections::HashSet;

use strata_core::{ChunkCoord, ChunkKey};
use tracing::debug;

use crate::stage::StageMap;

/// Outcome of a dispatch request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// A builder may start.
    Admitted,
    /// A builder for this chunk is already running.
    AlreadyBuilding,
    /// The chunk has finished.
    Finished,
    /// The in-flight ceiling is reached.
    Saturated,
}

/// Working set plus in-flight counter.
#[derive(Debug, Clone)]
pub struct AdmissionController {
    working: HashSet<ChunkKey>,
    in_flight: usize,
    ceiling: usize,
    refused: u64,
}

impl AdmissionController {
    /// Creates a controller admitting at most `ceiling` concurrent builds.
    #[must_use]
    pub fn new(ceiling: usize) -> Self {
        Self {
            working: HashSet::new(),
            in_flight: 0,
            ceiling,
            refused: 0,
        }
    }

    /// Admits `coord` if it is idle, unfinished and there is headroom.
    pub fn try_admit(&mut self, coord: ChunkCoord, stages: &StageMap) -> Admission {
        let key = coord.key();
        if self.working.contains(&key) {
            return Admission::AlreadyBuilding;
        }
        if stages.is_finished(coord) {
            return Admission::Finished;
        }
        if self.in_flight >= self.ceiling {
            self.refused += 1;
            debug!(%coord, in_flight = self.in_flight, ceiling = self.ceiling, "admission refused");
            return Admission::Saturated;
        }
        self.working.insert(key);
        self.in_flight += 1;
        Admission::Admitted
    }

    /// Removes `coord` from the working set. Returns `false` if it was not
    /// building.
    pub fn release(&mut self, coord: ChunkCoord) -> bool {
        if self.working.remove(&coord.key()) {
            self.in_flight = self.in_flight.saturating_sub(1);
            true
        } else {
            false
        }
    }

    /// Whether a builder for `coord` is running.
    #[must_use]
    pub fn is_building(&self, coord: ChunkCoord) -> bool {
        self.working.contains(&coord.key())
    }

    /// Current in-flight count.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Concurrency ceiling.
    #[must_use]
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Changes the ceiling. Running builds are unaffected.
    pub fn set_ceiling(&mut self, ceiling: usize) {
        self.ceiling = ceiling;
    }

    /// Dispatches refused for saturation.
    #[must_use]
    pub fn refused(&self) -> u64 {
        self.refused
    }

    /// Forgets every running build. Used after jobs were cancelled, since
    /// cancellation does not release.
    pub fn reset(&mut self) {
        self.working.clear();
        self.in_flight = 0;
    }

    /// Chunks in the working set.
    pub fn working_set(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.working.iter().map(|key| key.unpack())
    }
}
