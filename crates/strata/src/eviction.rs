//! # Eviction Control
//!
//! Triggers distance-ranked cache eviction once the column cache grows
//! past the clear limit. At most one eviction job runs at a time, and the
//! whole pass happens inside one scheduler step so builders never observe
//! a half-evicted cache.

use strata_core::ChunkCoord;
use tracing::{info, warn};

use crate::config::{EvictionPolicy, MemoryTier};
use crate::provider::GenerationProvider;
use crate::scheduler::{Job, JobStep};
use crate::host::WorldHost;

/// Eviction trigger state.
#[derive(Debug, Clone)]
pub struct EvictionController {
    policy: EvictionPolicy,
    running: bool,
    passes: u64,
}

impl EvictionController {
    /// Calibrates from the memory tier once, applying the clear-limit
    /// override if present.
    #[must_use]
    pub fn calibrate(tier: MemoryTier, clear_limit_override: Option<usize>) -> Self {
        let mut policy = tier.policy();
        if let Some(limit) = clear_limit_override {
            policy.clear_limit = limit;
        }
        match tier {
            MemoryTier::SuperLow | MemoryTier::Low => warn!(
                ?tier,
                clear_limit = policy.clear_limit,
                keep_fraction = policy.keep_fraction,
                "low memory tier, column cache will be evicted aggressively"
            ),
            _ => info!(
                ?tier,
                clear_limit = policy.clear_limit,
                keep_fraction = policy.keep_fraction,
                "column cache calibrated"
            ),
        }
        Self {
            policy,
            running: false,
            passes: 0,
        }
    }

    /// Current policy.
    #[must_use]
    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Replaces the clear limit.
    pub fn set_clear_limit(&mut self, clear_limit: usize) {
        self.policy.clear_limit = clear_limit;
    }

    /// Whether a pass should start for a cache of `size` chunks.
    #[must_use]
    pub fn should_evict(&self, size: usize) -> bool {
        !self.running && size > self.policy.clear_limit
    }

    /// Marks a pass as running.
    pub fn begin(&mut self) {
        self.running = true;
    }

    /// Marks the running pass as done.
    pub fn finish(&mut self) {
        self.running = false;
        self.passes += 1;
    }

    /// Clears the running flag of a pass whose job was cancelled.
    pub fn abort(&mut self) {
        self.running = false;
    }

    /// Whether a pass is queued or running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Completed passes.
    #[must_use]
    pub fn passes(&self) -> u64 {
        self.passes
    }
}

/// One eviction pass, run as a single-step job.
pub struct EvictionJob {
    reference: ChunkCoord,
    keep_fraction: f64,
}

impl EvictionJob {
    /// Pass anchored at `reference` keeping `keep_fraction` of the cache.
    #[must_use]
    pub fn new(reference: ChunkCoord, keep_fraction: f64) -> Self {
        Self {
            reference,
            keep_fraction,
        }
    }
}

impl<W: WorldHost> Job<GenerationProvider<W>> for EvictionJob {
    fn label(&self) -> String {
        format!("evict around {}", self.reference)
    }

    fn step(&mut self, provider: &mut GenerationProvider<W>) -> JobStep {
        provider.evict(self.reference, self.keep_fraction);
        provider.eviction.finish();
        JobStep::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_and_single_flight() {
        let mut controller = EvictionController::calibrate(MemoryTier::SuperLow, None);
        assert!(!controller.should_evict(1_000));
        assert!(controller.should_evict(1_001));

        controller.begin();
        assert!(!controller.should_evict(5_000));
        controller.finish();
        assert!(controller.should_evict(5_000));
        assert_eq!(controller.passes(), 1);
    }

    #[test]
    fn test_override_replaces_limit() {
        let controller = EvictionController::calibrate(MemoryTier::High, Some(12));
        assert_eq!(controller.policy().clear_limit, 12);
        assert!((controller.policy().keep_fraction - 0.1).abs() < 1e-12);
    }
}
