//! # Driver
//!
//! [`Strata`] owns the provider and the scheduler and runs one host tick
//! at a time:
//!
//! 1. dispatch chunks around every observer, nearest first
//! 2. queue an eviction pass if the cache is over its clear limit
//! 3. step the scheduler for `steps_per_tick` steps
//! 4. flush the stage map every `autosave_interval_ticks` if it changed

use std::sync::Arc;

use strata_core::{BlockPos, ChunkCoord, KeyValueStore};
use strata_procedural::Registry;
use tracing::{debug, info, warn};

use crate::admission::Admission;
use crate::builder::ChunkBuildJob;
use crate::config::GenerationConfig;
use crate::error::StrataResult;
use crate::eviction::EvictionJob;
use crate::host::WorldHost;
use crate::notice::{notice_channel, NoticeReceiver, NOTICE_CAPACITY};
use crate::provider::GenerationProvider;
use crate::scheduler::{Job, JobHandle, Scheduler, TickReport};

/// Generation runtime for one world.
pub struct Strata<W: WorldHost> {
    pub(crate) provider: GenerationProvider<W>,
    pub(crate) scheduler: Scheduler<GenerationProvider<W>>,
    notices: NoticeReceiver,
    ticks: u64,
}

impl<W: WorldHost> Strata<W> {
    /// Builds the runtime and restores any persisted config and progress.
    ///
    /// # Errors
    ///
    /// Unsealed registry, invalid config.
    pub fn new(
        config: GenerationConfig,
        registry: Arc<Registry>,
        world: W,
        store: Arc<dyn KeyValueStore>,
    ) -> StrataResult<Self> {
        let (sender, notices) = notice_channel(NOTICE_CAPACITY);
        let mut provider = GenerationProvider::new(config, registry, world, store, sender)?;
        if provider.load_config()? {
            info!("restored saved generation config");
        }
        provider.load_progress();
        Ok(Self {
            provider,
            scheduler: Scheduler::new(),
            notices,
            ticks: 0,
        })
    }

    /// Generation context.
    #[must_use]
    pub fn provider(&self) -> &GenerationProvider<W> {
        &self.provider
    }

    /// Generation context, mutably.
    pub fn provider_mut(&mut self) -> &mut GenerationProvider<W> {
        &mut self.provider
    }

    /// Job queue.
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler<GenerationProvider<W>> {
        &self.scheduler
    }

    /// Operator notice stream.
    #[must_use]
    pub fn notices(&self) -> &NoticeReceiver {
        &self.notices
    }

    /// Ticks run so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Queues an arbitrary job.
    pub fn submit(&mut self, job: Box<dyn Job<GenerationProvider<W>>>) -> JobHandle {
        self.scheduler.submit(job)
    }

    /// Starts a builder for `coord` if admission allows it.
    pub fn dispatch(&mut self, coord: ChunkCoord) -> Admission {
        let admission = self
            .provider
            .admission
            .try_admit(coord, &self.provider.stages);
        if admission == Admission::Admitted {
            let stage = self.provider.stages.get(coord);
            self.scheduler
                .submit(Box::new(ChunkBuildJob::new(coord, stage)));
        }
        admission
    }

    /// Dispatches the chunks in `[-R, R)` around `pos`, nearest first.
    /// Returns how many builders were started.
    pub fn manage_observer(&mut self, pos: BlockPos) -> usize {
        let center = self.provider.layout.chunk_of(pos.x, pos.z);
        let range = self.provider.config.chunk_range.max(0);
        let mut coords: Vec<ChunkCoord> = (-range..range)
            .flat_map(|dx| (-range..range).map(move |dz| center.offset(dx, dz)))
            .collect();
        coords.sort_by_key(|c| (c.distance_squared(center), c.x, c.z));

        let mut started = 0;
        for coord in coords {
            match self.dispatch(coord) {
                Admission::Admitted => started += 1,
                Admission::Saturated => break,
                Admission::AlreadyBuilding | Admission::Finished => {}
            }
        }
        started
    }

    /// Runs one host tick.
    pub fn tick(&mut self) -> TickReport {
        self.ticks += 1;

        for pos in self.provider.world.observers() {
            self.manage_observer(pos);
        }

        let size = self.provider.cache.total_cache_size();
        if self.provider.eviction.should_evict(size) {
            let reference = self.provider.reference_chunk().unwrap_or_default();
            let keep = self.provider.eviction.policy().keep_fraction;
            self.provider.eviction.begin();
            self.scheduler
                .submit(Box::new(EvictionJob::new(reference, keep)));
            debug!(size, %reference, "eviction queued");
        }

        let budget = self.provider.config.steps_per_tick;
        let report = self.scheduler.tick(&mut self.provider, budget);

        let interval = self.provider.config.autosave_interval_ticks;
        if interval > 0 && self.ticks % interval == 0 && self.provider.stages.is_dirty() {
            if let Err(error) = self.provider.save_progress() {
                warn!(%error, "autosave of stage map failed");
            }
        }
        report
    }

    /// Ticks until no job is pending or `max_ticks` ran. Returns the
    /// number of ticks run.
    pub fn run_until_idle(&mut self, max_ticks: u64) -> u64 {
        let mut ran = 0;
        while ran < max_ticks {
            self.tick();
            ran += 1;
            if self.scheduler.is_empty() {
                break;
            }
        }
        ran
    }

    /// Host callback when an observer leaves. With none remaining,
    /// progress and config are flushed.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn observer_left(&mut self, remaining: usize) -> StrataResult<()> {
        if remaining == 0 {
            self.provider.save_progress()?;
            self.provider.save_config()?;
            info!("last observer left, progress saved");
        }
        Ok(())
    }

    /// Cancels every pending job and resets the bookkeeping that
    /// cancellation skips. Returns how many jobs were dropped.
    pub fn clear_jobs(&mut self) -> usize {
        let dropped = self.scheduler.cancel_all();
        self.provider.admission.reset();
        self.provider.eviction.abort();
        info!(dropped, "all generation jobs cancelled");
        dropped
    }
}
