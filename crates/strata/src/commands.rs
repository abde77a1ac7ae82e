//! # Operator Commands
//!
//! Scripted `strata:<name>` commands. Forced cache and config operations
//! announce themselves on the notice channel with start and finish
//! banners.

use std::str::FromStr;

use strata_core::{BlockPos, TunableRegistry, AIR};
use strata_procedural::EvictionReport;
use tracing::info;

use crate::driver::Strata;
use crate::error::{StrataError, StrataResult};
use crate::host::WorldHost;
use crate::notice::OperatorNotice;
use crate::provider::GenerationProvider;
use crate::scheduler::{Job, JobHandle, JobStep};

/// Command prefix.
pub const PREFIX: &str = "strata:";

/// X-slices cleared per `clear_area` step.
pub const CLEAR_SLICES_PER_STEP: i32 = 5;

/// A parsed operator command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Tunable schema snapshot.
    Config,
    /// Partial cache drop around the primary observer.
    Cache,
    /// Full drop of cache, working set and stage map.
    DropCache,
    /// Save config and stage map.
    ForceSave,
    /// Load config and stage map.
    ForceLoad,
    /// Cancel every job.
    ClearJobs,
    /// Delete the saved config.
    DeleteConfig,
    /// Fill the box between two corners with air.
    ClearArea {
        /// First corner.
        from: BlockPos,
        /// Opposite corner.
        to: BlockPos,
    },
    /// Flush the stage map.
    SaveProgress,
}

impl FromStr for Command {
    type Err = StrataError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let unknown = || StrataError::UnknownCommand(text.to_owned());
        let body = text.trim().strip_prefix(PREFIX).ok_or_else(unknown)?;
        let mut parts = body.split_whitespace();
        let name = parts.next().ok_or_else(unknown)?;
        let command = match name {
            "config" => Self::Config,
            "cache" => Self::Cache,
            "dropcache" => Self::DropCache,
            "force_save" => Self::ForceSave,
            "force_load" => Self::ForceLoad,
            "clear_jobs" => Self::ClearJobs,
            "delete_config" => Self::DeleteConfig,
            "save_progress" => Self::SaveProgress,
            "clear_area" => {
                let numbers = parts
                    .by_ref()
                    .map(str::parse::<i32>)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| unknown())?;
                let [x1, y1, z1, x2, y2, z2] = numbers[..] else {
                    return Err(unknown());
                };
                Self::ClearArea {
                    from: BlockPos::new(x1, y1, z1),
                    to: BlockPos::new(x2, y2, z2),
                }
            }
            _ => return Err(unknown()),
        };
        if parts.next().is_some() {
            return Err(unknown());
        }
        Ok(command)
    }
}

impl Command {
    /// Parses `strata:<name> [args]`.
    ///
    /// # Errors
    ///
    /// [`StrataError::UnknownCommand`] for anything else.
    pub fn parse(text: &str) -> StrataResult<Self> {
        text.parse()
    }
}

/// What a command produced.
#[derive(Clone, Debug, PartialEq)]
pub enum CommandOutcome {
    /// Tunable schema for the host's form layer.
    Schema(TunableRegistry),
    /// A cache drop ran.
    Evicted(EvictionReport),
    /// Jobs were cancelled.
    JobsCleared(usize),
    /// A job was queued.
    Queued(JobHandle),
    /// Nothing to report.
    Done,
}

impl<W: WorldHost> Strata<W> {
    /// Runs an operator command.
    ///
    /// # Errors
    ///
    /// Propagates store and config failures.
    pub fn execute(&mut self, command: Command) -> StrataResult<CommandOutcome> {
        info!(?command, "operator command");
        let outcome = match command {
            Command::Config => CommandOutcome::Schema(self.provider.config.tunables()),
            Command::Cache => {
                let banner = "dropping far cache";
                self.provider.notify(OperatorNotice::Started(banner.to_owned()));
                let reference = self.provider.reference_chunk().unwrap_or_default();
                let report = self.provider.evict(reference, 0.5);
                self.provider.notify(OperatorNotice::Finished(banner.to_owned()));
                CommandOutcome::Evicted(report)
            }
            Command::DropCache => {
                let banner = "dropping all generation state";
                self.provider.notify(OperatorNotice::Started(banner.to_owned()));
                self.clear_jobs();
                let removed = self.provider.cache.total_cache_size();
                self.provider.drop_all();
                self.provider.notify(OperatorNotice::Finished(banner.to_owned()));
                CommandOutcome::Evicted(EvictionReport { kept: 0, removed })
            }
            Command::ForceSave => {
                let banner = "saving config and progress";
                self.provider.notify(OperatorNotice::Started(banner.to_owned()));
                self.provider.save_config()?;
                self.provider.save_progress()?;
                self.provider.notify(OperatorNotice::Finished(banner.to_owned()));
                CommandOutcome::Done
            }
            Command::ForceLoad => {
                let banner = "loading config and progress";
                self.provider.notify(OperatorNotice::Started(banner.to_owned()));
                // Loaded stages may be ahead of a live builder.
                self.clear_jobs();
                if !self.provider.load_config()? {
                    self.provider
                        .notify(OperatorNotice::Info("no saved config".to_owned()));
                }
                self.provider.load_progress();
                self.provider.notify(OperatorNotice::Finished(banner.to_owned()));
                CommandOutcome::Done
            }
            Command::ClearJobs => CommandOutcome::JobsCleared(self.clear_jobs()),
            Command::DeleteConfig => {
                let banner = "deleting saved config";
                self.provider.notify(OperatorNotice::Started(banner.to_owned()));
                self.provider.delete_config();
                self.provider.notify(OperatorNotice::Finished(banner.to_owned()));
                CommandOutcome::Done
            }
            Command::ClearArea { from, to } => {
                CommandOutcome::Queued(self.submit(Box::new(ClearAreaJob::new(from, to))))
            }
            Command::SaveProgress => {
                self.provider.save_progress()?;
                CommandOutcome::Done
            }
        };
        Ok(outcome)
    }
}

/// Fills a box with air a few x-slices per step. Failed writes are
/// skipped.
pub struct ClearAreaJob {
    min: BlockPos,
    max: BlockPos,
    next_x: i32,
    skipped: u64,
}

impl ClearAreaJob {
    /// Job for the box spanned by two corners, inclusive.
    #[must_use]
    pub fn new(a: BlockPos, b: BlockPos) -> Self {
        let min = BlockPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z));
        let max = BlockPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z));
        Self {
            min,
            max,
            next_x: min.x,
            skipped: 0,
        }
    }
}

impl<W: WorldHost> Job<GenerationProvider<W>> for ClearAreaJob {
    fn label(&self) -> String {
        format!("clear area {} .. {}", self.min, self.max)
    }

    fn step(&mut self, provider: &mut GenerationProvider<W>) -> JobStep {
        let end = self
            .next_x
            .saturating_add(CLEAR_SLICES_PER_STEP - 1)
            .min(self.max.x);
        for x in self.next_x..=end {
            for y in self.min.y..=self.max.y {
                for z in self.min.z..=self.max.z {
                    if provider.world.set_block(BlockPos::new(x, y, z), AIR).is_err() {
                        self.skipped += 1;
                    }
                }
            }
        }
        if end >= self.max.x {
            provider.notify(OperatorNotice::Finished(format!(
                "clear area {} .. {} ({} skipped)",
                self.min, self.max, self.skipped
            )));
            JobStep::Done
        } else {
            self.next_x = end + 1;
            JobStep::Continue
        }
    }
}
