//! # Cooperative Job Scheduler
//!
//! Single-threaded work queue. A job is an explicit state machine whose
//! [`Job::step`] performs one bounded unit of work and reports whether it
//! wants to run again.
//!
//! ```text
//! tick(budget) ──> pop front ──> step(ctx) ──┬─ Continue ──> push back
//!                                             └─ Done     ──> drop
//! ```
//!
//! Jobs rotate round-robin until the step budget is spent or the queue
//! drains. A step is never interrupted, so anything a job mutates inside
//! one step is atomic with respect to every other job.
//!
//! Cancellation drops the job immediately. No cleanup runs.

use std::collections::VecDeque;

use tracing::trace;

/// What a job wants after one step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStep {
    /// Run again on a later step.
    Continue,
    /// Finished; drop the job.
    Done,
}

/// A resumable unit of background work over context `C`.
pub trait Job<C> {
    /// Short label for logs.
    fn label(&self) -> String;

    /// Performs one bounded unit of work.
    fn step(&mut self, ctx: &mut C) -> JobStep;
}

/// Handle for cancelling a submitted job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobHandle(u64);

/// Result of one scheduler tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Steps executed.
    pub stepped: usize,
    /// Jobs that reported [`JobStep::Done`].
    pub finished: usize,
}

/// Lifetime counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Jobs ever submitted.
    pub submitted: u64,
    /// Jobs that completed.
    pub completed: u64,
    /// Jobs cancelled before completing.
    pub cancelled: u64,
    /// Steps executed.
    pub steps: u64,
}

struct Entry<C> {
    handle: JobHandle,
    job: Box<dyn Job<C>>,
}

/// Round-robin cooperative scheduler.
pub struct Scheduler<C> {
    queue: VecDeque<Entry<C>>,
    next_id: u64,
    stats: SchedulerStats,
}

impl<C> Default for Scheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Scheduler<C> {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            next_id: 0,
            stats: SchedulerStats::default(),
        }
    }

    /// Queues a job at the back.
    pub fn submit(&mut self, job: Box<dyn Job<C>>) -> JobHandle {
        let handle = JobHandle(self.next_id);
        self.next_id += 1;
        self.stats.submitted += 1;
        trace!(job = %job.label(), id = handle.0, "job submitted");
        self.queue.push_back(Entry { handle, job });
        handle
    }

    /// Drops a pending job. Returns `false` if it already finished.
    pub fn cancel(&mut self, handle: JobHandle) -> bool {
        let before = self.queue.len();
        self.queue.retain(|entry| entry.handle != handle);
        let cancelled = self.queue.len() != before;
        if cancelled {
            self.stats.cancelled += 1;
        }
        cancelled
    }

    /// Drops every pending job and returns how many were dropped.
    pub fn cancel_all(&mut self) -> usize {
        let dropped = self.queue.len();
        self.queue.clear();
        self.stats.cancelled += dropped as u64;
        dropped
    }

    /// Whether `handle` is still pending.
    #[must_use]
    pub fn is_pending(&self, handle: JobHandle) -> bool {
        self.queue.iter().any(|entry| entry.handle == handle)
    }

    /// Number of pending jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether no job is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Lifetime counters.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Runs up to `budget` steps across pending jobs.
    pub fn tick(&mut self, ctx: &mut C, budget: usize) -> TickReport {
        let mut report = TickReport::default();
        while report.stepped < budget {
            let Some(mut entry) = self.queue.pop_front() else {
                break;
            };
            report.stepped += 1;
            self.stats.steps += 1;
            match entry.job.step(ctx) {
                JobStep::Continue => self.queue.push_back(entry),
                JobStep::Done => {
                    report.finished += 1;
                    self.stats.completed += 1;
                    trace!(job = %entry.job.label(), id = entry.handle.0, "job finished");
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        name: &'static str,
        remaining: u32,
    }

    impl Job<Vec<&'static str>> for Counter {
        fn label(&self) -> String {
            self.name.to_owned()
        }

        fn step(&mut self, log: &mut Vec<&'static str>) -> JobStep {
            log.push(self.name);
            self.remaining -= 1;
            if self.remaining == 0 {
                JobStep::Done
            } else {
                JobStep::Continue
            }
        }
    }

    fn counter(name: &'static str, remaining: u32) -> Box<dyn Job<Vec<&'static str>>> {
        Box::new(Counter { name, remaining })
    }

    #[test]
    fn test_round_robin_interleaving() {
        let mut scheduler = Scheduler::new();
        let mut log = Vec::new();
        scheduler.submit(counter("a", 2));
        scheduler.submit(counter("b", 3));

        let report = scheduler.tick(&mut log, 100);
        assert_eq!(log, vec!["a", "b", "a", "b", "b"]);
        assert_eq!(report, TickReport { stepped: 5, finished: 2 });
        assert!(scheduler.is_empty());
        assert_eq!(scheduler.stats().completed, 2);
    }

    #[test]
    fn test_budget_bounds_steps() {
        let mut scheduler = Scheduler::new();
        let mut log = Vec::new();
        scheduler.submit(counter("a", 10));
        scheduler.submit(counter("b", 10));

        let report = scheduler.tick(&mut log, 3);
        assert_eq!(report.stepped, 3);
        assert_eq!(log.len(), 3);
        assert_eq!(scheduler.len(), 2);
    }

    #[test]
    fn test_cancelled_job_never_steps_again() {
        let mut scheduler = Scheduler::new();
        let mut log = Vec::new();
        let a = scheduler.submit(counter("a", 5));
        scheduler.submit(counter("b", 2));

        scheduler.tick(&mut log, 1);
        assert!(scheduler.cancel(a));
        assert!(!scheduler.is_pending(a));
        assert!(!scheduler.cancel(a));

        scheduler.tick(&mut log, 100);
        assert_eq!(log, vec!["a", "b", "b"]);
        assert_eq!(scheduler.stats().cancelled, 1);
    }

    #[test]
    fn test_cancel_all() {
        let mut scheduler: Scheduler<Vec<&'static str>> = Scheduler::new();
        scheduler.submit(counter("a", 5));
        scheduler.submit(counter("b", 5));
        assert_eq!(scheduler.cancel_all(), 2);
        assert!(scheduler.is_empty());
        let mut log = Vec::new();
        assert_eq!(scheduler.tick(&mut log, 10), TickReport::default());
    }
}
