//! Pending-write queue for docsync.
//!
//! Writes the remote store rejected are kept here, oldest first, until a
//! flush replays them. The queue has a capacity so a long offline period
//! cannot grow it without bound.
//!
//! A flush is driven by the caller:
//! 1. `begin_flush()` - take every queued write into a [`FlushBatch`]
//! 2. `next_write()` - get the next write to attempt
//! 3. `succeeded()` / `failed(write)` - report the outcome
//! 4. `finish()` - get back the writes that must stay queued
//!
//! How a failure affects the rest of the pass is set by [`FlushPolicy`].

use std::collections::VecDeque;

use docsync_types::PendingWrite;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for queue operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Queue is at capacity.
    #[error("pending-write queue full (capacity: {capacity})")]
    Full {
        /// Queue capacity.
        capacity: usize,
    },
}

/// What a flush does after a write fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlushPolicy {
    /// Keep going: every queued write is attempted in one pass, failures are
    /// retained in their relative order. A later write may reach the remote
    /// before an earlier one that is still failing.
    #[default]
    ContinueOnFailure,
    /// Stop at the first failure: the failed write and everything after it
    /// stay queued untouched, so the remote sees writes strictly in order.
    StopAtFirstFailure,
}

/// Outcome counts of one flush pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Writes sent to the remote store.
    pub attempted: usize,
    /// Writes the remote store accepted.
    pub succeeded: usize,
    /// Writes the remote store rejected.
    pub failed: usize,
    /// Writes still queued after the pass (failed plus untried).
    pub remaining: usize,
}

impl FlushReport {
    /// True if the queue is empty after the pass.
    pub fn is_drained(&self) -> bool {
        self.remaining == 0
    }
}

/// Ordered queue of pending writes with a capacity.
#[derive(Debug, Clone)]
pub struct PendingQueue<D> {
    capacity: usize,
    writes: VecDeque<PendingWrite<D>>,
}

impl<D> PendingQueue<D> {
    /// Rebuild a queue from persisted writes.
    ///
    /// Writes already over capacity are kept; only new pushes are refused.
    pub fn from_writes(writes: Vec<PendingWrite<D>>, capacity: usize) -> Self {
        Self {
            capacity,
            writes: writes.into(),
        }
    }

    /// Append a write at the back of the queue.
    ///
    /// Returns an error if the queue is full.
    pub fn push(&mut self, write: PendingWrite<D>) -> Result<(), QueueError> {
        if self.writes.len() >= self.capacity {
            return Err(QueueError::Full {
                capacity: self.capacity,
            });
        }
        self.writes.push_back(write);
        Ok(())
    }

    /// Unwrap into the ordered list stored in the cache envelope.
    pub fn into_writes(self) -> Vec<PendingWrite<D>> {
        self.writes.into()
    }

    /// Start a flush pass over every queued write.
    pub fn begin_flush(self, policy: FlushPolicy) -> FlushBatch<D> {
        FlushBatch {
            policy,
            untried: self.writes,
            retained: Vec::new(),
            halted: false,
            report: FlushReport::default(),
        }
    }
}

/// One flush pass in progress.
#[derive(Debug)]
pub struct FlushBatch<D> {
    policy: FlushPolicy,
    untried: VecDeque<PendingWrite<D>>,
    retained: Vec<PendingWrite<D>>,
    halted: bool,
    report: FlushReport,
}

impl<D> FlushBatch<D> {
    /// Take the next write to attempt.
    ///
    /// Returns `None` when the pass is over: every write was attempted, or
    /// the policy halted the pass after a failure.
    pub fn next_write(&mut self) -> Option<PendingWrite<D>> {
        if self.halted {
            return None;
        }
        let write = self.untried.pop_front()?;
        self.report.attempted += 1;
        Some(write)
    }

    /// Record that the last write was accepted. It is dropped.
    pub fn succeeded(&mut self) {
        self.report.succeeded += 1;
    }

    /// Record that the last write was rejected. It is kept for the next pass.
    pub fn failed(&mut self, write: PendingWrite<D>) {
        self.report.failed += 1;
        self.retained.push(write);
        if self.policy == FlushPolicy::StopAtFirstFailure {
            self.halted = true;
        }
    }

    /// End the pass, returning the new queue contents and the counts.
    pub fn finish(self) -> (Vec<PendingWrite<D>>, FlushReport) {
        let mut remaining = self.retained;
        remaining.extend(self.untried);
        let report = FlushReport {
            remaining: remaining.len(),
            ..self.report
        };
        (remaining, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Write = PendingWrite<String>;

    fn save(tag: &str) -> Write {
        PendingWrite::Save(tag.to_string())
    }

    /// Run a flush pass where writes whose tag is in `failing` are rejected.
    fn run_flush(
        writes: Vec<Write>,
        policy: FlushPolicy,
        failing: &[&str],
    ) -> (Vec<Write>, FlushReport, Vec<Write>) {
        let mut batch = PendingQueue::from_writes(writes, 100).begin_flush(policy);
        let mut attempted = Vec::new();
        while let Some(write) = batch.next_write() {
            attempted.push(write.clone());
            let rejected = matches!(&write, PendingWrite::Save(tag) if failing.contains(&tag.as_str()));
            if rejected {
                batch.failed(write);
            } else {
                batch.succeeded();
            }
        }
        let (remaining, report) = batch.finish();
        (remaining, report, attempted)
    }

    #[test]
    fn queue_keeps_insertion_order() {
        let mut queue = PendingQueue::from_writes(Vec::new(), 10);
        queue.push(save("a")).unwrap();
        queue.push(PendingWrite::Delete).unwrap();
        queue.push(save("b")).unwrap();

        let writes = queue.into_writes();
        assert_eq!(writes, vec![save("a"), PendingWrite::Delete, save("b")]);
    }

    #[test]
    fn queue_respects_capacity() {
        let mut queue = PendingQueue::from_writes(Vec::new(), 2);

        queue.push(save("a")).unwrap();
        queue.push(save("b")).unwrap();
        let overflow = queue.push(save("c"));

        assert_eq!(overflow, Err(QueueError::Full { capacity: 2 }));
        assert_eq!(queue.into_writes(), vec![save("a"), save("b")]);
    }

    #[test]
    fn from_writes_keeps_entries_over_capacity() {
        let mut queue = PendingQueue::from_writes(vec![save("a"), save("b"), save("c")], 2);

        assert_eq!(queue.push(save("d")), Err(QueueError::Full { capacity: 2 }));
        assert_eq!(queue.into_writes(), vec![save("a"), save("b"), save("c")]);
    }

    #[test]
    fn flush_of_empty_queue_does_nothing() {
        let (remaining, report, attempted) =
            run_flush(Vec::new(), FlushPolicy::ContinueOnFailure, &[]);

        assert!(remaining.is_empty());
        assert!(attempted.is_empty());
        assert_eq!(report, FlushReport::default());
        assert!(report.is_drained());
    }

    #[test]
    fn flush_all_succeeding_drains_queue() {
        let (remaining, report, _) = run_flush(
            vec![save("a"), save("b"), save("c")],
            FlushPolicy::ContinueOnFailure,
            &[],
        );

        assert!(remaining.is_empty());
        assert_eq!(report.attempted, 3);
        assert_eq!(report.succeeded, 3);
        assert!(report.is_drained());
    }

    #[test]
    fn continue_policy_attempts_every_write() {
        let (remaining, report, attempted) = run_flush(
            vec![save("a"), save("b"), save("c")],
            FlushPolicy::ContinueOnFailure,
            &["b"],
        );

        assert_eq!(attempted.len(), 3);
        assert_eq!(remaining, vec![save("b")]);
        assert_eq!(
            report,
            FlushReport {
                attempted: 3,
                succeeded: 2,
                failed: 1,
                remaining: 1,
            }
        );
    }

    #[test]
    fn continue_policy_keeps_relative_order_of_failures() {
        let (remaining, _, _) = run_flush(
            vec![save("a"), save("b"), save("c"), save("d")],
            FlushPolicy::ContinueOnFailure,
            &["a", "c"],
        );

        assert_eq!(remaining, vec![save("a"), save("c")]);
    }

    #[test]
    fn stop_policy_halts_at_first_failure() {
        let (remaining, report, attempted) = run_flush(
            vec![save("a"), save("b"), save("c")],
            FlushPolicy::StopAtFirstFailure,
            &["b"],
        );

        assert_eq!(attempted, vec![save("a"), save("b")]);
        assert_eq!(remaining, vec![save("b"), save("c")]);
        assert_eq!(report.attempted, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.remaining, 2);
    }

    #[test]
    fn stop_policy_failure_on_first_write_keeps_whole_queue() {
        let writes = vec![save("a"), PendingWrite::Delete, save("c")];
        let (remaining, report, _) =
            run_flush(writes.clone(), FlushPolicy::StopAtFirstFailure, &["a"]);

        assert_eq!(remaining, writes);
        assert_eq!(report.attempted, 1);
    }

    #[test]
    fn flush_policy_default_continues() {
        assert_eq!(FlushPolicy::default(), FlushPolicy::ContinueOnFailure);
    }

    #[test]
    fn flush_policy_uses_kebab_case_names() {
        let policy: FlushPolicy = serde_json::from_str("\"stop-at-first-failure\"").unwrap();
        assert_eq!(policy, FlushPolicy::StopAtFirstFailure);
    }
}
