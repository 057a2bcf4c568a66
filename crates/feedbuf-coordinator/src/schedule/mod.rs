//! Operation scheduling state.
//!
//! This module provides a pure state machine for pending operations,
//! running leases and resource locks. No I/O is performed here; the
//! `TaskCoordinator` spawns whatever this machine decides to start.
//!
//! # Design
//!
//! - Pure synchronous state machine (no async, no IO, no tracing)
//! - Deterministic: same inputs always produce same outputs
//!
//! # Start Order
//!
//! - Pending operations are ordered by priority (descending), then by
//!   submission order
//! - An operation starts only when none of its resources is held
//! - A blocked operation reserves its resources, so a later operation
//!   needing any of them cannot overtake it (strict per-resource FIFO)

mod types;

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use crate::resource::{OperationId, Resource};

pub use types::{LeaseId, PendingOp, RunningOp, ScheduleSnapshot, StartedOp};

/// Manages pending operations, running leases and resource locks.
///
/// This is a sync type with no internal locking; the caller
/// (`TaskCoordinator`) is responsible for synchronization.
#[derive(Debug)]
pub struct Schedule<P> {
    pending: Vec<PendingOp<P>>,
    running: HashMap<OperationId, RunningOp>,
    locks: HashMap<Resource, OperationId>,
    next_seq: u64,
    next_lease: u64,
}

impl<P> Schedule<P> {
    /// Create an empty schedule.
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            running: HashMap::new(),
            locks: HashMap::new(),
            next_seq: 0,
            next_lease: 0,
        }
    }

    /// Number of running operations.
    pub fn running_len(&self) -> usize {
        self.running.len()
    }

    /// The running operation holding `resource`, if any.
    pub fn holder(&self, resource: &Resource) -> Option<&OperationId> {
        self.locks.get(resource)
    }

    /// The operation a request for `resources` would have to wait for.
    ///
    /// Running holders come first; otherwise the earliest pending
    /// operation that reserved one of the resources.
    pub fn conflicting(&self, resources: &[Resource]) -> Option<&OperationId> {
        resources
            .iter()
            .find_map(|r| self.locks.get(r))
            .or_else(|| {
                self.pending
                    .iter()
                    .find(|op| op.resources.iter().any(|r| resources.contains(r)))
                    .map(|op| &op.id)
            })
    }

    /// Submit an operation.
    ///
    /// The caller guarantees `id` is neither pending nor running.
    pub fn submit(&mut self, id: OperationId, priority: i32, resources: Vec<Resource>, payload: P) {
        let seq = self.next_seq;
        self.next_seq += 1;

        let op = PendingOp {
            id,
            priority,
            seq,
            enqueued_at: Instant::now(),
            resources,
            payload,
        };
        let key = op.order_key();
        let index = self.pending.partition_point(|other| other.order_key() <= key);
        self.pending.insert(index, op);
    }

    /// Start every operation whose resources are free, in start order.
    ///
    /// Locks are acquired atomically with the transition to running.
    pub fn start_ready(&mut self) -> Vec<StartedOp<P>> {
        let mut reserved: HashSet<Resource> = HashSet::new();
        let mut kept = Vec::with_capacity(self.pending.len());
        let mut started = Vec::new();

        for op in std::mem::take(&mut self.pending) {
            let blocked = op
                .resources
                .iter()
                .any(|r| self.locks.contains_key(r) || reserved.contains(r));

            if blocked {
                reserved.extend(op.resources.iter().cloned());
                kept.push(op);
                continue;
            }

            let lease = LeaseId(self.next_lease);
            self.next_lease += 1;

            for resource in &op.resources {
                self.locks.insert(resource.clone(), op.id.clone());
            }
            self.running.insert(
                op.id.clone(),
                RunningOp {
                    lease,
                    resources: op.resources.clone(),
                    started_at: Instant::now(),
                },
            );
            started.push(StartedOp {
                id: op.id,
                lease,
                waited: op.enqueued_at.elapsed(),
                payload: op.payload,
            });
        }

        self.pending = kept;
        started
    }

    /// Record the terminal transition of a run and release its locks.
    ///
    /// Returns how long the run held its locks, or `None` (changing nothing)
    /// if the lease is stale, i.e. the run was dropped by `clear` and the id
    /// may have been reused.
    pub fn finish(&mut self, id: &OperationId, lease: LeaseId) -> Option<Duration> {
        match self.running.get(id) {
            Some(run) if run.lease == lease => {}
            _ => return None,
        }

        let run = self.running.remove(id)?;
        for resource in &run.resources {
            if self.locks.get(resource) == Some(id) {
                self.locks.remove(resource);
            }
        }
        Some(run.started_at.elapsed())
    }

    /// Drop all bookkeeping, returning the operations that never started.
    pub fn clear(&mut self) -> Vec<PendingOp<P>> {
        self.running.clear();
        self.locks.clear();
        std::mem::take(&mut self.pending)
    }

    /// Get a snapshot of the current state.
    pub fn snapshot(&self) -> ScheduleSnapshot {
        let mut running: Vec<_> = self.running.keys().cloned().collect();
        running.sort();

        let mut locks: Vec<_> = self
            .locks
            .iter()
            .map(|(resource, holder)| (resource.to_string(), holder.clone()))
            .collect();
        locks.sort();

        ScheduleSnapshot {
            pending: self.pending.iter().map(|op| op.id.clone()).collect(),
            running,
            locks,
        }
    }
}

impl<P> Default for Schedule<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedbuf_core::VideoId;

    fn op(id: &str) -> OperationId {
        OperationId::new(id)
    }

    fn started_ids(started: &[StartedOp<()>]) -> Vec<&str> {
        started.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_free_operations_start_immediately() {
        let mut schedule = Schedule::new();
        schedule.submit(op("a"), 0, vec![Resource::Rotate], ());
        schedule.submit(op("b"), 0, vec![Resource::CacheCleanup], ());

        let started = schedule.start_ready();
        assert_eq!(started_ids(&started), vec!["a", "b"]);
        assert_eq!(schedule.running_len(), 2);
        assert_eq!(schedule.holder(&Resource::Rotate), Some(&op("a")));
    }

    #[test]
    fn test_shared_resource_blocks_second() {
        let mut schedule = Schedule::new();
        schedule.submit(op("a"), 0, vec![Resource::Rotate], ());
        schedule.submit(op("b"), 0, vec![Resource::Rotate], ());

        let started = schedule.start_ready();
        assert_eq!(started_ids(&started), vec!["a"]);
        assert_eq!(schedule.snapshot().pending, vec![op("b")]);

        assert!(schedule.finish(&op("a"), started[0].lease).is_some());
        let started = schedule.start_ready();
        assert_eq!(started_ids(&started), vec!["b"]);
    }

    #[test]
    fn test_priority_then_fifo() {
        let mut schedule = Schedule::new();
        schedule.submit(op("holder"), 0, vec![Resource::CacheCleanup], ());
        let holder = schedule.start_ready().remove(0);

        schedule.submit(op("low-1"), 0, vec![Resource::CacheCleanup], ());
        schedule.submit(op("high"), 5, vec![Resource::CacheCleanup], ());
        schedule.submit(op("low-2"), 0, vec![Resource::CacheCleanup], ());
        assert_eq!(
            schedule.snapshot().pending,
            vec![op("high"), op("low-1"), op("low-2")]
        );

        schedule.finish(&op("holder"), holder.lease);
        let mut order = Vec::new();
        loop {
            let started = schedule.start_ready();
            let Some(next) = started.into_iter().next() else {
                break;
            };
            order.push(next.id.to_string());
            schedule.finish(&next.id, next.lease);
        }
        assert_eq!(order, vec!["high", "low-1", "low-2"]);
    }

    #[test]
    fn test_blocked_operation_reserves_its_resources() {
        let video = Resource::Video(VideoId::new("v1"));
        let mut schedule = Schedule::new();
        schedule.submit(op("cleanup"), 0, vec![Resource::CacheCleanup], ());
        schedule.start_ready();

        // Needs both; blocked on cleanup, so it reserves video_v1 as well.
        schedule.submit(op("both"), 0, vec![Resource::CacheCleanup, video.clone()], ());
        schedule.submit(op("video-only"), 0, vec![video], ());

        let started = schedule.start_ready();
        assert!(started.is_empty());
        assert_eq!(schedule.snapshot().pending.len(), 2);
    }

    #[test]
    fn test_finish_reports_time_held() {
        let mut schedule = Schedule::new();
        schedule.submit(op("a"), 0, vec![Resource::Rotate], ());
        let started = schedule.start_ready().remove(0);
        std::thread::sleep(Duration::from_millis(5));

        let held = schedule.finish(&op("a"), started.lease).unwrap();

        assert!(held >= Duration::from_millis(5));
        assert!(schedule.finish(&op("a"), started.lease).is_none());
    }

    #[test]
    fn test_stale_lease_is_ignored() {
        let mut schedule = Schedule::new();
        schedule.submit(op("a"), 0, vec![Resource::Rotate], ());
        let first = schedule.start_ready().remove(0);

        schedule.clear();
        schedule.submit(op("a"), 0, vec![Resource::Rotate], ());
        let second = schedule.start_ready().remove(0);

        assert!(schedule.finish(&op("a"), first.lease).is_none());
        assert_eq!(schedule.holder(&Resource::Rotate), Some(&op("a")));
        assert!(schedule.finish(&op("a"), second.lease).is_some());
        assert_eq!(schedule.holder(&Resource::Rotate), None);
    }

    #[test]
    fn test_clear_returns_pending() {
        let mut schedule = Schedule::new();
        schedule.submit(op("a"), 0, vec![Resource::Rotate], ());
        schedule.submit(op("b"), 0, vec![Resource::Rotate], ());
        schedule.start_ready();

        let dropped = schedule.clear();
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].id, op("b"));
        assert_eq!(schedule.snapshot(), ScheduleSnapshot::default());
    }

    #[test]
    fn test_conflicting_prefers_running_holder() {
        let mut schedule = Schedule::new();
        schedule.submit(op("a"), 0, vec![Resource::Rotate], ());
        schedule.start_ready();
        schedule.submit(op("b"), 0, vec![Resource::Rotate], ());

        assert_eq!(schedule.conflicting(&[Resource::Rotate]), Some(&op("a")));
        assert_eq!(schedule.conflicting(&[Resource::CacheInit]), None);
    }
}
