//! Schedule item types (internal implementation).

use std::time::Instant;

use crate::resource::{OperationId, Resource};

/// Lease for one execution of an operation.
///
/// Used to ignore stale completions from runs that outlived a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LeaseId(pub(crate) u64);

/// An operation waiting for its resources.
#[derive(Debug)]
pub struct PendingOp<P> {
    /// De-duplication key.
    pub id: OperationId,
    /// Higher runs first.
    pub priority: i32,
    /// Monotonic submission counter; breaks priority ties (FIFO).
    pub seq: u64,
    /// When the operation was submitted.
    pub enqueued_at: Instant,
    /// Locks to acquire on start.
    pub resources: Vec<Resource>,
    /// Caller data carried to the start transition.
    pub payload: P,
}

impl<P> PendingOp<P> {
    /// Ordering key: priority descending, then submission order.
    pub(crate) const fn order_key(&self) -> (std::cmp::Reverse<i32>, u64) {
        (std::cmp::Reverse(self.priority), self.seq)
    }
}

/// Bookkeeping for a started operation.
#[derive(Debug, Clone)]
pub struct RunningOp {
    /// Lease of the current run.
    pub lease: LeaseId,
    /// Locks held by the run.
    pub resources: Vec<Resource>,
    /// When the run started.
    pub started_at: Instant,
}

/// An operation that just transitioned from pending to running.
#[derive(Debug)]
pub struct StartedOp<P> {
    /// De-duplication key.
    pub id: OperationId,
    /// Lease identifying this run.
    pub lease: LeaseId,
    /// Time spent waiting for resources.
    pub waited: std::time::Duration,
    /// Caller data.
    pub payload: P,
}

/// Point-in-time view of the schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleSnapshot {
    /// Waiting operations in start order.
    pub pending: Vec<OperationId>,
    /// Running operations, sorted by id.
    pub running: Vec<OperationId>,
    /// Held locks, sorted by resource name.
    pub locks: Vec<(String, OperationId)>,
}
