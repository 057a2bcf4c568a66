//! Task coordinator implementation.
//!
//! Runs named async operations such that operations sharing a resource never
//! overlap, a second request for an in-flight id joins the existing run, and
//! every run is bounded by a timeout.
//!
//! # Concurrency Model
//!
//! - Scheduling state lives in a `Schedule` behind a std `Mutex` that is
//!   never held across an `.await`
//! - Each started operation runs on its own spawned task
//! - Callers wait on a `Shared` future; joining means cloning it
//! - On a terminal transition the run releases its locks and leaves the
//!   bookkeeping *before* its outcome is delivered
//! - Lease tokens prevent runs that outlived `clear` from touching the
//!   bookkeeping of later runs

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tokio::sync::oneshot;

use feedbuf_core::{CoordinatorConfig, FeedError, FeedResult, ResourceWaitPolicy};

use crate::resource::{Operation, OperationId};
use crate::schedule::{LeaseId, Schedule, ScheduleSnapshot, StartedOp};

/// Type-erased result of one run.
type Outcome = Result<Arc<dyn Any + Send + Sync>, FeedError>;

/// Future every caller of one run waits on.
type SharedOutcome = Shared<BoxFuture<'static, Outcome>>;

/// Deferred body of an operation.
type Job = Box<dyn FnOnce() -> BoxFuture<'static, Outcome> + Send>;

/// Data carried by a pending operation until it starts.
struct Payload {
    job: Job,
    done: oneshot::Sender<Outcome>,
}

/// Outcome handle for an operation that is queued or running.
struct InFlight {
    outcome: SharedOutcome,
    result_type: TypeId,
}

#[derive(Default)]
struct CoordinatorState {
    schedule: Schedule<Payload>,
    in_flight: HashMap<OperationId, InFlight>,
}

struct Inner {
    state: Mutex<CoordinatorState>,
    config: CoordinatorConfig,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scheduler for de-duplicated, lock-guarded, time-bounded operations.
///
/// Cheap to clone; clones share the same scheduling state. Must be used
/// from within a tokio runtime.
#[derive(Clone)]
pub struct TaskCoordinator {
    inner: Arc<Inner>,
}

impl TaskCoordinator {
    /// Create a coordinator.
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(CoordinatorState::default()),
                config,
            }),
        }
    }

    /// The coordinator configuration.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    /// Schedule `task` as operation `op` and wait for its outcome.
    ///
    /// Registration happens when this method is called, not when the
    /// returned future is first polled, so calls are ordered by call time.
    ///
    /// - If `op.id` is already queued or running, no new execution starts;
    ///   the returned future resolves with that run's outcome. A joined
    ///   caller gets the original run's priority and timeout, not its own.
    /// - Otherwise the operation waits until none of its resources is held
    ///   (see [`ResourceWaitPolicy`]), acquires them all, and runs `task`
    ///   racing the configured timeout.
    ///
    /// Errors returned by `task` are surfaced unchanged. A panic surfaces
    /// as `OperationFailed`, exceeding the timeout as `OperationTimedOut`,
    /// and a `clear` before the run starts as `CoordinatorReset`. Joining an
    /// id whose run produces a different result type is `OperationFailed`.
    pub fn enqueue<T, F, Fut>(
        &self,
        op: Operation,
        task: F,
    ) -> impl Future<Output = FeedResult<T>> + Send + 'static
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = FeedResult<T>> + Send + 'static,
    {
        let id = op.id.clone();
        let job: Job = Box::new(move || {
            async move {
                let value = task().await?;
                Ok(Arc::new(value) as Arc<dyn Any + Send + Sync>)
            }
            .boxed()
        });
        let outcome = self.register(op, TypeId::of::<T>(), job);

        async move {
            let value = outcome.await?;
            value.downcast_ref::<T>().cloned().ok_or_else(|| {
                FeedError::operation_failed(id.as_str(), "joined operation has another result type")
            })
        }
    }

    /// Get a snapshot of pending operations, running operations and held locks.
    pub fn snapshot(&self) -> ScheduleSnapshot {
        self.inner.lock().schedule.snapshot()
    }

    /// Drop all bookkeeping: queued and running records and every lock.
    ///
    /// Queued operations never start and their callers fail with
    /// `CoordinatorReset`. Running operations are not cancelled; their
    /// callers still receive the outcome, but their locks are already gone.
    pub fn clear(&self) {
        let dropped = {
            let mut state = self.inner.lock();
            let running = state.schedule.running_len();
            state.in_flight.clear();
            let dropped = state.schedule.clear();
            tracing::info!(pending = dropped.len(), running, "Coordinator reset");
            dropped
        };
        // Dropping the senders fails every waiter of a queued operation.
        drop(dropped);
    }

    fn register(&self, op: Operation, result_type: TypeId, job: Job) -> SharedOutcome {
        let (outcome, started) = {
            let mut state = self.inner.lock();

            if let Some(existing) = state.in_flight.get(&op.id) {
                tracing::debug!(op = %op.id, "Joining in-flight operation");
                return existing.outcome.clone();
            }

            if self.inner.config.wait_policy == ResourceWaitPolicy::JoinHolder {
                let holder = state
                    .schedule
                    .conflicting(&op.resources)
                    .and_then(|holder| state.in_flight.get(holder).map(|f| (holder, f)))
                    .filter(|(_, f)| f.result_type == result_type);
                if let Some((holder, in_flight)) = holder {
                    tracing::debug!(op = %op.id, holder = %holder, "Joining resource holder");
                    return in_flight.outcome.clone();
                }
            }

            let (done, rx) = oneshot::channel();
            let name = op.id.to_string();
            let outcome = async move { rx.await.unwrap_or_else(|_| Err(FeedError::reset(name))) }
                .boxed()
                .shared();

            state.in_flight.insert(
                op.id.clone(),
                InFlight {
                    outcome: outcome.clone(),
                    result_type,
                },
            );
            tracing::debug!(
                op = %op.id,
                priority = op.priority,
                resources = ?op.resources.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "Operation queued"
            );
            state
                .schedule
                .submit(op.id, op.priority, op.resources, Payload { job, done });

            (outcome, state.schedule.start_ready())
        };

        launch(&self.inner, started);
        outcome
    }
}

impl std::fmt::Debug for TaskCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskCoordinator")
            .field("config", &self.inner.config)
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

impl Default for TaskCoordinator {
    fn default() -> Self {
        Self::new(CoordinatorConfig::default())
    }
}

/// Spawn one task per started operation.
fn launch(inner: &Arc<Inner>, started: Vec<StartedOp<Payload>>) {
    for op in started {
        tracing::debug!(
            op = %op.id,
            waited_ms = u64::try_from(op.waited.as_millis()).unwrap_or(u64::MAX),
            "Operation started"
        );
        tokio::spawn(run(Arc::clone(inner), op.id, op.lease, op.payload));
    }
}

/// Execute one run to its terminal state.
async fn run(inner: Arc<Inner>, id: OperationId, lease: LeaseId, payload: Payload) {
    let Payload { job, done } = payload;
    let timeout = inner.config.operation_timeout;

    let guarded = AssertUnwindSafe(async move { job().await }).catch_unwind();
    let outcome = match tokio::time::timeout(timeout, guarded).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(panic)) => {
            let message = panic_message(panic.as_ref());
            tracing::warn!(op = %id, panic = %message, "Operation panicked");
            Err(FeedError::operation_failed(id.as_str(), message))
        }
        Err(_) => {
            let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
            tracing::warn!(op = %id, timeout_ms, "Operation timed out");
            Err(FeedError::timed_out(id.as_str(), timeout_ms))
        }
    };

    let started = {
        let mut state = inner.lock();
        if let Some(held) = state.schedule.finish(&id, lease) {
            tracing::debug!(
                op = %id,
                held_ms = u64::try_from(held.as_millis()).unwrap_or(u64::MAX),
                "Operation finished"
            );
            state.in_flight.remove(&id);
            state.schedule.start_ready()
        } else {
            tracing::debug!(op = %id, "Ignoring stale completion (lease mismatch)");
            Vec::new()
        }
    };
    launch(&inner, started);

    if let Err(e) = &outcome {
        tracing::debug!(op = %id, error = %e, "Operation failed");
    }
    // Waiters may all be gone; nothing to do then.
    let _ = done.send(outcome);
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "task panicked".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Resource;
    use feedbuf_core::VideoId;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    fn coordinator() -> TaskCoordinator {
        TaskCoordinator::default()
    }

    #[tokio::test]
    async fn test_same_id_runs_once() {
        let coordinator = coordinator();
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let make_task = || {
            let calls = Arc::clone(&calls);
            let gate = Arc::clone(&gate);
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                gate.notified().await;
                Ok::<_, FeedError>("done".to_string())
            }
        };

        let first = coordinator.enqueue(Operation::new("load"), make_task());
        let second = coordinator.enqueue(Operation::new("load"), make_task());
        gate.notify_one();

        let (a, b) = tokio::join!(first, second);
        assert_eq!(a.unwrap(), "done");
        assert_eq!(b.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_joined_callers_share_failure() {
        let coordinator = coordinator();
        let gate = Arc::new(Notify::new());
        let g = Arc::clone(&gate);

        let first = coordinator.enqueue(Operation::new("fetch"), move || async move {
            g.notified().await;
            Err::<u32, _>(FeedError::catalog("offline"))
        });
        let second = coordinator.enqueue(Operation::new("fetch"), || async { Ok(7u32) });
        gate.notify_one();

        assert_eq!(first.await, Err(FeedError::catalog("offline")));
        assert_eq!(second.await, Err(FeedError::catalog("offline")));
    }

    #[tokio::test]
    async fn test_shared_resource_is_exclusive() {
        let coordinator = coordinator();
        let gate = Arc::new(Notify::new());
        let g = Arc::clone(&gate);

        let first = coordinator.enqueue(
            Operation::new("a").resource(Resource::Rotate),
            move || async move {
                g.notified().await;
                Ok(1u8)
            },
        );
        let second = coordinator.enqueue(
            Operation::new("b").resource(Resource::Rotate),
            || async { Ok(2u8) },
        );

        let snapshot = coordinator.snapshot();
        assert_eq!(snapshot.running, vec![OperationId::new("a")]);
        assert_eq!(snapshot.pending, vec![OperationId::new("b")]);
        assert_eq!(
            snapshot.locks,
            vec![("buffer_rotate".to_string(), OperationId::new("a"))]
        );

        gate.notify_one();
        assert_eq!(first.await, Ok(1));
        assert_eq!(second.await, Ok(2));
        assert_eq!(coordinator.snapshot(), ScheduleSnapshot::default());
    }

    #[tokio::test]
    async fn test_disjoint_resources_run_concurrently() {
        let coordinator = coordinator();
        // Both runs must be active at the same time to pass the barrier.
        let barrier = Arc::new(tokio::sync::Barrier::new(2));
        let (b1, b2) = (Arc::clone(&barrier), Arc::clone(&barrier));

        let a = coordinator.enqueue(
            Operation::new("preload_a").resource(Resource::Video(VideoId::new("a"))),
            move || async move {
                b1.wait().await;
                Ok(())
            },
        );
        let b = coordinator.enqueue(
            Operation::new("preload_b").resource(Resource::Video(VideoId::new("b"))),
            move || async move {
                b2.wait().await;
                Ok(())
            },
        );

        assert_eq!(coordinator.snapshot().running.len(), 2);
        let joined = tokio::time::timeout(Duration::from_secs(5), async { tokio::join!(a, b) })
            .await
            .expect("disjoint operations should overlap");
        assert!(joined.0.is_ok() && joined.1.is_ok());
    }

    #[tokio::test]
    async fn test_priority_order_behind_holder() {
        let coordinator = coordinator();
        let order = Arc::new(Mutex::new(Vec::new()));
        let gate = Arc::new(Notify::new());
        let g = Arc::clone(&gate);

        let holder = coordinator.enqueue(
            Operation::new("holder").resource(Resource::CacheCleanup),
            move || async move {
                g.notified().await;
                Ok(())
            },
        );

        let mut waiters = Vec::new();
        for (name, priority) in [("low-1", 0), ("high", 10), ("low-2", 0)] {
            let order = Arc::clone(&order);
            waiters.push(coordinator.enqueue(
                Operation::new(name)
                    .priority(priority)
                    .resource(Resource::CacheCleanup),
                move || async move {
                    order.lock().unwrap().push(name);
                    Ok(())
                },
            ));
        }

        gate.notify_one();
        holder.await.unwrap();
        for waiter in waiters {
            waiter.await.unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec!["high", "low-1", "low-2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_releases_locks() {
        let coordinator =
            TaskCoordinator::new(CoordinatorConfig::default().with_timeout(Duration::from_secs(30)));

        let result = coordinator
            .enqueue(
                Operation::new("slow").resource(Resource::CacheInit),
                || async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(())
                },
            )
            .await;

        assert_eq!(result, Err(FeedError::timed_out("slow", 30_000)));
        assert_eq!(coordinator.snapshot(), ScheduleSnapshot::default());
    }

    #[tokio::test]
    async fn test_task_error_is_surfaced_and_locks_released() {
        let coordinator = coordinator();
        let result = coordinator
            .enqueue(
                Operation::new("download").resource(Resource::Video(VideoId::new("x"))),
                || async { Err::<(), _>(FeedError::download_failed("x", "HTTP 404")) },
            )
            .await;

        assert_eq!(result, Err(FeedError::download_failed("x", "HTTP 404")));
        assert!(coordinator.snapshot().locks.is_empty());
    }

    #[tokio::test]
    async fn test_panic_becomes_operation_failed() {
        let coordinator = coordinator();
        let result: FeedResult<()> = coordinator
            .enqueue(
                Operation::new("boom").resource(Resource::Rotate),
                || async {
                    let corrupted = true;
                    assert!(!corrupted, "window corrupted");
                    Ok(())
                },
            )
            .await;

        match result {
            Err(FeedError::OperationFailed { operation, message }) => {
                assert_eq!(operation, "boom");
                assert!(message.contains("window corrupted"));
            }
            other => panic!("expected OperationFailed, got {other:?}"),
        }
        assert!(coordinator.snapshot().locks.is_empty());
    }

    #[tokio::test]
    async fn test_clear_fails_queued_waiters() {
        let coordinator = coordinator();
        let gate = Arc::new(Notify::new());
        let g = Arc::clone(&gate);

        let running = coordinator.enqueue(
            Operation::new("running").resource(Resource::Rotate),
            move || async move {
                g.notified().await;
                Ok(1u8)
            },
        );
        let queued = coordinator.enqueue(
            Operation::new("queued").resource(Resource::Rotate),
            || async { Ok(2u8) },
        );

        coordinator.clear();
        assert_eq!(queued.await, Err(FeedError::reset("queued")));

        // The running operation is not cancelled.
        gate.notify_one();
        assert_eq!(running.await, Ok(1));
        assert_eq!(coordinator.snapshot(), ScheduleSnapshot::default());
    }

    #[tokio::test]
    async fn test_join_holder_policy_attaches_to_holder() {
        let coordinator = TaskCoordinator::new(
            CoordinatorConfig::default().with_wait_policy(ResourceWaitPolicy::JoinHolder),
        );
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let (c1, g1) = (Arc::clone(&calls), Arc::clone(&gate));
        let forward = coordinator.enqueue(
            Operation::new("rotate_forward").resource(Resource::Rotate),
            move || async move {
                c1.fetch_add(1, Ordering::SeqCst);
                g1.notified().await;
                Ok(())
            },
        );
        let c2 = Arc::clone(&calls);
        let backward = coordinator.enqueue(
            Operation::new("rotate_backward").resource(Resource::Rotate),
            move || async move {
                c2.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        );

        gate.notify_one();
        let (f, b) = tokio::join!(forward, backward);
        tokio_test::assert_ok!(f);
        tokio_test::assert_ok!(b);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_join_with_other_result_type_fails() {
        let coordinator = coordinator();
        let gate = Arc::new(Notify::new());
        let g = Arc::clone(&gate);

        let first = coordinator.enqueue(Operation::new("op"), move || async move {
            g.notified().await;
            Ok(1u32)
        });
        let second = coordinator.enqueue(Operation::new("op"), || async { Ok("text".to_string()) });
        gate.notify_one();

        assert_eq!(first.await, Ok(1));
        assert!(matches!(
            second.await,
            Err(FeedError::OperationFailed { .. })
        ));
    }
}
