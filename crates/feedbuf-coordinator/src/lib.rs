//! Task coordinator for feedbuf.
//!
//! Serializes and de-duplicates async operations that touch shared
//! resources, and bounds every operation with a timeout.
//!
//! - `resource` - operation ids, scheduling parameters, lockable resources
//! - `schedule` - pure scheduling state machine (pending, running, locks)
//! - `coordinator` - the async runner

mod coordinator;
pub mod resource;
pub mod schedule;

pub use coordinator::TaskCoordinator;
pub use resource::{Operation, OperationId, Resource};
pub use schedule::ScheduleSnapshot;
