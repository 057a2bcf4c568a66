//! Download progress reporting.
//!
//! Rate-limits progress events by percentage so listeners see a handful of
//! milestones per download instead of one event per chunk.

mod milestones;

pub use milestones::ProgressMilestones;
