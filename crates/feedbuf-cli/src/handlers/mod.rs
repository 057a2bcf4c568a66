//! Command handlers.
//!
//! Handlers follow one pattern:
//! - Signature: `pub async fn execute(ctx: &CliContext, ...) -> Result<()>`
//! - Thin wrappers that call into the feed and cache crates and format the
//!   result for the terminal

pub mod cache;
pub mod walk;
