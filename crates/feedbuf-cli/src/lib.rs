//! Command-line adapter for the feed buffer.
//!
//! - `walk` opens a feed window over a JSON catalog and rotates through it
//! - `cache` inspects and maintains the disk cache
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

#[cfg(test)]
use tokio_test as _;

pub mod bootstrap;
pub mod catalog;
pub mod commands;
pub mod handlers;
pub mod parser;
pub mod presentation;

// Re-export primary types for convenient access
pub use bootstrap::{
    CliConfig, CliContext, TracingCacheEmitter, bootstrap, init_logging, load_env,
};
pub use catalog::JsonFileCatalog;
pub use commands::{CacheCommand, Commands, WalkArgs};
pub use parser::Cli;
