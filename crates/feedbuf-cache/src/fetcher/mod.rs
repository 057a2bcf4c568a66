//! Video fetcher adapters.

mod http;

pub use http::{HttpVideoFetcher, WritePlan};
