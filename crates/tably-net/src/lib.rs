mod cache;
mod client;

pub use cache::TtlCache;
pub use client::{ResilientClient, RetryPolicy};
