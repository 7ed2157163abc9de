//! Builder fixtures for constructing request values in tests.
//!
//! These builders carry sensible defaults so a test only states what it
//! cares about. They are compiled for tests and behind the `testing`
//! feature, never in production builds.

mod requests;

pub use requests::{ZapInRequestBuilder, ZapOutRequestBuilder};
