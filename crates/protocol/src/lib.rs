//! Wire types for carbon-track.
//!
//! A run reads one [`TrackRequest`] from stdin and writes one
//! [`EmissionsReport`] to stdout, both as JSON objects.

mod report;
mod request;

pub use report::EmissionsReport;
pub use request::{RequestError, TrackRequest, DEFAULT_DURATION_SECS};
