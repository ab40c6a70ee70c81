//! Utility modules.

pub mod timestamp;

pub use timestamp::{Timestamp, format_rfc3339, parse_rfc3339};
