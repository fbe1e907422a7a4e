//! Common types and utilities shared across the NOMAD STAC crates.

pub mod bbox;
pub mod time;

pub use bbox::BoundingBox;
pub use time::{parse_timestamp, TimeParseError, TimeRange};
