//! Deterministic compiler from declarative moving-head choreography
//! templates to show-control sequence files.
//!
//! The pipeline runs in three stages, all pure and synchronous:
//! normalized value curves are generated from specs ([`curve`]),
//! resolved against fixtures, timing and repeat contracts into absolute
//! per-channel segments ([`compile`]), and serialized to the external
//! XML sequence format with deduplicated settings tables ([`sequence`]).

pub mod compile;
pub mod curve;
pub mod error;
pub mod model;
pub mod sequence;

pub use error::CompileError;
