//! Codec for the external XML show-control sequence format: an
//! in-memory model, dedup registries, an exporter from compile results
//! and the inverse parser.

pub mod export;
pub mod model;
pub mod parse;
pub mod registry;

pub use export::{export, settings_for_curve, write};
pub use model::{EffectLayer, EffectPlacement, ElementEffects, SequenceHead, XSequence};
pub use parse::parse;
pub use registry::DedupTable;
