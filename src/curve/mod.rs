//! The curve engine: generation of normalized value curves from specs,
//! pure post-processing transforms, and conversion to absolute channel
//! values. Every function here is deterministic and free of I/O.

pub mod dmx;
pub mod generator;
pub mod modifiers;
pub mod noise;

pub use dmx::{dimmer_curve_to_dmx, movement_curve_to_dmx, MappedCurve};
pub use generator::{generate, resample};
pub use modifiers::{
    apply_modifiers, center_curve, ensure_loop_ready, is_known_modifier, LoopClosure,
};
