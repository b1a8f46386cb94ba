//! The compilation pipeline: phase offsets, repeat scheduling, preset
//! merging, step compilation and the plan-level orchestrator.

pub mod phase;
pub mod preset;
pub mod repeat;
pub mod resolvers;
pub mod step;
pub mod template;

pub use phase::calculate_offsets;
pub use preset::apply_preset;
pub use repeat::{schedule_repeats, RepeatSchedule};
pub use resolvers::{
    DimmerGenerator, GeometryResolver, MovementCurves, MovementGenerator, Noop, PatternLibrary,
};
pub use step::{StepCompiler, StepContext, StepOutput};
pub use template::{BeatGrid, ConstantTempo, TemplateCompiler, TemplateLibrary};
