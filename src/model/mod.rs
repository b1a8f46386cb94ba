pub mod curve;
pub mod easing;
pub mod fixture;
pub mod segment;
pub mod spec;
pub mod template;

// Re-export commonly used types at the model level.
pub use curve::{Curve, CurvePoint};
pub use easing::{EaseDirection, EaseFamily, Easing};
pub use fixture::{Calibration, FixtureContext, FixtureHandle, FixtureId, FixtureRole};
pub use segment::{ChannelSegment, ScheduledInstance, TemplateCompileResult};
pub use spec::{
    ChannelName, CurveKind, CurveSpec, DimmerSpec, GeometrySpec, MovementSpec, NativeCurveKind,
    PhaseOffsetMode, RemainderPolicy, RepeatContract, RepeatMode,
};
pub use template::{
    BarTiming, DefaultsPatch, PlaybackPlan, PlaybackWindowBars, StepPatch, Template,
    TemplateDefaults, TemplatePreset, TemplateStep,
};
