use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::curve::CurvePoint;
use super::easing::Easing;
use super::fixture::FixtureId;

/// The closed set of fixture channels the compiler emits segments for.
/// Ordering is significant: compile results are sorted by
/// `(fixture_id, channel, start_ms)`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ChannelName {
    Pan,
    Tilt,
    Dimmer,
    Shutter,
    Color,
    Gobo,
}

impl ChannelName {
    /// Stable on-wire name, used by the sequence codec.
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelName::Pan => "Pan",
            ChannelName::Tilt => "Tilt",
            ChannelName::Dimmer => "Dimmer",
            ChannelName::Shutter => "Shutter",
            ChannelName::Color => "Color",
            ChannelName::Gobo => "Gobo",
        }
    }

    /// Inverse of [`ChannelName::as_str`].
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pan" => Some(ChannelName::Pan),
            "Tilt" => Some(ChannelName::Tilt),
            "Dimmer" => Some(ChannelName::Dimmer),
            "Shutter" => Some(ChannelName::Shutter),
            "Color" => Some(ChannelName::Color),
            "Gobo" => Some(ChannelName::Gobo),
            _ => None,
        }
    }
}

// ── Curve specifications ────────────────────────────────────────────

/// Generator families for materialized curves. Every variant is sampled
/// onto a uniform time grid by the curve generator; none of these can be
/// evaluated natively by the target show-control renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CurveKind {
    /// Flat hold at `level`.
    Flat { level: f64 },
    /// Linear ramp 0 → 1.
    Ramp,
    /// Sine wave centered on 0.5: `0.5 + 0.5·amplitude·sin(2π·cycles·t + phase)`.
    Sine { amplitude: f64, cycles: f64, phase: f64 },
    /// Cosine wave centered on 0.5.
    Cosine { amplitude: f64, cycles: f64, phase: f64 },
    /// Eased ramp 0 → 1.
    Ease { easing: Easing },
    /// Musical pulse train: one decaying pulse per beat subdivision,
    /// the first pulse of the window scaled by `accent` to mark the
    /// downbeat.
    BeatPulse { subdivision: u32, accent: f64 },
    /// Anticipation: pull back below zero, then ease into 1.0.
    Anticipate { depth: f64 },
    /// Overshoot: pass 1.0, then settle back onto it with a
    /// critically-damped decay.
    Overshoot { intensity: f64 },
    /// Cubic Bézier through (0,0) and (1,1) with two interior control
    /// points, all coordinates normalized to [0,1].
    Bezier { x1: f64, y1: f64, x2: f64, y2: f64 },
    /// One axis of a Lissajous figure: `0.5 + 0.5·sin(2π·b·t + delta)`
    /// with harmonic ratio `b`.
    Lissajous { b: f64, delta: f64 },
    /// Coherent 1-D value noise with `octaves` layers, deterministic in
    /// `seed`.
    Noise { octaves: u32, seed: u64 },
    /// Explicit point array, resampled onto the uniform grid.
    Points { points: Vec<CurvePoint> },
}

impl CurveKind {
    /// Discriminator name, used in error messages and the codec.
    pub fn name(&self) -> &'static str {
        match self {
            CurveKind::Flat { .. } => "flat",
            CurveKind::Ramp => "ramp",
            CurveKind::Sine { .. } => "sine",
            CurveKind::Cosine { .. } => "cosine",
            CurveKind::Ease { .. } => "ease",
            CurveKind::BeatPulse { .. } => "beat_pulse",
            CurveKind::Anticipate { .. } => "anticipate",
            CurveKind::Overshoot { .. } => "overshoot",
            CurveKind::Bezier { .. } => "bezier",
            CurveKind::Lissajous { .. } => "lissajous",
            CurveKind::Noise { .. } => "noise",
            CurveKind::Points { .. } => "points",
        }
    }
}

/// Closed-form curve shapes the target renderer evaluates analytically.
/// These serialize as a compact parameter string instead of a point array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NativeCurveKind {
    Flat,
    Ramp,
    Sine,
    Square,
}

impl NativeCurveKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NativeCurveKind::Flat => "Flat",
            NativeCurveKind::Ramp => "Ramp",
            NativeCurveKind::Sine => "Sine",
            NativeCurveKind::Square => "Square",
        }
    }
}

/// How a value curve is expressed to the target format: either a native
/// closed form (parameters p1-p4 interpreted per kind), or a custom
/// generator that must be materialized as an explicit point array here
/// because the target cannot evaluate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CurveSpec {
    Native {
        kind: NativeCurveKind,
        p1: f64,
        p2: f64,
        p3: f64,
        p4: f64,
        reverse: bool,
    },
    Custom { generator: CurveKind },
}

// ── Step specifications ─────────────────────────────────────────────

/// What a step does to the pan/tilt base pose. The pattern variant
/// indexes a static pattern library; unknown identifiers surface as
/// `UnsupportedSpec` at resolve time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GeometrySpec {
    /// Keep fixtures at their centered home pose.
    Hold,
    /// Explicit shared base pose, degrees relative to center.
    Pose { pan_deg: f64, tilt_deg: f64 },
    /// Library pose pattern spread across the fixture group.
    Pattern { pattern: String, spread_deg: f64 },
}

/// Animated pan/tilt offset applied on top of the base pose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MovementSpec {
    /// No motion; fixtures stay on their base pose.
    None,
    /// Library motion pattern.
    Pattern {
        pattern: String,
        amplitude_deg: f64,
        cycles: f64,
    },
    /// Explicit per-axis curve specs. `None` on an axis emits no segment
    /// for that axis.
    Explicit {
        pan: Option<CurveSpec>,
        tilt: Option<CurveSpec>,
        amplitude_deg: f64,
        cycles: f64,
    },
}

/// Brightness behavior of a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DimmerSpec {
    /// Dimmer untouched; no segment emitted.
    Off,
    /// Constant brightness fraction [0,1].
    Hold { level: f64 },
    /// Library dimmer pattern.
    Pattern {
        pattern: String,
        intensity: f64,
        cycles: f64,
    },
    /// Explicit curve mapped onto `[floor, ceiling]` brightness fractions.
    Explicit {
        curve: CurveSpec,
        floor: f64,
        ceiling: f64,
    },
}

// ── Phase offsets & repetition ──────────────────────────────────────

/// How a shared movement curve is staggered across the fixture group.
/// Offsets are a pure function of fixture index and count, never of the
/// identifier values, so reordering-insensitive determinism holds.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum PhaseOffsetMode {
    /// All fixtures move in unison.
    #[default]
    None,
    /// Offsets evenly spaced across [0, 1) by fixture index ("chase").
    UniformSpread,
    /// Explicit per-fixture offsets; unlisted fixtures default to 0.
    Custom { offsets: HashMap<FixtureId, f64> },
}

/// Loop vs. alternating-direction repetition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatMode {
    /// Every cycle is identical.
    Loop,
    /// Odd cycles run the movement in reverse (signaled via
    /// `ScheduledInstance::cycle_number` parity).
    PingPong,
}

/// What happens to a partial trailing cycle shorter than `cycle_bars`.
/// Explicit on the contract, never inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemainderPolicy {
    /// Drop the partial cycle.
    #[default]
    Drop,
    /// Emit it as a truncated instance.
    Truncate,
}

/// How a step's pattern repeats across a playback window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RepeatContract {
    /// Length of one cycle in musical bars. Must be > 0.
    pub cycle_bars: f64,
    pub mode: RepeatMode,
    #[serde(default)]
    pub remainder: RemainderPolicy,
}
