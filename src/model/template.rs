use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::spec::{DimmerSpec, GeometrySpec, MovementSpec, PhaseOffsetMode, RepeatContract};

/// Step duration expressed in musical bars. Conversion to milliseconds
/// happens at schedule time via the external beat grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarTiming {
    pub duration_bars: f64,
}

/// One instruction unit of a template: what the fixtures point at, how
/// they move, how bright they are, and how that repeats. Immutable once
/// constructed; preset application produces new values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateStep {
    pub step_id: String,
    pub base_timing: BarTiming,
    pub geometry: GeometrySpec,
    pub movement: MovementSpec,
    pub dimmer: DimmerSpec,
    #[serde(default)]
    pub phase_offset: PhaseOffsetMode,
    #[serde(default)]
    pub repeat_contract: Option<RepeatContract>,
}

/// Template-wide knobs every step inherits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDefaults {
    /// Global dimmer scale in [0, 1].
    pub intensity: f64,
    /// Global movement amplitude scale.
    pub amplitude_scale: f64,
    /// Curve modifier names applied to every generated movement curve.
    #[serde(default)]
    pub modifiers: Vec<String>,
}

impl Default for TemplateDefaults {
    fn default() -> Self {
        Self {
            intensity: 1.0,
            amplitude_scale: 1.0,
            modifiers: Vec::new(),
        }
    }
}

/// A reusable, declarative multi-step choreography definition. Step
/// order is significant: it defines the default playback sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub template_id: String,
    pub steps: Vec<TemplateStep>,
    #[serde(default)]
    pub defaults: TemplateDefaults,
}

impl Template {
    pub fn step(&self, step_id: &str) -> Option<&TemplateStep> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }
}

// ── Preset patches ──────────────────────────────────────────────────

/// Field-level overlay for [`TemplateDefaults`]. `None` leaves the base
/// value untouched; `Some` overwrites it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DefaultsPatch {
    #[serde(default)]
    pub intensity: Option<f64>,
    #[serde(default)]
    pub amplitude_scale: Option<f64>,
    #[serde(default)]
    pub modifiers: Option<Vec<String>>,
}

/// Field-level overlay for one [`TemplateStep`], matched by `step_id`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StepPatch {
    #[serde(default)]
    pub duration_bars: Option<f64>,
    #[serde(default)]
    pub geometry: Option<GeometrySpec>,
    #[serde(default)]
    pub movement: Option<MovementSpec>,
    #[serde(default)]
    pub dimmer: Option<DimmerSpec>,
    #[serde(default)]
    pub phase_offset: Option<PhaseOffsetMode>,
    #[serde(default)]
    pub repeat_contract: Option<RepeatContract>,
}

impl StepPatch {
    pub fn is_empty(&self) -> bool {
        self.duration_bars.is_none()
            && self.geometry.is_none()
            && self.movement.is_none()
            && self.dimmer.is_none()
            && self.phase_offset.is_none()
            && self.repeat_contract.is_none()
    }
}

/// A named patch set applied functionally to a base template. The base
/// template is never mutated, so one template can be safely shared
/// across many preset variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplatePreset {
    pub preset_id: String,
    #[serde(default)]
    pub defaults_patch: DefaultsPatch,
    /// step_id → patch. Referencing a step the template does not have is
    /// a validation error at apply time.
    #[serde(default)]
    pub step_patches: HashMap<String, StepPatch>,
}

// ── Playback plans ──────────────────────────────────────────────────

/// The slice of the song a compilation covers, in bars. `start_bar` must
/// be ≥ 0 and `duration_bars` > 0; enforced at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PlaybackWindowRaw")]
pub struct PlaybackWindowBars {
    start_bar: f64,
    duration_bars: f64,
}

#[derive(Deserialize)]
struct PlaybackWindowRaw {
    start_bar: f64,
    duration_bars: f64,
}

impl TryFrom<PlaybackWindowRaw> for PlaybackWindowBars {
    type Error = String;
    fn try_from(raw: PlaybackWindowRaw) -> Result<Self, String> {
        PlaybackWindowBars::new(raw.start_bar, raw.duration_bars).ok_or_else(|| {
            format!(
                "Invalid playback window: start_bar={}, duration_bars={}",
                raw.start_bar, raw.duration_bars
            )
        })
    }
}

impl PlaybackWindowBars {
    /// Create a playback window. Returns None if `start_bar` is negative
    /// or `duration_bars` is not strictly positive.
    pub fn new(start_bar: f64, duration_bars: f64) -> Option<Self> {
        if start_bar >= 0.0 && duration_bars > 0.0 {
            Some(Self {
                start_bar,
                duration_bars,
            })
        } else {
            None
        }
    }

    pub fn start_bar(&self) -> f64 {
        self.start_bar
    }

    pub fn duration_bars(&self) -> f64 {
        self.duration_bars
    }

    pub fn end_bar(&self) -> f64 {
        self.start_bar + self.duration_bars
    }
}

/// A concrete compilation request: which template, optionally under
/// which preset, over which window, with plan-level tweaks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackPlan {
    pub template_id: String,
    #[serde(default)]
    pub preset_id: Option<String>,
    pub window: PlaybackWindowBars,
    /// Curve modifier names applied on top of the template defaults.
    #[serde(default)]
    pub modifiers: Vec<String>,
    /// cycle_number → step patch, applied to a step before compiling the
    /// scheduled instance with that cycle number.
    #[serde(default)]
    pub per_cycle_overrides: HashMap<usize, StepPatch>,
}
