//! The top-level compiler: resolves a playback plan against the
//! template/preset library, schedules step instances across the window,
//! compiles each instance per fixture and merges the segments into one
//! ordered result.

use std::collections::HashMap;

use crate::compile::preset::{apply_preset, merge_step};
use crate::compile::repeat::schedule_repeats;
use crate::compile::step::{StepCompiler, StepContext};
use crate::error::CompileError;
use crate::model::fixture::FixtureContext;
use crate::model::segment::{ScheduledInstance, TemplateCompileResult};
use crate::model::template::{PlaybackPlan, Template, TemplatePreset};

/// String-ID lookup store for templates and presets. The compiler only
/// reads it; population is the caller's concern (the CLI loads JSON
/// documents into it).
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    templates: HashMap<String, Template>,
    presets: HashMap<String, TemplatePreset>,
}

impl TemplateLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_template(&mut self, template: Template) {
        self.templates.insert(template.template_id.clone(), template);
    }

    pub fn add_preset(&mut self, preset: TemplatePreset) {
        self.presets.insert(preset.preset_id.clone(), preset);
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown template ID.
    pub fn template(&self, id: &str) -> Result<&Template, CompileError> {
        self.templates
            .get(id)
            .ok_or_else(|| CompileError::not_found(format!("template '{id}'")))
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown preset ID.
    pub fn preset(&self, id: &str) -> Result<&TemplatePreset, CompileError> {
        self.presets
            .get(id)
            .ok_or_else(|| CompileError::not_found(format!("preset '{id}'")))
    }
}

/// Musical-time conversion supplied by the timing subsystem. The
/// compiler never computes tempo itself.
pub trait BeatGrid {
    /// Absolute milliseconds at a (possibly fractional) bar position.
    /// Must be monotonic and deterministic.
    fn bars_to_ms(&self, bar: f64) -> u64;
}

/// Fixed tempo and meter for the whole window. Covers the common case;
/// anything with tempo changes implements [`BeatGrid`] itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantTempo {
    bpm: f64,
    beats_per_bar: u32,
}

impl ConstantTempo {
    /// Returns None unless `bpm` is strictly positive and the meter has
    /// at least one beat per bar.
    pub fn new(bpm: f64, beats_per_bar: u32) -> Option<Self> {
        if bpm > 0.0 && beats_per_bar > 0 {
            Some(Self { bpm, beats_per_bar })
        } else {
            None
        }
    }
}

impl BeatGrid for ConstantTempo {
    fn bars_to_ms(&self, bar: f64) -> u64 {
        let ms = bar * f64::from(self.beats_per_bar) * 60_000.0 / self.bpm;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            ms.max(0.0).round() as u64
        }
    }
}

/// Orchestrator tying the whole pipeline together for one plan.
pub struct TemplateCompiler<'a> {
    pub library: &'a TemplateLibrary,
    pub grid: &'a dyn BeatGrid,
    pub steps: StepCompiler<'a>,
}

impl TemplateCompiler<'_> {
    /// Compile one playback plan for one fixture context.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown template or preset ID (raised before
    /// any compilation work); every scheduler and resolver error
    /// propagates unchanged, producing no partial result.
    pub fn compile(
        &self,
        plan: &PlaybackPlan,
        fixtures: &FixtureContext,
    ) -> Result<TemplateCompileResult, CompileError> {
        let base = self.library.template(&plan.template_id)?;
        let template = match &plan.preset_id {
            Some(preset_id) => {
                let preset = self.library.preset(preset_id)?;
                apply_preset(base, preset)?
            }
            None => base.clone(),
        };

        let window = plan.window;
        let mut segments = Vec::new();
        let mut warnings = Vec::new();

        for step in &template.steps {
            let instances = match &step.repeat_contract {
                Some(contract) => {
                    let schedule =
                        schedule_repeats(&step.step_id, contract, window.duration_bars())?;
                    warnings.extend(schedule.warnings);
                    schedule.instances
                }
                None => vec![ScheduledInstance {
                    step_id: step.step_id.clone(),
                    start_bars: 0.0,
                    end_bars: window.duration_bars(),
                    cycle_number: 0,
                }],
            };

            for instance in instances {
                let effective = match plan.per_cycle_overrides.get(&instance.cycle_number) {
                    Some(patch) if !patch.is_empty() => {
                        let mut patched = step.clone();
                        merge_step(&mut patched, patch);
                        patched
                    }
                    _ => step.clone(),
                };
                let ctx = StepContext {
                    fixtures,
                    start_ms: self.grid.bars_to_ms(window.start_bar() + instance.start_bars),
                    end_ms: self.grid.bars_to_ms(window.start_bar() + instance.end_bars),
                    cycle_number: instance.cycle_number,
                    defaults: &template.defaults,
                    extra_modifiers: &plan.modifiers,
                };
                let out = self.steps.compile_step(&effective, &ctx)?;
                segments.extend(out.segments);
                warnings.extend(out.warnings);
            }
        }

        Ok(TemplateCompileResult::new(segments, warnings))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::compile::resolvers::PatternLibrary;
    use crate::model::fixture::{Calibration, FixtureHandle, FixtureId, FixtureRole};
    use crate::model::spec::{
        ChannelName, DimmerSpec, GeometrySpec, MovementSpec, PhaseOffsetMode, RemainderPolicy,
        RepeatContract, RepeatMode,
    };
    use crate::model::template::{
        BarTiming, PlaybackWindowBars, StepPatch, TemplateDefaults, TemplateStep,
    };

    fn fixtures(n: u32) -> FixtureContext {
        FixtureContext::new(
            (0..n)
                .map(|i| FixtureHandle {
                    id: FixtureId(i),
                    name: format!("Spot {i}"),
                    role: FixtureRole::Spot,
                    calibration: Calibration {
                        pan_range_deg: 540.0,
                        tilt_range_deg: 270.0,
                        channels: std::collections::HashMap::new(),
                    },
                })
                .collect(),
        )
    }

    fn sine_template() -> Template {
        Template {
            template_id: "sine_sweep".into(),
            steps: vec![TemplateStep {
                step_id: "sweep".into(),
                base_timing: BarTiming { duration_bars: 2.0 },
                geometry: GeometrySpec::Hold,
                movement: MovementSpec::Pattern {
                    pattern: "sine".into(),
                    amplitude_deg: 60.0,
                    cycles: 1.0,
                },
                dimmer: DimmerSpec::Off,
                phase_offset: PhaseOffsetMode::UniformSpread,
                repeat_contract: None,
            }],
            defaults: TemplateDefaults::default(),
        }
    }

    fn compile(
        library: &TemplateLibrary,
        grid: &ConstantTempo,
        plan: &PlaybackPlan,
        fx: &FixtureContext,
    ) -> Result<TemplateCompileResult, CompileError> {
        TemplateCompiler {
            library,
            grid,
            steps: StepCompiler {
                geometry: &PatternLibrary,
                movement: &PatternLibrary,
                dimmer: &PatternLibrary,
            },
        }
        .compile(plan, fx)
    }

    fn plan(window: PlaybackWindowBars) -> PlaybackPlan {
        PlaybackPlan {
            template_id: "sine_sweep".into(),
            preset_id: None,
            window,
            modifiers: Vec::new(),
            per_cycle_overrides: HashMap::new(),
        }
    }

    #[test]
    fn constant_tempo_bar_conversion() {
        let grid = ConstantTempo::new(120.0, 4).unwrap();
        assert_eq!(grid.bars_to_ms(0.0), 0);
        assert_eq!(grid.bars_to_ms(1.0), 2000);
        assert_eq!(grid.bars_to_ms(2.0), 4000);
        assert!(ConstantTempo::new(0.0, 4).is_none());
        assert!(ConstantTempo::new(120.0, 0).is_none());
    }

    #[test]
    fn unknown_template_fails_before_work() {
        let library = TemplateLibrary::new();
        let grid = ConstantTempo::new(120.0, 4).unwrap();
        let err = compile(
            &library,
            &grid,
            &plan(PlaybackWindowBars::new(0.0, 2.0).unwrap()),
            &fixtures(2),
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::NotFound { .. }));
    }

    #[test]
    fn unknown_preset_fails_before_work() {
        let mut library = TemplateLibrary::new();
        library.add_template(sine_template());
        let grid = ConstantTempo::new(120.0, 4).unwrap();
        let mut p = plan(PlaybackWindowBars::new(0.0, 2.0).unwrap());
        p.preset_id = Some("no_such_preset".into());
        let err = compile(&library, &grid, &p, &fixtures(2)).unwrap_err();
        assert!(matches!(err, CompileError::NotFound { .. }));
    }

    // 1-step sine template, 2-bar window at 120 BPM 4/4, two fixtures
    // with uniform spread: two pan segments over [0, 4000) ms whose
    // midpoints differ because the phase offsets are {0.0, 0.5}.
    #[test]
    fn two_fixture_uniform_spread_scenario() {
        let mut library = TemplateLibrary::new();
        library.add_template(sine_template());
        let grid = ConstantTempo::new(120.0, 4).unwrap();
        let result = compile(
            &library,
            &grid,
            &plan(PlaybackWindowBars::new(0.0, 2.0).unwrap()),
            &fixtures(2),
        )
        .unwrap();

        let pans: Vec<_> = result
            .segments()
            .iter()
            .filter(|s| s.channel == ChannelName::Pan)
            .collect();
        assert_eq!(pans.len(), 2);
        for seg in &pans {
            assert_eq!((seg.start_ms, seg.end_ms), (0, 4000));
        }
        let mid0 = pans[0].curve.evaluate(0.25);
        let mid1 = pans[1].curve.evaluate(0.25);
        assert!((mid0 - mid1).abs() > 1.0);
        assert!(result.first_overlap().is_none());
    }

    #[test]
    fn repeat_contract_tiles_the_window_without_overlap() {
        let mut template = sine_template();
        template.steps[0].repeat_contract = Some(RepeatContract {
            cycle_bars: 1.0,
            mode: RepeatMode::Loop,
            remainder: RemainderPolicy::Drop,
        });
        let mut library = TemplateLibrary::new();
        library.add_template(template);
        let grid = ConstantTempo::new(120.0, 4).unwrap();
        let result = compile(
            &library,
            &grid,
            &plan(PlaybackWindowBars::new(0.0, 4.0).unwrap()),
            &fixtures(1),
        )
        .unwrap();

        let pans: Vec<_> = result
            .segments()
            .iter()
            .filter(|s| s.channel == ChannelName::Pan)
            .collect();
        assert_eq!(pans.len(), 4);
        for (i, seg) in pans.iter().enumerate() {
            assert_eq!(seg.start_ms, i as u64 * 2000);
            assert_eq!(seg.end_ms, (i as u64 + 1) * 2000);
        }
        assert!(result.first_overlap().is_none());
    }

    #[test]
    fn window_start_offsets_absolute_times() {
        let mut library = TemplateLibrary::new();
        library.add_template(sine_template());
        let grid = ConstantTempo::new(120.0, 4).unwrap();
        let result = compile(
            &library,
            &grid,
            &plan(PlaybackWindowBars::new(8.0, 2.0).unwrap()),
            &fixtures(1),
        )
        .unwrap();
        let seg = &result.segments()[0];
        assert_eq!((seg.start_ms, seg.end_ms), (16_000, 20_000));
    }

    #[test]
    fn per_cycle_override_changes_only_that_cycle() {
        let mut template = sine_template();
        template.steps[0].phase_offset = PhaseOffsetMode::None;
        template.steps[0].dimmer = DimmerSpec::Hold { level: 1.0 };
        template.steps[0].repeat_contract = Some(RepeatContract {
            cycle_bars: 1.0,
            mode: RepeatMode::Loop,
            remainder: RemainderPolicy::Drop,
        });
        let mut library = TemplateLibrary::new();
        library.add_template(template);
        let grid = ConstantTempo::new(120.0, 4).unwrap();

        let mut p = plan(PlaybackWindowBars::new(0.0, 2.0).unwrap());
        p.per_cycle_overrides.insert(
            1,
            StepPatch {
                dimmer: Some(DimmerSpec::Hold { level: 0.5 }),
                ..StepPatch::default()
            },
        );
        let result = compile(&library, &grid, &p, &fixtures(1)).unwrap();

        let dimmers: Vec<_> = result
            .segments()
            .iter()
            .filter(|s| s.channel == ChannelName::Dimmer)
            .collect();
        assert_eq!(dimmers.len(), 2);
        assert!((dimmers[0].curve.evaluate(0.5) - 255.0).abs() < 1e-9);
        assert!((dimmers[1].curve.evaluate(0.5) - 127.5).abs() < 1e-9);
    }

    #[test]
    fn short_window_warns_and_emits_nothing() {
        let mut template = sine_template();
        template.steps[0].repeat_contract = Some(RepeatContract {
            cycle_bars: 8.0,
            mode: RepeatMode::Loop,
            remainder: RemainderPolicy::Drop,
        });
        let mut library = TemplateLibrary::new();
        library.add_template(template);
        let grid = ConstantTempo::new(120.0, 4).unwrap();
        let result = compile(
            &library,
            &grid,
            &plan(PlaybackWindowBars::new(0.0, 2.0).unwrap()),
            &fixtures(1),
        )
        .unwrap();
        assert!(result.segments().is_empty());
        assert_eq!(result.warnings().len(), 1);
    }

    #[test]
    fn segments_are_ordered_by_fixture_channel_start() {
        let mut template = sine_template();
        template.steps[0].dimmer = DimmerSpec::Hold { level: 1.0 };
        template.steps[0].movement = MovementSpec::Pattern {
            pattern: "circle".into(),
            amplitude_deg: 30.0,
            cycles: 1.0,
        };
        let mut library = TemplateLibrary::new();
        library.add_template(template);
        let grid = ConstantTempo::new(120.0, 4).unwrap();
        let result = compile(
            &library,
            &grid,
            &plan(PlaybackWindowBars::new(0.0, 2.0).unwrap()),
            &fixtures(2),
        )
        .unwrap();
        let keys: Vec<_> = result.segments().iter().map(|s| s.sort_key()).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }
}
