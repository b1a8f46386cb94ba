//! Compilation of one template step, for one scheduled instance, into
//! per-channel segments. This is where base pose, movement offset,
//! phase staggering and dimmer behavior come together.

use crate::compile::phase::calculate_offsets;
use crate::compile::resolvers::{
    DimmerGenerator, GeometryResolver, MovementGenerator, CURVE_SAMPLES,
};
use crate::curve::modifiers::{self, apply_modifiers, is_known_modifier};
use crate::curve::{dimmer_curve_to_dmx, movement_curve_to_dmx, resample};
use crate::error::CompileError;
use crate::model::curve::{Curve, CurvePoint};
use crate::model::fixture::FixtureContext;
use crate::model::segment::ChannelSegment;
use crate::model::spec::{ChannelName, MovementSpec, RepeatMode};
use crate::model::template::{TemplateDefaults, TemplateStep};

pub const DMX_MIN: f64 = 0.0;
pub const DMX_MAX: f64 = 255.0;

/// The three strategy objects a step compilation needs. Borrowed so one
/// set of resolvers serves a whole template compilation.
pub struct StepCompiler<'a> {
    pub geometry: &'a dyn GeometryResolver,
    pub movement: &'a dyn MovementGenerator,
    pub dimmer: &'a dyn DimmerGenerator,
}

/// Per-instance invocation context: which fixtures, which absolute
/// window, which repeat cycle, and the template-level knobs in force.
pub struct StepContext<'a> {
    pub fixtures: &'a FixtureContext,
    pub start_ms: u64,
    pub end_ms: u64,
    /// Index of the scheduled instance within its repeat contract;
    /// 0 for steps scheduled once.
    pub cycle_number: usize,
    pub defaults: &'a TemplateDefaults,
    /// Plan-level modifier names, applied after the template defaults.
    pub extra_modifiers: &'a [String],
}

pub struct StepOutput {
    pub segments: Vec<ChannelSegment>,
    pub warnings: Vec<String>,
}

impl StepCompiler<'_> {
    /// Compile one step over one absolute time window.
    ///
    /// # Errors
    ///
    /// Propagates resolver errors unchanged; `InvalidArgument` for a
    /// degenerate window or non-positive movement cycle count.
    pub fn compile_step(
        &self,
        step: &TemplateStep,
        ctx: &StepContext<'_>,
    ) -> Result<StepOutput, CompileError> {
        if ctx.end_ms <= ctx.start_ms {
            return Err(CompileError::invalid(format!(
                "step '{}' has a degenerate window [{}, {}) ms",
                step.step_id, ctx.start_ms, ctx.end_ms
            )));
        }
        let duration_ms = ctx.end_ms - ctx.start_ms;
        let mut warnings = Vec::new();
        let mut segments = Vec::new();

        let poses = self.geometry.resolve_base_pose(ctx.fixtures, &step.geometry)?;
        let mut curves = self.movement.generate(&step.movement, duration_ms)?;

        // Modifier names come from the template defaults plus the plan;
        // unknown names are skipped (forward compatibility) but reported.
        let modifier_names: Vec<String> = ctx
            .defaults
            .modifiers
            .iter()
            .chain(ctx.extra_modifiers.iter())
            .cloned()
            .collect();
        for name in &modifier_names {
            if !is_known_modifier(name) {
                warnings.push(format!(
                    "step '{}': ignoring unknown modifier '{name}'",
                    step.step_id
                ));
            }
        }
        // Modifiers may change the sample layout (repeat and pingpong
        // double the point count and leave a seam), so the result goes
        // back onto the uniform grid before phase rotation assumes one.
        if modifier_names.iter().any(|n| is_known_modifier(n)) {
            curves.pan = curves
                .pan
                .map(|c| resample(&apply_modifiers(&c, &modifier_names), CURVE_SAMPLES));
            curves.tilt = curves
                .tilt
                .map(|c| resample(&apply_modifiers(&c, &modifier_names), CURVE_SAMPLES));
        }

        // Odd ping-pong cycles run the movement backwards in time. The
        // dimmer is deliberately left alone.
        let ping_pong_reversed = matches!(
            step.repeat_contract.map(|c| c.mode),
            Some(RepeatMode::PingPong)
        ) && ctx.cycle_number % 2 == 1;
        if ping_pong_reversed {
            curves.pan = curves.pan.map(|c| modifiers::reverse(&c));
            curves.tilt = curves.tilt.map(|c| modifiers::reverse(&c));
        }

        let (amplitude_deg, cycles) = movement_parameters(&step.movement)?;
        let amplitude_deg = amplitude_deg * ctx.defaults.amplitude_scale;
        let offsets = calculate_offsets(&ctx.fixtures.ids(), &step.phase_offset);

        let dimmer_curve = self
            .dimmer
            .generate(&step.dimmer, duration_ms)?
            .map(|c| c.map_values(|v| v * ctx.defaults.intensity));

        for fixture in &ctx.fixtures.fixtures {
            let &(pan0_deg, tilt0_deg) = poses.get(&fixture.id).unwrap_or(&(0.0, 0.0));
            let offset = offsets.get(&fixture.id).copied().unwrap_or(0.0);

            if let Some(pan) = &curves.pan {
                let rotated = rotate_phase(pan, offset, cycles);
                let mapped = movement_curve_to_dmx(
                    &rotated,
                    fixture.calibration.pan_deg_to_dmx(pan0_deg),
                    fixture.calibration.pan_amplitude_dmx(amplitude_deg),
                    DMX_MIN,
                    DMX_MAX,
                );
                if mapped.clamped {
                    warnings.push(clamp_warning(&step.step_id, "pan", fixture.id.0));
                }
                segments.push(ChannelSegment {
                    fixture_id: fixture.id,
                    channel: ChannelName::Pan,
                    start_ms: ctx.start_ms,
                    end_ms: ctx.end_ms,
                    curve: mapped.curve,
                });
            }

            if let Some(tilt) = &curves.tilt {
                let rotated = rotate_phase(tilt, offset, cycles);
                let mapped = movement_curve_to_dmx(
                    &rotated,
                    fixture.calibration.tilt_deg_to_dmx(tilt0_deg),
                    fixture.calibration.tilt_amplitude_dmx(amplitude_deg),
                    DMX_MIN,
                    DMX_MAX,
                );
                if mapped.clamped {
                    warnings.push(clamp_warning(&step.step_id, "tilt", fixture.id.0));
                }
                segments.push(ChannelSegment {
                    fixture_id: fixture.id,
                    channel: ChannelName::Tilt,
                    start_ms: ctx.start_ms,
                    end_ms: ctx.end_ms,
                    curve: mapped.curve,
                });
            }

            if let Some(dimmer) = &dimmer_curve {
                let mapped = dimmer_curve_to_dmx(dimmer, DMX_MIN, DMX_MAX);
                if mapped.clamped {
                    warnings.push(clamp_warning(&step.step_id, "dimmer", fixture.id.0));
                }
                segments.push(ChannelSegment {
                    fixture_id: fixture.id,
                    channel: ChannelName::Dimmer,
                    start_ms: ctx.start_ms,
                    end_ms: ctx.end_ms,
                    curve: mapped.curve,
                });
            }
        }

        Ok(StepOutput { segments, warnings })
    }
}

fn clamp_warning(step_id: &str, channel: &str, fixture: u32) -> String {
    format!("step '{step_id}': {channel} curve clamped to DMX range for fixture {fixture}")
}

/// Amplitude and cycle count of a movement spec, used for DMX scaling
/// and phase rotation. A step with no movement never reaches the
/// rotation path, so neutral values are fine there.
fn movement_parameters(spec: &MovementSpec) -> Result<(f64, f64), CompileError> {
    match spec {
        MovementSpec::None => Ok((0.0, 1.0)),
        MovementSpec::Pattern {
            amplitude_deg,
            cycles,
            ..
        }
        | MovementSpec::Explicit {
            amplitude_deg,
            cycles,
            ..
        } => {
            if *cycles <= 0.0 {
                return Err(CompileError::invalid(format!(
                    "movement requires cycles > 0, got {cycles}"
                )));
            }
            Ok((*amplitude_deg, *cycles))
        }
    }
}

/// Shift a shared movement curve for one fixture's phase offset. The
/// offset is a fraction of one cycle, converted to a whole-sample
/// rotation of the value sequence; the time grid is left untouched so
/// every fixture still spans the same window.
fn rotate_phase(curve: &Curve, offset_norm: f64, cycles: f64) -> Curve {
    let n = curve.len();
    if n == 0 || offset_norm == 0.0 {
        return curve.clone();
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let shift = (offset_norm * n as f64 / cycles).round().rem_euclid(n as f64) as usize;
    if shift == 0 {
        return curve.clone();
    }
    let points = curve.points();
    let rotated: Vec<CurvePoint> = points
        .iter()
        .zip(points.iter().cycle().skip(shift))
        .map(|(p, shifted)| CurvePoint::new(p.t, shifted.v))
        .collect();
    Curve::from_sorted(rotated)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::compile::resolvers::{Noop, PatternLibrary};
    use crate::model::fixture::{Calibration, FixtureHandle, FixtureId, FixtureRole};
    use crate::model::spec::{
        DimmerSpec, GeometrySpec, PhaseOffsetMode, RemainderPolicy, RepeatContract,
    };
    use crate::model::template::BarTiming;
    use std::collections::HashMap;

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
                        channels: HashMap::new(),
                    },
                })
                .collect(),
        )
    }

    fn sine_step(phase: PhaseOffsetMode) -> TemplateStep {
        TemplateStep {
            step_id: "sweep".into(),
            base_timing: BarTiming { duration_bars: 2.0 },
            geometry: GeometrySpec::Hold,
            movement: MovementSpec::Pattern {
                pattern: "sine".into(),
                amplitude_deg: 60.0,
                cycles: 1.0,
            },
            dimmer: DimmerSpec::Off,
            phase_offset: phase,
            repeat_contract: None,
        }
    }

    fn library() -> StepCompiler<'static> {
        StepCompiler {
            geometry: &PatternLibrary,
            movement: &PatternLibrary,
            dimmer: &PatternLibrary,
        }
    }

    fn ctx<'a>(
        fixtures: &'a FixtureContext,
        defaults: &'a TemplateDefaults,
        end_ms: u64,
    ) -> StepContext<'a> {
        StepContext {
            fixtures,
            start_ms: 0,
            end_ms,
            cycle_number: 0,
            defaults,
            extra_modifiers: &[],
        }
    }

    #[test]
    fn uniform_spread_staggers_pan_segments() {
        let fx = fixtures(2);
        let defaults = TemplateDefaults::default();
        let out = library()
            .compile_step(
                &sine_step(PhaseOffsetMode::UniformSpread),
                &ctx(&fx, &defaults, 4000),
            )
            .unwrap();
        let pans: Vec<&ChannelSegment> = out
            .segments
            .iter()
            .filter(|s| s.channel == ChannelName::Pan)
            .collect();
        assert_eq!(pans.len(), 2);
        for seg in &pans {
            assert_eq!((seg.start_ms, seg.end_ms), (0, 4000));
        }
        // The half-cycle offset must change the sampled midpoint value.
        let mid0 = pans[0].curve.evaluate(0.25);
        let mid1 = pans[1].curve.evaluate(0.25);
        assert!((mid0 - mid1).abs() > 1.0, "offset had no effect: {mid0} vs {mid1}");
    }

    #[test]
    fn unison_fixtures_get_identical_curves() {
        let fx = fixtures(3);
        let defaults = TemplateDefaults::default();
        let out = library()
            .compile_step(&sine_step(PhaseOffsetMode::None), &ctx(&fx, &defaults, 2000))
            .unwrap();
        let pans: Vec<&ChannelSegment> = out
            .segments
            .iter()
            .filter(|s| s.channel == ChannelName::Pan)
            .collect();
        assert_eq!(pans.len(), 3);
        assert_eq!(pans[0].curve, pans[1].curve);
        assert_eq!(pans[1].curve, pans[2].curve);
    }

    #[test]
    fn no_curves_means_no_segments() {
        let fx = fixtures(2);
        let defaults = TemplateDefaults::default();
        let compiler = StepCompiler {
            geometry: &Noop,
            movement: &Noop,
            dimmer: &Noop,
        };
        let out = compiler
            .compile_step(&sine_step(PhaseOffsetMode::None), &ctx(&fx, &defaults, 1000))
            .unwrap();
        assert!(out.segments.is_empty());
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn dimmer_hold_emits_per_fixture_segments() {
        let fx = fixtures(2);
        let defaults = TemplateDefaults::default();
        let mut step = sine_step(PhaseOffsetMode::None);
        step.movement = MovementSpec::None;
        step.dimmer = DimmerSpec::Hold { level: 0.5 };
        let out = library().compile_step(&step, &ctx(&fx, &defaults, 1000)).unwrap();
        let dimmers: Vec<&ChannelSegment> = out
            .segments
            .iter()
            .filter(|s| s.channel == ChannelName::Dimmer)
            .collect();
        assert_eq!(dimmers.len(), 2);
        assert!((dimmers[0].curve.evaluate(0.5) - 127.5).abs() < 1e-9);
    }

    #[test]
    fn intensity_default_scales_dimmer() {
        let fx = fixtures(1);
        let defaults = TemplateDefaults {
            intensity: 0.5,
            ..TemplateDefaults::default()
        };
        let mut step = sine_step(PhaseOffsetMode::None);
        step.movement = MovementSpec::None;
        step.dimmer = DimmerSpec::Hold { level: 1.0 };
        let out = library().compile_step(&step, &ctx(&fx, &defaults, 1000)).unwrap();
        assert!((out.segments[0].curve.evaluate(0.5) - 127.5).abs() < 1e-9);
    }

    #[test]
    fn odd_ping_pong_cycle_reverses_movement_only() {
        let fx = fixtures(1);
        let defaults = TemplateDefaults::default();
        let mut step = sine_step(PhaseOffsetMode::None);
        step.movement = MovementSpec::Pattern {
            pattern: "sweep".into(),
            amplitude_deg: 60.0,
            cycles: 1.0,
        };
        step.dimmer = DimmerSpec::Pattern {
            pattern: "ramp".into(),
            intensity: 1.0,
            cycles: 1.0,
        };
        step.repeat_contract = Some(RepeatContract {
            cycle_bars: 1.0,
            mode: RepeatMode::PingPong,
            remainder: RemainderPolicy::Drop,
        });

        let even = library().compile_step(&step, &ctx(&fx, &defaults, 1000)).unwrap();
        let odd_ctx = StepContext {
            cycle_number: 1,
            ..ctx(&fx, &defaults, 1000)
        };
        let odd = library().compile_step(&step, &odd_ctx).unwrap();

        let pan = |o: &StepOutput| {
            o.segments
                .iter()
                .find(|s| s.channel == ChannelName::Pan)
                .unwrap()
                .curve
                .clone()
        };
        let dim = |o: &StepOutput| {
            o.segments
                .iter()
                .find(|s| s.channel == ChannelName::Dimmer)
                .unwrap()
                .curve
                .clone()
        };
        // Movement runs backwards on the odd cycle.
        assert!((pan(&even).first_v() - pan(&odd).last_v()).abs() < 1e-6);
        // The dimmer ramp is untouched by parity.
        assert_eq!(dim(&even), dim(&odd));
    }

    #[test]
    fn repeat_modifier_keeps_segment_time_monotonic() {
        let fx = fixtures(1);
        let defaults = TemplateDefaults {
            modifiers: vec!["repeat".into()],
            ..TemplateDefaults::default()
        };
        let out = library()
            .compile_step(&sine_step(PhaseOffsetMode::None), &ctx(&fx, &defaults, 2000))
            .unwrap();
        let pan = out
            .segments
            .iter()
            .find(|s| s.channel == ChannelName::Pan)
            .unwrap();
        assert_eq!(pan.curve.len(), CURVE_SAMPLES);
        assert!(pan.curve.points().windows(2).all(|w| w[0].t < w[1].t));
        // Both halves play the same cycle.
        assert!((pan.curve.evaluate(0.2) - pan.curve.evaluate(0.7)).abs() < 1.0);
    }

    #[test]
    fn unknown_modifier_warns_but_compiles() {
        let fx = fixtures(1);
        let defaults = TemplateDefaults {
            modifiers: vec!["glitter".into()],
            ..TemplateDefaults::default()
        };
        let out = library()
            .compile_step(&sine_step(PhaseOffsetMode::None), &ctx(&fx, &defaults, 1000))
            .unwrap();
        assert!(!out.segments.is_empty());
        assert!(out.warnings.iter().any(|w| w.contains("glitter")));
    }

    #[test]
    fn clamped_mapping_surfaces_warning() {
        let fx = FixtureContext::new(vec![FixtureHandle {
            id: FixtureId(0),
            name: "Narrow".into(),
            role: FixtureRole::Spot,
            // Amplitude wider than the whole mechanical range.
            calibration: Calibration {
                pan_range_deg: 30.0,
                tilt_range_deg: 30.0,
                channels: HashMap::new(),
            },
        }]);
        let defaults = TemplateDefaults::default();
        let out = library()
            .compile_step(&sine_step(PhaseOffsetMode::None), &ctx(&fx, &defaults, 1000))
            .unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("clamped")));
    }

    #[test]
    fn degenerate_window_is_invalid() {
        let fx = fixtures(1);
        let defaults = TemplateDefaults::default();
        let bad = StepContext {
            end_ms: 0,
            ..ctx(&fx, &defaults, 1000)
        };
        assert!(matches!(
            library().compile_step(&sine_step(PhaseOffsetMode::None), &bad),
            Err(CompileError::InvalidArgument { .. })
        ));
    }
}
