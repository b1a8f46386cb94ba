//! Pluggable strategy objects the step compiler composes: a geometry
//! resolver (base pan/tilt pose per fixture), a movement generator
//! (animated pan/tilt offset curves) and a dimmer generator (brightness
//! curve). The built-in [`PatternLibrary`] covers the stock patterns;
//! [`Noop`] resolves everything to "center pose, no motion" and is a
//! first-class value, not a test hack.

use std::collections::HashMap;
use std::f64::consts::FRAC_PI_2;

use crate::curve::{generate, modifiers};
use crate::error::CompileError;
use crate::model::curve::Curve;
use crate::model::fixture::{FixtureContext, FixtureId};
use crate::model::spec::{
    CurveKind, CurveSpec, DimmerSpec, GeometrySpec, MovementSpec, NativeCurveKind,
};

/// Samples per generated channel curve. Enough resolution for phase
/// rotation at the cycle counts templates actually use.
pub const CURVE_SAMPLES: usize = 64;

/// Base pan/tilt pose in degrees relative to center, per fixture.
pub type BasePoses = HashMap<FixtureId, (f64, f64)>;

/// Optional per-axis movement offset curves, both normalized to [0, 1]
/// with 0.5 meaning "no offset".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovementCurves {
    pub pan: Option<Curve>,
    pub tilt: Option<Curve>,
}

pub trait GeometryResolver {
    /// Resolve the static base pose of every fixture in the context.
    ///
    /// # Errors
    ///
    /// `UnsupportedSpec` for a pattern identifier the resolver does not
    /// recognize.
    fn resolve_base_pose(
        &self,
        fixtures: &FixtureContext,
        spec: &GeometrySpec,
    ) -> Result<BasePoses, CompileError>;
}

pub trait MovementGenerator {
    /// Generate the shared movement offset curves for one step. Either
    /// axis may come back `None`, meaning no segment for that channel.
    ///
    /// # Errors
    ///
    /// `UnsupportedSpec` for an unknown pattern identifier,
    /// `InvalidArgument` for malformed curve parameters.
    fn generate(
        &self,
        spec: &MovementSpec,
        duration_ms: u64,
    ) -> Result<MovementCurves, CompileError>;
}

pub trait DimmerGenerator {
    /// Generate the brightness-fraction curve for one step, already
    /// scaled into its final [0, 1] sub-range. `None` means the dimmer
    /// channel is left untouched.
    ///
    /// # Errors
    ///
    /// `UnsupportedSpec` for an unknown pattern identifier,
    /// `InvalidArgument` for malformed curve parameters.
    fn generate(
        &self,
        spec: &DimmerSpec,
        duration_ms: u64,
    ) -> Result<Option<Curve>, CompileError>;
}

// ── Curve-spec materialization ──────────────────────────────────────

/// Sample a [`CurveSpec`] onto the uniform grid. Native parameter slots:
/// Flat `p1`=level; Ramp `p1`=start, `p2`=end; Sine `p1`=amplitude,
/// `p2`=cycles, `p3`=phase; Square `p1`=cycles, `p2`=duty (0 means 0.5).
pub fn materialize_spec(spec: &CurveSpec, n_samples: usize) -> Result<Curve, CompileError> {
    match spec {
        CurveSpec::Custom { generator } => generate(generator, n_samples),
        CurveSpec::Native {
            kind,
            p1,
            p2,
            p3,
            p4: _,
            reverse,
        } => {
            let curve = match kind {
                NativeCurveKind::Flat => generate(&CurveKind::Flat { level: *p1 }, n_samples)?,
                NativeCurveKind::Ramp => {
                    let (start, end) = (*p1, *p2);
                    generate(&CurveKind::Ramp, n_samples)?
                        .map_values(|v| start + v * (end - start))
                }
                NativeCurveKind::Sine => generate(
                    &CurveKind::Sine {
                        amplitude: *p1,
                        cycles: *p2,
                        phase: *p3,
                    },
                    n_samples,
                )?,
                NativeCurveKind::Square => square(*p1, *p2, n_samples)?,
            };
            Ok(if *reverse {
                modifiers::reverse(&curve)
            } else {
                curve
            })
        }
    }
}

/// Square wave: `cycles` on/off periods with `duty` fraction high per
/// period (0 is shorthand for 0.5).
fn square(cycles: f64, duty: f64, n_samples: usize) -> Result<Curve, CompileError> {
    if cycles <= 0.0 {
        return Err(CompileError::invalid(format!(
            "square wave requires cycles > 0, got {cycles}"
        )));
    }
    let duty = if duty == 0.0 { 0.5 } else { duty };
    if !(0.0..=1.0).contains(&duty) {
        return Err(CompileError::invalid(format!(
            "square duty must be in [0, 1], got {duty}"
        )));
    }
    generate(&CurveKind::Ramp, n_samples).map(|ramp| {
        ramp.map_values(|t| {
            let local = (t * cycles).fract();
            if local < duty {
                1.0
            } else {
                0.0
            }
        })
    })
}

// ── Built-in pattern library ────────────────────────────────────────

/// The stock pattern library. Stateless; pattern identifiers are matched
/// exactly (no fuzzy fallback — an unknown id is an `UnsupportedSpec`).
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternLibrary;

impl PatternLibrary {
    pub const GEOMETRY_PATTERNS: &'static [&'static str] =
        &["center", "fan", "converge", "alternate"];
    pub const MOVEMENT_PATTERNS: &'static [&'static str] =
        &["sine", "sweep", "circle", "figure8", "nod", "drift"];
    pub const DIMMER_PATTERNS: &'static [&'static str] =
        &["pulse", "ramp", "breathe", "strobe"];
}

impl GeometryResolver for PatternLibrary {
    fn resolve_base_pose(
        &self,
        fixtures: &FixtureContext,
        spec: &GeometrySpec,
    ) -> Result<BasePoses, CompileError> {
        let ids = fixtures.ids();
        match spec {
            GeometrySpec::Hold => Ok(ids.into_iter().map(|id| (id, (0.0, 0.0))).collect()),
            GeometrySpec::Pose { pan_deg, tilt_deg } => Ok(ids
                .into_iter()
                .map(|id| (id, (*pan_deg, *tilt_deg)))
                .collect()),
            GeometrySpec::Pattern {
                pattern,
                spread_deg,
            } => {
                let n = ids.len();
                let pose = |i: usize| -> Result<(f64, f64), CompileError> {
                    // Position in [-0.5, 0.5] across the group.
                    #[allow(clippy::cast_precision_loss)]
                    let pos = if n <= 1 {
                        0.0
                    } else {
                        i as f64 / (n as f64 - 1.0) - 0.5
                    };
                    match pattern.as_str() {
                        "center" => Ok((0.0, 0.0)),
                        "fan" => Ok((spread_deg * pos, 0.0)),
                        "converge" => Ok((-spread_deg * pos, 0.0)),
                        "alternate" => {
                            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
                            Ok((0.0, sign * spread_deg / 2.0))
                        }
                        other => Err(CompileError::unsupported("geometry pattern", other)),
                    }
                };
                ids.into_iter()
                    .enumerate()
                    .map(|(i, id)| pose(i).map(|p| (id, p)))
                    .collect()
            }
        }
    }
}

impl MovementGenerator for PatternLibrary {
    fn generate(
        &self,
        spec: &MovementSpec,
        _duration_ms: u64,
    ) -> Result<MovementCurves, CompileError> {
        match spec {
            MovementSpec::None => Ok(MovementCurves::default()),
            MovementSpec::Explicit {
                pan,
                tilt,
                amplitude_deg: _,
                cycles: _,
            } => Ok(MovementCurves {
                pan: pan
                    .as_ref()
                    .map(|s| materialize_spec(s, CURVE_SAMPLES))
                    .transpose()?,
                tilt: tilt
                    .as_ref()
                    .map(|s| materialize_spec(s, CURVE_SAMPLES))
                    .transpose()?,
            }),
            MovementSpec::Pattern {
                pattern,
                amplitude_deg: _,
                cycles,
            } => {
                let sine = |phase: f64| {
                    generate(
                        &CurveKind::Sine {
                            amplitude: 1.0,
                            cycles: *cycles,
                            phase,
                        },
                        CURVE_SAMPLES,
                    )
                };
                match pattern.as_str() {
                    "sine" => Ok(MovementCurves {
                        pan: Some(sine(0.0)?),
                        tilt: None,
                    }),
                    // Starts at the leftmost point instead of center.
                    "sweep" => Ok(MovementCurves {
                        pan: Some(sine(-FRAC_PI_2)?),
                        tilt: None,
                    }),
                    "circle" => Ok(MovementCurves {
                        pan: Some(sine(0.0)?),
                        tilt: Some(sine(FRAC_PI_2)?),
                    }),
                    // Tilt runs at twice the pan frequency.
                    "figure8" => Ok(MovementCurves {
                        pan: Some(sine(0.0)?),
                        tilt: Some(generate(
                            &CurveKind::Lissajous {
                                b: 2.0 * cycles,
                                delta: 0.0,
                            },
                            CURVE_SAMPLES,
                        )?),
                    }),
                    "nod" => Ok(MovementCurves {
                        pan: None,
                        tilt: Some(sine(0.0)?),
                    }),
                    "drift" => Ok(MovementCurves {
                        pan: Some(generate(
                            &CurveKind::Noise {
                                octaves: 3,
                                seed: 0x0d41_f7,
                            },
                            CURVE_SAMPLES,
                        )?),
                        tilt: Some(generate(
                            &CurveKind::Noise {
                                octaves: 3,
                                seed: 0x0d41_f8,
                            },
                            CURVE_SAMPLES,
                        )?),
                    }),
                    other => Err(CompileError::unsupported("movement pattern", other)),
                }
            }
        }
    }
}

impl DimmerGenerator for PatternLibrary {
    fn generate(
        &self,
        spec: &DimmerSpec,
        _duration_ms: u64,
    ) -> Result<Option<Curve>, CompileError> {
        match spec {
            DimmerSpec::Off => Ok(None),
            DimmerSpec::Hold { level } => {
                Ok(Some(Curve::constant(level.clamp(0.0, 1.0))))
            }
            DimmerSpec::Explicit {
                curve,
                floor,
                ceiling,
            } => {
                let (lo, hi) = (*floor, *ceiling);
                let c = materialize_spec(curve, CURVE_SAMPLES)?;
                Ok(Some(c.map_values(|v| lo + v * (hi - lo))))
            }
            DimmerSpec::Pattern {
                pattern,
                intensity,
                cycles,
            } => {
                let base = match pattern.as_str() {
                    "pulse" => {
                        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                        let subdivision = (cycles.round().max(1.0)) as u32;
                        generate(
                            &CurveKind::BeatPulse {
                                subdivision,
                                accent: 1.0,
                            },
                            CURVE_SAMPLES,
                        )?
                    }
                    "ramp" => generate(&CurveKind::Ramp, CURVE_SAMPLES)?,
                    // Sine starting from black.
                    "breathe" => generate(
                        &CurveKind::Sine {
                            amplitude: 1.0,
                            cycles: *cycles,
                            phase: -FRAC_PI_2,
                        },
                        CURVE_SAMPLES,
                    )?,
                    "strobe" => square(*cycles, 0.5, CURVE_SAMPLES)?,
                    other => return Err(CompileError::unsupported("dimmer pattern", other)),
                };
                let scale = *intensity;
                Ok(Some(base.map_values(|v| v * scale)))
            }
        }
    }
}

// ── No-op resolvers ─────────────────────────────────────────────────

/// Resolves every geometry to the centered home pose and every movement
/// and dimmer spec to "no curve". Useful wherever scheduling or timing
/// behavior is exercised without caring about actual channel values.
#[derive(Debug, Clone, Copy, Default)]
pub struct Noop;

impl GeometryResolver for Noop {
    fn resolve_base_pose(
        &self,
        fixtures: &FixtureContext,
        _spec: &GeometrySpec,
    ) -> Result<BasePoses, CompileError> {
        Ok(fixtures.ids().into_iter().map(|id| (id, (0.0, 0.0))).collect())
    }
}

impl MovementGenerator for Noop {
    fn generate(
        &self,
        _spec: &MovementSpec,
        _duration_ms: u64,
    ) -> Result<MovementCurves, CompileError> {
        Ok(MovementCurves::default())
    }
}

impl DimmerGenerator for Noop {
    fn generate(
        &self,
        _spec: &DimmerSpec,
        _duration_ms: u64,
    ) -> Result<Option<Curve>, CompileError> {
        Ok(None)
    }
}
