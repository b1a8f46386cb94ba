use crate::error::CompileError;
use crate::model::curve::{Curve, CurvePoint};
use crate::model::spec::CurveKind;

use super::noise::octave_noise;

/// Scale factor turning an anticipation/overshoot strength of 1.0 into
/// the classic "back" easing constant.
const BACK_CONSTANT: f64 = 1.70158;

/// Materialize a curve spec as `n_samples` points on a uniform time grid
/// over [0, 1]. Deterministic and pure: the same spec and sample count
/// always produce the same curve.
///
/// Output values are not pre-clamped; clamping is deferred to the DMX
/// mapping stage, which is where range knowledge lives.
///
/// # Errors
///
/// `InvalidArgument` for `n_samples < 2`, non-positive cycle counts or
/// harmonic ratios, a zero beat subdivision or octave count, or a point
/// array with fewer than 2 points.
pub fn generate(kind: &CurveKind, n_samples: usize) -> Result<Curve, CompileError> {
    if n_samples < 2 {
        return Err(CompileError::invalid(format!(
            "curve generation requires at least 2 samples, got {n_samples}"
        )));
    }
    validate(kind)?;

    // Explicit point arrays are resampled onto the grid rather than
    // evaluated pointwise.
    if let CurveKind::Points { points } = kind {
        let source = Curve::new(points.clone()).ok_or_else(|| {
            CompileError::invalid(format!(
                "point-array curve requires at least 2 points, got {}",
                points.len()
            ))
        })?;
        return Ok(resample(&source, n_samples));
    }
    if let CurveKind::Bezier { x1, y1, x2, y2 } = kind {
        return Ok(bezier(*x1, *y1, *x2, *y2, n_samples));
    }

    let points = uniform_grid(n_samples)
        .map(|t| CurvePoint::new(t, evaluate_kind(kind, t)))
        .collect();
    Ok(Curve::from_sorted(points))
}

/// Contract checks shared by every generator family.
fn validate(kind: &CurveKind) -> Result<(), CompileError> {
    match kind {
        CurveKind::Sine { cycles, .. } | CurveKind::Cosine { cycles, .. } => {
            if *cycles <= 0.0 {
                return Err(CompileError::invalid(format!(
                    "{} curve requires cycles > 0, got {cycles}",
                    kind.name()
                )));
            }
        }
        CurveKind::Lissajous { b, .. } => {
            if *b <= 0.0 {
                return Err(CompileError::invalid(format!(
                    "lissajous curve requires harmonic ratio b > 0, got {b}"
                )));
            }
        }
        CurveKind::BeatPulse { subdivision, .. } => {
            if *subdivision == 0 {
                return Err(CompileError::invalid(
                    "beat_pulse curve requires subdivision > 0",
                ));
            }
        }
        CurveKind::Noise { octaves, .. } => {
            if *octaves == 0 {
                return Err(CompileError::invalid("noise curve requires octaves > 0"));
            }
        }
        _ => {}
    }
    Ok(())
}

/// Uniform t grid with exact endpoints 0.0 and 1.0.
fn uniform_grid(n_samples: usize) -> impl Iterator<Item = f64> {
    #[allow(clippy::cast_precision_loss)]
    let last = (n_samples - 1) as f64;
    (0..n_samples).map(move |i| {
        #[allow(clippy::cast_precision_loss)]
        let i = i as f64;
        if i >= last {
            1.0
        } else {
            i / last
        }
    })
}

/// Pointwise evaluation for the closed-form families.
fn evaluate_kind(kind: &CurveKind, t: f64) -> f64 {
    use std::f64::consts::TAU;
    match kind {
        CurveKind::Flat { level } => *level,
        CurveKind::Ramp => t,
        CurveKind::Sine {
            amplitude,
            cycles,
            phase,
        } => 0.5 + 0.5 * amplitude * (TAU * cycles * t + phase).sin(),
        CurveKind::Cosine {
            amplitude,
            cycles,
            phase,
        } => 0.5 + 0.5 * amplitude * (TAU * cycles * t + phase).cos(),
        CurveKind::Ease { easing } => easing.evaluate(t),
        CurveKind::BeatPulse {
            subdivision,
            accent,
        } => beat_pulse(t, *subdivision, *accent),
        CurveKind::Anticipate { depth } => {
            // Back-in: pull below zero by `depth`, then ease into 1.0.
            let s = BACK_CONSTANT * depth;
            (s + 1.0) * t * t * t - s * t * t
        }
        CurveKind::Overshoot { intensity } => {
            // Back-out: pass 1.0 by `intensity`, settle exactly on 1.0.
            let s = BACK_CONSTANT * intensity;
            let u = t - 1.0;
            1.0 + (s + 1.0) * u * u * u + s * u * u
        }
        CurveKind::Lissajous { b, delta } => 0.5 + 0.5 * (TAU * b * t + delta).sin(),
        CurveKind::Noise { octaves, seed } => octave_noise(t, *octaves, *seed),
        // Handled before pointwise evaluation.
        CurveKind::Bezier { .. } | CurveKind::Points { .. } => 0.0,
    }
}

/// One decaying pulse per beat subdivision; the first pulse of the
/// window is scaled by `accent` to mark the downbeat.
fn beat_pulse(t: f64, subdivision: u32, accent: f64) -> f64 {
    let sub = f64::from(subdivision);
    let raw_slot = (t * sub).floor().min(sub - 1.0);
    let local = (t * sub - raw_slot).clamp(0.0, 1.0);
    let scale = if raw_slot == 0.0 { accent } else { 1.0 };
    scale * (1.0 - local) * (1.0 - local)
}

/// Sample a cubic Bézier through (0,0), (x1,y1), (x2,y2), (1,1) densely
/// by parameter, then resample onto the uniform time grid so the result
/// has the same shape as every other generated curve.
fn bezier(x1: f64, y1: f64, x2: f64, y2: f64, n_samples: usize) -> Curve {
    let x1 = x1.clamp(0.0, 1.0);
    let y1 = y1.clamp(0.0, 1.0);
    let x2 = x2.clamp(0.0, 1.0);
    let y2 = y2.clamp(0.0, 1.0);

    let dense = (n_samples * 4).max(64);
    let mut points = Vec::with_capacity(dense + 1);
    for i in 0..=dense {
        #[allow(clippy::cast_precision_loss)]
        let u = i as f64 / dense as f64;
        let w = 1.0 - u;
        // De Casteljau expanded: B(u) = 3w²u·P1 + 3wu²·P2 + u³·P3,
        // with P0 = (0,0) contributing nothing.
        let x = 3.0 * w * w * u * x1 + 3.0 * w * u * u * x2 + u * u * u;
        let y = 3.0 * w * w * u * y1 + 3.0 * w * u * u * y2 + u * u * u;
        points.push(CurvePoint::new(x, y));
    }
    // Curve::new sorts by t, which also handles non-monotonic x from
    // extreme control points.
    let source = Curve::new(points).unwrap_or_else(Curve::linear);
    resample(&source, n_samples)
}

/// Resample any curve onto the uniform grid of `n_samples` points.
pub fn resample(source: &Curve, n_samples: usize) -> Curve {
    let points = uniform_grid(n_samples)
        .map(|t| CurvePoint::new(t, source.evaluate(t)))
        .collect();
    Curve::from_sorted(points)
}
