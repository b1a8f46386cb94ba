use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CompileError;
use crate::model::curve::{Curve, CurvePoint};

/// Modifier names the pipeline understands, in the order a caller might
/// chain them. Unknown names in a modifier list are skipped silently:
/// this is a deliberate forward-compatibility policy (newer templates
/// may name styling modifiers an older compiler does not have), in
/// contrast to the fail-fast handling of preset step patches.
pub const KNOWN_MODIFIERS: [&str; 5] = ["reverse", "mirror", "bounce", "repeat", "pingpong"];

/// True if `name` is a modifier this compiler implements.
pub fn is_known_modifier(name: &str) -> bool {
    KNOWN_MODIFIERS.contains(&name)
}

/// Apply a named, ordered pipeline of pure curve transforms. Unknown
/// names are skipped (see [`KNOWN_MODIFIERS`]); callers that carry a
/// diagnostics channel should check names with [`is_known_modifier`]
/// first and record a warning.
pub fn apply_modifiers(curve: &Curve, modifiers: &[String]) -> Curve {
    let mut out = curve.clone();
    for name in modifiers {
        out = match name.as_str() {
            "reverse" => reverse(&out),
            "mirror" => mirror(&out),
            "bounce" => bounce(&out),
            "repeat" => repeat(&out),
            "pingpong" => pingpong(&out),
            _ => out, // unknown: skip silently
        };
    }
    out
}

/// Flip the time axis: `t' = 1 - t`, values kept in reverse order.
/// Applying it twice reproduces the original curve.
pub fn reverse(curve: &Curve) -> Curve {
    let points = curve
        .points()
        .iter()
        .rev()
        .map(|p| CurvePoint::new(1.0 - p.t, p.v))
        .collect();
    Curve::from_sorted(points)
}

/// Flip values only: `v' = 1 - v`. An involution.
pub fn mirror(curve: &Curve) -> Curve {
    curve.map_values(|v| 1.0 - v)
}

/// Fold values around the midpoint: `v' = 1 - |v - 0.5| * 2`.
pub fn bounce(curve: &Curve) -> Curve {
    curve.map_values(|v| 1.0 - (v - 0.5).abs() * 2.0)
}

/// Play the curve twice within the same window: each copy is compressed
/// into half the time axis, so the result is a valid [0, 1] curve. The
/// seam at t = 0.5 keeps both boundary samples, encoding a step when
/// the curve does not loop.
pub fn repeat(curve: &Curve) -> Curve {
    concat_halves(curve, curve)
}

/// Out-and-back motion: the first half plays the curve time-reversed,
/// the second half plays it forward. Valid over [0, 1] like [`repeat`].
pub fn pingpong(curve: &Curve) -> Curve {
    concat_halves(&reverse(curve), curve)
}

fn concat_halves(first: &Curve, second: &Curve) -> Curve {
    let mut points: Vec<CurvePoint> = first
        .points()
        .iter()
        .map(|p| CurvePoint::new(p.t * 0.5, p.v))
        .collect();
    points.extend(
        second
            .points()
            .iter()
            .map(|p| CurvePoint::new(0.5 + p.t * 0.5, p.v)),
    );
    Curve::from_sorted(points)
}

/// Rescale values to span exactly [0, 1] using the observed min/max.
/// A constant input maps to 0.5 everywhere.
pub fn center_curve(curve: &Curve) -> Curve {
    let (min, max) = curve.points().iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY),
        |(lo, hi), p| (lo.min(p.v), hi.max(p.v)),
    );
    let span = max - min;
    if span <= f64::EPSILON {
        return curve.map_values(|_| 0.5);
    }
    curve.map_values(|v| (v - min) / span)
}

/// How [`ensure_loop_ready`] closes the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopClosure {
    /// Append a synthetic closing point at t = 1.0.
    Append,
    /// Overwrite the last sample's value.
    AdjustLast,
}

impl FromStr for LoopClosure {
    type Err = CompileError;
    fn from_str(s: &str) -> Result<Self, CompileError> {
        match s {
            "append" => Ok(LoopClosure::Append),
            "adjust_last" => Ok(LoopClosure::AdjustLast),
            other => Err(CompileError::invalid(format!(
                "unknown loop closure mode '{other}' (expected 'append' or 'adjust_last')"
            ))),
        }
    }
}

/// Guarantee `curve[0].v == curve[last].v` so the curve can loop
/// seamlessly.
pub fn ensure_loop_ready(curve: &Curve, mode: LoopClosure) -> Curve {
    let first = curve.first_v();
    if (curve.last_v() - first).abs() < f64::EPSILON {
        return curve.clone();
    }
    let mut points: Vec<CurvePoint> = curve.points().to_vec();
    match mode {
        LoopClosure::Append => points.push(CurvePoint::new(1.0, first)),
        LoopClosure::AdjustLast => {
            if let Some(last) = points.last_mut() {
                last.v = first;
            }
        }
    }
    Curve::from_sorted(points)
}
