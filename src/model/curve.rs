use serde::{Deserialize, Serialize};

/// A single sample on a value curve. Time `t` is normalized to [0, 1];
/// `v` is normalized [0, 1] while the curve is abstract and becomes an
/// absolute channel value (e.g. 0-255 DMX) after mapping. `v` is
/// therefore deliberately never clamped by this type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub t: f64,
    pub v: f64,
}

impl CurvePoint {
    pub fn new(t: f64, v: f64) -> Self {
        Self { t, v }
    }
}

/// Piecewise-linear value curve. Points are ordered by non-decreasing `t`;
/// equal consecutive `t` values are permitted and represent a vertical
/// step. Any curve that will be sampled or converted has at least 2 points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CurveRaw")]
pub struct Curve {
    points: Vec<CurvePoint>,
}

#[derive(Deserialize)]
struct CurveRaw {
    points: Vec<CurvePoint>,
}

impl TryFrom<CurveRaw> for Curve {
    type Error = String;
    fn try_from(raw: CurveRaw) -> Result<Self, String> {
        Curve::new(raw.points).ok_or_else(|| "Curve requires at least 2 points".to_string())
    }
}

impl Curve {
    /// Create a curve from a list of points. Requires at least 2 points.
    /// `t` is clamped to [0, 1] and the points are stably sorted by `t`
    /// (stable so vertical steps keep their order). `v` is left untouched.
    pub fn new(mut points: Vec<CurvePoint>) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        for p in &mut points {
            p.t = p.t.clamp(0.0, 1.0);
        }
        points.sort_by(|a, b| a.t.partial_cmp(&b.t).unwrap_or(std::cmp::Ordering::Equal));
        Some(Self { points })
    }

    /// Linear ramp from (0,0) to (1,1).
    pub fn linear() -> Self {
        Self {
            points: vec![CurvePoint::new(0.0, 0.0), CurvePoint::new(1.0, 1.0)],
        }
    }

    /// Flat line at the given value.
    pub fn constant(v: f64) -> Self {
        Self {
            points: vec![CurvePoint::new(0.0, v), CurvePoint::new(1.0, v)],
        }
    }

    /// Access the underlying points.
    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Value of the first sample. The point list is never empty.
    pub fn first_v(&self) -> f64 {
        self.points.first().map_or(0.0, |p| p.v)
    }

    /// Value of the last sample.
    pub fn last_v(&self) -> f64 {
        self.points.last().map_or(0.0, |p| p.v)
    }

    /// Evaluate the curve at time `t` (clamped to [0, 1]).
    /// Binary search for O(log n) lookup with linear interpolation.
    pub fn evaluate(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);

        // First point with t > input t.
        let idx = self.points.partition_point(|p| p.t <= t);

        if idx == 0 {
            return self.first_v();
        }
        if idx >= self.points.len() {
            return self.last_v();
        }

        let (a, b) = match (self.points.get(idx - 1), self.points.get(idx)) {
            (Some(a), Some(b)) => (a, b),
            _ => return self.last_v(),
        };
        let dt = b.t - a.t;
        if dt <= 0.0 {
            return a.v;
        }

        let frac = (t - a.t) / dt;
        a.v + (b.v - a.v) * frac
    }

    /// Apply a function to every value, keeping the time grid.
    pub fn map_values(&self, mut f: impl FnMut(f64) -> f64) -> Self {
        Self {
            points: self
                .points
                .iter()
                .map(|p| CurvePoint::new(p.t, f(p.v)))
                .collect(),
        }
    }

    /// Rebuild from raw points without re-validation or re-sorting.
    /// Internal helper for transforms that preserve the non-decreasing
    /// time invariant by construction.
    pub(crate) fn from_sorted(points: Vec<CurvePoint>) -> Self {
        Self { points }
    }
}

impl Default for Curve {
    fn default() -> Self {
        Self::linear()
    }
}
