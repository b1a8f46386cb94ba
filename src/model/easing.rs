use serde::{Deserialize, Serialize};

/// Easing curve family. Combined with [`EaseDirection`] this covers the
/// standard CSS/web-animation easing set used by the curve generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EaseFamily {
    #[default]
    Sine,
    Quad,
    Cubic,
    Quart,
    Expo,
    Back,
    Bounce,
}

/// Which end of the motion the easing slows down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EaseDirection {
    In,
    Out,
    #[default]
    InOut,
}

/// An easing function: `evaluate(t)` maps normalized input [0,1] to the
/// eased output. Output is typically in [0,1] but may overshoot for Back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Easing {
    pub family: EaseFamily,
    pub direction: EaseDirection,
}

impl Easing {
    pub fn new(family: EaseFamily, direction: EaseDirection) -> Self {
        Self { family, direction }
    }

    /// Evaluate at normalized time `t` (clamped to [0,1]).
    pub fn evaluate(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self.direction {
            EaseDirection::In => ease_in(self.family, t),
            EaseDirection::Out => 1.0 - ease_in(self.family, 1.0 - t),
            EaseDirection::InOut => {
                if t < 0.5 {
                    0.5 * ease_in(self.family, 2.0 * t)
                } else {
                    1.0 - 0.5 * ease_in(self.family, 2.0 - 2.0 * t)
                }
            }
        }
    }
}

/// The ease-in primitive for each family; Out and InOut are derived from
/// it by reflection, which keeps every family's endpoints exact.
fn ease_in(family: EaseFamily, t: f64) -> f64 {
    match family {
        EaseFamily::Sine => 1.0 - (t * std::f64::consts::FRAC_PI_2).cos(),
        EaseFamily::Quad => t * t,
        EaseFamily::Cubic => t * t * t,
        EaseFamily::Quart => t * t * t * t,
        EaseFamily::Expo => {
            if t == 0.0 {
                0.0
            } else {
                (2.0f64).powf(10.0 * (t - 1.0))
            }
        }
        EaseFamily::Back => {
            const C: f64 = 1.70158;
            (C + 1.0) * t * t * t - C * t * t
        }
        EaseFamily::Bounce => 1.0 - bounce_out(1.0 - t),
    }
}

/// Bounce-out helper (standard piecewise parabola implementation).
#[allow(clippy::unreadable_literal)]
fn bounce_out(t: f64) -> f64 {
    const N: f64 = 7.5625;
    const D: f64 = 2.75;

    if t < 1.0 / D {
        N * t * t
    } else if t < 2.0 / D {
        let t = t - 1.5 / D;
        N * t * t + 0.75
    } else if t < 2.5 / D {
        let t = t - 2.25 / D;
        N * t * t + 0.9375
    } else {
        let t = t - 2.625 / D;
        N * t * t + 0.984375
    }
}
