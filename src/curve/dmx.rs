use crate::model::curve::Curve;

/// Result of mapping a normalized curve to absolute channel values.
/// `clamped` reports whether any sample hit the range limits, so callers
/// can surface the (intentional, silent) clamp as a diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedCurve {
    pub curve: Curve,
    pub clamped: bool,
}

/// Offset-centered mapping for movement channels:
/// `value = base + amplitude * (v - 0.5)`, clamped to
/// `[clamp_min, clamp_max]`. A normalized value of 0.5 means "no offset
/// from the base pose", so it maps to exactly `base` regardless of
/// amplitude (before clamping).
///
/// Total function: out-of-range inputs are silently clamped. Validation
/// belongs earlier, at spec construction; this late stage favors
/// robustness.
pub fn movement_curve_to_dmx(
    curve: &Curve,
    base: f64,
    amplitude: f64,
    clamp_min: f64,
    clamp_max: f64,
) -> MappedCurve {
    map_with(curve, clamp_min, clamp_max, |v| base + amplitude * (v - 0.5))
}

/// Absolute mapping for dimmer-style channels:
/// `value = clamp_min + v * (clamp_max - clamp_min)`, clamped. The
/// normalized value directly represents a brightness fraction.
pub fn dimmer_curve_to_dmx(curve: &Curve, clamp_min: f64, clamp_max: f64) -> MappedCurve {
    map_with(curve, clamp_min, clamp_max, |v| {
        clamp_min + v * (clamp_max - clamp_min)
    })
}

fn map_with(
    curve: &Curve,
    clamp_min: f64,
    clamp_max: f64,
    f: impl Fn(f64) -> f64,
) -> MappedCurve {
    // Stay total even for a degenerate (inverted) clamp range.
    let (lo, hi) = if clamp_min <= clamp_max {
        (clamp_min, clamp_max)
    } else {
        (clamp_max, clamp_min)
    };
    let mut clamped = false;
    let mapped = curve.map_values(|v| {
        let raw = f(v);
        let out = raw.clamp(lo, hi);
        if (out - raw).abs() > f64::EPSILON {
            clamped = true;
        }
        out
    });
    MappedCurve {
        curve: mapped,
        clamped,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::model::curve::CurvePoint;

    #[test]
    fn midpoint_maps_to_base_regardless_of_amplitude() {
        let c = Curve::constant(0.5);
        for amplitude in [0.0, 10.0, 500.0] {
            let m = movement_curve_to_dmx(&c, 127.5, amplitude, 0.0, 255.0);
            assert!((m.curve.first_v() - 127.5).abs() < 1e-9, "amp={amplitude}");
            assert!(!m.clamped);
        }
    }

    #[test]
    fn movement_clamps_out_of_range() {
        // Spec scenario: v=1.0, base 300, amplitude 50 → 325 → clamped 255.
        let c = Curve::constant(1.0);
        let m = movement_curve_to_dmx(&c, 300.0, 50.0, 0.0, 255.0);
        assert!((m.curve.first_v() - 255.0).abs() < 1e-9);
        assert!(m.clamped);
    }

    #[test]
    fn dimmer_is_affine_over_range() {
        let c = Curve::new(vec![
            CurvePoint::new(0.0, 0.0),
            CurvePoint::new(0.5, 0.5),
            CurvePoint::new(1.0, 1.0),
        ])
        .unwrap();
        let m = dimmer_curve_to_dmx(&c, 10.0, 210.0);
        assert!((m.curve.points()[0].v - 10.0).abs() < 1e-9);
        assert!((m.curve.points()[1].v - 110.0).abs() < 1e-9);
        assert!((m.curve.points()[2].v - 210.0).abs() < 1e-9);
        assert!(!m.clamped);
    }

    #[test]
    fn dimmer_is_order_preserving() {
        let c = Curve::new(vec![
            CurvePoint::new(0.0, 0.2),
            CurvePoint::new(0.5, 0.6),
            CurvePoint::new(1.0, 0.9),
        ])
        .unwrap();
        let m = dimmer_curve_to_dmx(&c, 0.0, 255.0);
        let vs: Vec<f64> = m.curve.points().iter().map(|p| p.v).collect();
        assert!(vs.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn dimmer_clamps_overdriven_input() {
        let c = Curve::constant(1.4);
        let m = dimmer_curve_to_dmx(&c, 0.0, 255.0);
        assert!((m.curve.first_v() - 255.0).abs() < 1e-9);
        assert!(m.clamped);
    }

    #[test]
    fn total_even_for_inverted_range() {
        // clamp_max < clamp_min never panics; output pins to the clamp call's result.
        let c = Curve::constant(0.5);
        let m = dimmer_curve_to_dmx(&c, 255.0, 255.0);
        assert!((m.curve.first_v() - 255.0).abs() < 1e-9);
    }
}
