use std::collections::HashMap;

use crate::model::fixture::FixtureId;
use crate::model::spec::PhaseOffsetMode;

/// Compute the normalized time offset for every fixture in an ordered
/// group. Offsets are a pure function of list position and count — never
/// of the identifier values — so two contexts listing the same fixtures
/// in the same order always get identical offsets.
///
/// - `None`: all zero.
/// - `UniformSpread`: `i / n` for the fixture at index `i`, evenly
///   covering `[0, 1)` (the classic chase look).
/// - `Custom`: the explicit map; unspecified fixtures default to 0.
pub fn calculate_offsets(
    fixtures: &[FixtureId],
    mode: &PhaseOffsetMode,
) -> HashMap<FixtureId, f64> {
    match mode {
        PhaseOffsetMode::None => fixtures.iter().map(|id| (*id, 0.0)).collect(),
        PhaseOffsetMode::UniformSpread => {
            let n = fixtures.len();
            fixtures
                .iter()
                .enumerate()
                .map(|(i, id)| {
                    #[allow(clippy::cast_precision_loss)]
                    let offset = if n == 0 { 0.0 } else { i as f64 / n as f64 };
                    (*id, offset)
                })
                .collect()
        }
        PhaseOffsetMode::Custom { offsets } => fixtures
            .iter()
            .map(|id| (*id, offsets.get(id).copied().unwrap_or(0.0)))
            .collect(),
    }
}
