use crate::error::CompileError;
use crate::model::segment::ScheduledInstance;
use crate::model::spec::{RemainderPolicy, RepeatContract};

/// Output of the repeat scheduler: the concrete instances of one step
/// within a playback window, plus non-fatal diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct RepeatSchedule {
    pub instances: Vec<ScheduledInstance>,
    pub num_complete_cycles: usize,
    pub warnings: Vec<String>,
}

/// Compute the repeat instances of a step within `duration_bars` of its
/// contract. Instances are bar-relative to the window start:
/// `start = i * cycle_bars`, `end = start + cycle_bars`,
/// `cycle_number = i` for each complete cycle `i`.
///
/// A window shorter than one cycle yields zero instances and a warning —
/// a valid (if probably unintended) configuration, not an error. A
/// partial trailing cycle is dropped or emitted truncated according to
/// the contract's explicit remainder policy.
///
/// # Errors
///
/// `InvalidArgument` if `cycle_bars` or `duration_bars` is not strictly
/// positive.
pub fn schedule_repeats(
    step_id: &str,
    contract: &RepeatContract,
    duration_bars: f64,
) -> Result<RepeatSchedule, CompileError> {
    if contract.cycle_bars <= 0.0 {
        return Err(CompileError::invalid(format!(
            "repeat contract for step '{step_id}' requires cycle_bars > 0, got {}",
            contract.cycle_bars
        )));
    }
    if duration_bars <= 0.0 {
        return Err(CompileError::invalid(format!(
            "cannot schedule step '{step_id}' over a non-positive window of {duration_bars} bars"
        )));
    }

    let mut warnings = Vec::new();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let num_complete_cycles = (duration_bars / contract.cycle_bars).floor() as usize;

    if num_complete_cycles == 0 {
        warnings.push(format!(
            "step '{step_id}': window of {duration_bars} bars is shorter than one \
             {}-bar cycle; no instances scheduled",
            contract.cycle_bars
        ));
    }

    let mut instances = Vec::with_capacity(num_complete_cycles);
    for i in 0..num_complete_cycles {
        #[allow(clippy::cast_precision_loss)]
        let start_bars = i as f64 * contract.cycle_bars;
        instances.push(ScheduledInstance {
            step_id: step_id.to_string(),
            start_bars,
            end_bars: start_bars + contract.cycle_bars,
            cycle_number: i,
        });
    }

    // Partial trailing cycle.
    #[allow(clippy::cast_precision_loss)]
    let covered = num_complete_cycles as f64 * contract.cycle_bars;
    let remainder = duration_bars - covered;
    if remainder > 1e-9 && num_complete_cycles > 0 {
        match contract.remainder {
            RemainderPolicy::Drop => {}
            RemainderPolicy::Truncate => {
                instances.push(ScheduledInstance {
                    step_id: step_id.to_string(),
                    start_bars: covered,
                    end_bars: duration_bars,
                    cycle_number: num_complete_cycles,
                });
            }
        }
    }

    Ok(RepeatSchedule {
        instances,
        num_complete_cycles,
        warnings,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::model::spec::RepeatMode;

    fn contract(cycle_bars: f64, remainder: RemainderPolicy) -> RepeatContract {
        RepeatContract {
            cycle_bars,
            mode: RepeatMode::Loop,
            remainder,
        }
    }

    #[test]
    fn exact_multiple_yields_k_instances_no_gaps() {
        let s = schedule_repeats("s", &contract(2.0, RemainderPolicy::Drop), 8.0).unwrap();
        assert_eq!(s.num_complete_cycles, 4);
        assert_eq!(s.instances.len(), 4);
        assert!(s.warnings.is_empty());
        for (i, inst) in s.instances.iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let expected_start = i as f64 * 2.0;
            assert!((inst.start_bars - expected_start).abs() < 1e-12);
            assert!((inst.duration_bars() - 2.0).abs() < 1e-12);
            assert_eq!(inst.cycle_number, i);
        }
        // No gaps, no overlaps.
        for w in s.instances.windows(2) {
            assert!((w[1].start_bars - w[0].end_bars).abs() < 1e-12);
        }
    }

    #[test]
    fn window_shorter_than_cycle_warns() {
        let s = schedule_repeats("s", &contract(4.0, RemainderPolicy::Drop), 2.0).unwrap();
        assert_eq!(s.num_complete_cycles, 0);
        assert!(s.instances.is_empty());
        assert_eq!(s.warnings.len(), 1);
        assert!(s.warnings[0].contains("shorter than one"));
    }

    #[test]
    fn remainder_dropped_by_default_policy() {
        let s = schedule_repeats("s", &contract(2.0, RemainderPolicy::Drop), 7.0).unwrap();
        assert_eq!(s.num_complete_cycles, 3);
        assert_eq!(s.instances.len(), 3);
        assert!((s.instances[2].end_bars - 6.0).abs() < 1e-12);
    }

    #[test]
    fn remainder_truncated_when_contracted() {
        let s = schedule_repeats("s", &contract(2.0, RemainderPolicy::Truncate), 7.0).unwrap();
        assert_eq!(s.num_complete_cycles, 3);
        assert_eq!(s.instances.len(), 4);
        let tail = &s.instances[3];
        assert!((tail.start_bars - 6.0).abs() < 1e-12);
        assert!((tail.end_bars - 7.0).abs() < 1e-12);
        assert_eq!(tail.cycle_number, 3);
    }

    #[test]
    fn ping_pong_parity_visible_via_cycle_number() {
        let c = RepeatContract {
            cycle_bars: 1.0,
            mode: RepeatMode::PingPong,
            remainder: RemainderPolicy::Drop,
        };
        let s = schedule_repeats("s", &c, 4.0).unwrap();
        let parities: Vec<usize> = s.instances.iter().map(|i| i.cycle_number % 2).collect();
        assert_eq!(parities, vec![0, 1, 0, 1]);
    }

    #[test]
    fn non_positive_cycle_is_contract_error() {
        assert!(matches!(
            schedule_repeats("s", &contract(0.0, RemainderPolicy::Drop), 4.0),
            Err(CompileError::InvalidArgument { .. })
        ));
        assert!(matches!(
            schedule_repeats("s", &contract(-1.0, RemainderPolicy::Drop), 4.0),
            Err(CompileError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn fractional_cycle_bars() {
        let s = schedule_repeats("s", &contract(1.5, RemainderPolicy::Drop), 6.0).unwrap();
        assert_eq!(s.num_complete_cycles, 4);
        assert!((s.instances[3].end_bars - 6.0).abs() < 1e-12);
    }
}
