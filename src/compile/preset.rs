use crate::error::CompileError;
use crate::model::template::{DefaultsPatch, StepPatch, Template, TemplatePreset, TemplateStep};

/// Apply a preset to a template, producing a new template. The base is
/// never mutated. Patch semantics are field-level: a `None` field leaves
/// the base value in place, a `Some` field overwrites it wholesale (no
/// deep merge inside geometry/movement/dimmer specs).
///
/// # Errors
///
/// `NotFound` if the preset patches a `step_id` the template does not
/// have. This is checked up front, before any merging, so a failed apply
/// does no partial work.
pub fn apply_preset(
    template: &Template,
    preset: &TemplatePreset,
) -> Result<Template, CompileError> {
    for step_id in preset.step_patches.keys() {
        if template.step(step_id).is_none() {
            return Err(CompileError::not_found(format!(
                "preset '{}' patches step '{step_id}', which template '{}' does not define",
                preset.preset_id, template.template_id
            )));
        }
    }

    let mut merged = template.clone();
    merge_defaults(&mut merged, &preset.defaults_patch);
    for step in &mut merged.steps {
        if let Some(patch) = preset.step_patches.get(&step.step_id) {
            merge_step(step, patch);
        }
    }
    Ok(merged)
}

fn merge_defaults(template: &mut Template, patch: &DefaultsPatch) {
    if let Some(intensity) = patch.intensity {
        template.defaults.intensity = intensity;
    }
    if let Some(amplitude_scale) = patch.amplitude_scale {
        template.defaults.amplitude_scale = amplitude_scale;
    }
    if let Some(modifiers) = &patch.modifiers {
        template.defaults.modifiers = modifiers.clone();
    }
}

/// Overlay a single step with a patch. Also used by the compiler for
/// plan-level per-cycle overrides.
pub fn merge_step(step: &mut TemplateStep, patch: &StepPatch) {
    if let Some(duration_bars) = patch.duration_bars {
        step.base_timing.duration_bars = duration_bars;
    }
    if let Some(geometry) = &patch.geometry {
        step.geometry = geometry.clone();
    }
    if let Some(movement) = &patch.movement {
        step.movement = movement.clone();
    }
    if let Some(dimmer) = &patch.dimmer {
        step.dimmer = dimmer.clone();
    }
    if let Some(phase_offset) = &patch.phase_offset {
        step.phase_offset = phase_offset.clone();
    }
    if let Some(contract) = &patch.repeat_contract {
        step.repeat_contract = Some(contract.clone());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::spec::{DimmerSpec, GeometrySpec, MovementSpec};
    use crate::model::template::{BarTiming, TemplateDefaults};
    use std::collections::HashMap;

    fn base_template() -> Template {
        Template {
            template_id: "sweep_show".into(),
            steps: vec![
                TemplateStep {
                    step_id: "intro".into(),
                    base_timing: BarTiming { duration_bars: 4.0 },
                    geometry: GeometrySpec::Hold,
                    movement: MovementSpec::None,
                    dimmer: DimmerSpec::Hold { level: 0.5 },
                    phase_offset: crate::model::spec::PhaseOffsetMode::None,
                    repeat_contract: None,
                },
                TemplateStep {
                    step_id: "drop".into(),
                    base_timing: BarTiming { duration_bars: 8.0 },
                    geometry: GeometrySpec::Hold,
                    movement: MovementSpec::None,
                    dimmer: DimmerSpec::Off,
                    phase_offset: crate::model::spec::PhaseOffsetMode::None,
                    repeat_contract: None,
                },
            ],
            defaults: TemplateDefaults::default(),
        }
    }

    #[test]
    fn unknown_step_id_fails_before_merging() {
        let template = base_template();
        let preset = TemplatePreset {
            preset_id: "loud".into(),
            defaults_patch: DefaultsPatch {
                intensity: Some(0.1),
                ..DefaultsPatch::default()
            },
            step_patches: HashMap::from([("no_such_step".into(), StepPatch::default())]),
        };
        let err = apply_preset(&template, &preset).unwrap_err();
        assert!(matches!(err, CompileError::NotFound { .. }));
    }

    #[test]
    fn base_template_is_untouched() {
        let template = base_template();
        let preset = TemplatePreset {
            preset_id: "quiet".into(),
            defaults_patch: DefaultsPatch {
                intensity: Some(0.3),
                ..DefaultsPatch::default()
            },
            step_patches: HashMap::new(),
        };
        let merged = apply_preset(&template, &preset).unwrap();
        assert!((template.defaults.intensity - 1.0).abs() < 1e-9);
        assert!((merged.defaults.intensity - 0.3).abs() < 1e-9);
    }

    #[test]
    fn none_fields_preserve_base_values() {
        let template = base_template();
        let preset = TemplatePreset {
            preset_id: "retime".into(),
            defaults_patch: DefaultsPatch::default(),
            step_patches: HashMap::from([(
                "intro".into(),
                StepPatch {
                    duration_bars: Some(2.0),
                    ..StepPatch::default()
                },
            )]),
        };
        let merged = apply_preset(&template, &preset).unwrap();
        let intro = merged.step("intro").unwrap();
        assert!((intro.base_timing.duration_bars - 2.0).abs() < 1e-9);
        // Unpatched fields and unpatched steps survive untouched.
        assert_eq!(intro.dimmer, DimmerSpec::Hold { level: 0.5 });
        assert_eq!(merged.step("drop").unwrap(), template.step("drop").unwrap());
    }

    #[test]
    fn spec_overrides_replace_wholesale() {
        let template = base_template();
        let preset = TemplatePreset {
            preset_id: "blackout_drop".into(),
            defaults_patch: DefaultsPatch {
                modifiers: Some(vec!["mirror".into()]),
                ..DefaultsPatch::default()
            },
            step_patches: HashMap::from([(
                "drop".into(),
                StepPatch {
                    dimmer: Some(DimmerSpec::Hold { level: 1.0 }),
                    ..StepPatch::default()
                },
            )]),
        };
        let merged = apply_preset(&template, &preset).unwrap();
        assert_eq!(
            merged.step("drop").unwrap().dimmer,
            DimmerSpec::Hold { level: 1.0 }
        );
        assert_eq!(merged.defaults.modifiers, vec!["mirror".to_string()]);
    }
}
