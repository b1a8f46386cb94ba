//! Compile-result → sequence-file direction: builds the in-memory
//! [`XSequence`] with deduplicated settings/palette tables, and writes
//! it out as XML.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::CompileError;
use crate::model::curve::Curve;
use crate::model::fixture::FixtureContext;
use crate::model::segment::TemplateCompileResult;
use crate::sequence::model::{EffectLayer, EffectPlacement, ElementEffects, SequenceHead, XSequence};
use crate::sequence::registry::DedupTable;

const SHAPE_EPS: f64 = 1e-9;

/// Build a sequence model from a compile result. Segments arrive sorted
/// by `(fixture_id, channel, start_ms)`, so elements and layers are
/// grouped by run. Fixtures missing from the context get a synthetic
/// element name.
pub fn export(
    result: &TemplateCompileResult,
    fixtures: &FixtureContext,
    head: SequenceHead,
) -> XSequence {
    let mut db = DedupTable::with_reserved_zero();
    let mut palettes = DedupTable::new();
    let mut elements: Vec<ElementEffects> = Vec::new();
    let mut current_fixture = None;

    for seg in result.segments() {
        let (name, settings) = settings_for_curve(&seg.curve);
        let placement = EffectPlacement {
            name: name.to_string(),
            start_ms: seg.start_ms,
            end_ms: seg.end_ms,
            db_ref: db.register(&settings),
            palette_ref: palettes.register(&format!("Channel={}", seg.channel.as_str())),
        };

        if current_fixture != Some(seg.fixture_id) {
            let element_name = fixtures
                .get(seg.fixture_id)
                .map_or_else(|| format!("fixture-{}", seg.fixture_id.0), |f| f.name.clone());
            elements.push(ElementEffects {
                element_name,
                layers: Vec::new(),
            });
            current_fixture = Some(seg.fixture_id);
        }
        if let Some(element) = elements.last_mut() {
            match element.layers.last_mut() {
                Some(layer) if layer.channel == seg.channel => layer.effects.push(placement),
                _ => element.layers.push(EffectLayer {
                    channel: seg.channel,
                    effects: vec![placement],
                }),
            }
        }
    }

    XSequence {
        head,
        color_palettes: palettes.into_entries(),
        effect_db: db.into_entries(),
        elements,
    }
}

/// Effect name and settings string for one compiled curve. Flat and
/// linear curves render as compact native parameter strings the target
/// renderer evaluates itself; everything else is materialized as an
/// explicit point array.
pub fn settings_for_curve(curve: &Curve) -> (&'static str, String) {
    let points = curve.points();
    let first = curve.first_v();
    let last = curve.last_v();

    if points.iter().all(|p| (p.v - first).abs() < SHAPE_EPS) {
        return ("Flat", format!("Type=Flat|Level={}", fmt(first)));
    }
    let linear = points
        .iter()
        .all(|p| (p.v - (first + (last - first) * p.t)).abs() < SHAPE_EPS);
    if linear {
        return (
            "Ramp",
            format!("Type=Ramp|Start={}|End={}", fmt(first), fmt(last)),
        );
    }
    let values: Vec<String> = points
        .iter()
        .map(|p| format!("{}:{}", fmt(p.t), fmt(p.v)))
        .collect();
    ("Custom", format!("Type=Custom|Values={}", values.join(";")))
}

fn fmt(x: f64) -> String {
    format!("{x:.4}")
}

/// Serialize a sequence model to XML bytes.
///
/// # Errors
///
/// `IoError`/`XmlError` on writer failures.
pub fn write(seq: &XSequence) -> Result<Vec<u8>, CompileError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("XSequence");
    root.push_attribute(("version", seq.head.version.as_str()));
    root.push_attribute(("author", seq.head.author.as_str()));
    root.push_attribute(("media", seq.head.media_file.as_str()));
    root.push_attribute(("durationMs", seq.head.duration_ms.to_string().as_str()));
    writer.write_event(Event::Start(root))?;

    write_table(&mut writer, "ColorPalettes", "ColorPalette", &seq.color_palettes)?;
    write_table(&mut writer, "EffectDB", "Effect", &seq.effect_db)?;

    writer.write_event(Event::Start(BytesStart::new("Elements")))?;
    for element in &seq.elements {
        let mut start = BytesStart::new("Element");
        start.push_attribute(("name", element.element_name.as_str()));
        writer.write_event(Event::Start(start))?;
        for layer in &element.layers {
            let mut layer_start = BytesStart::new("EffectLayer");
            layer_start.push_attribute(("channel", layer.channel.as_str()));
            writer.write_event(Event::Start(layer_start))?;
            for effect in &layer.effects {
                let mut e = BytesStart::new("Effect");
                e.push_attribute(("name", effect.name.as_str()));
                e.push_attribute(("startMs", effect.start_ms.to_string().as_str()));
                e.push_attribute(("endMs", effect.end_ms.to_string().as_str()));
                e.push_attribute(("ref", effect.db_ref.to_string().as_str()));
                e.push_attribute(("palette", effect.palette_ref.to_string().as_str()));
                writer.write_event(Event::Empty(e))?;
            }
            writer.write_event(Event::End(BytesEnd::new("EffectLayer")))?;
        }
        writer.write_event(Event::End(BytesEnd::new("Element")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("Elements")))?;

    writer.write_event(Event::End(BytesEnd::new("XSequence")))?;
    Ok(writer.into_inner())
}

fn write_table(
    writer: &mut Writer<Vec<u8>>,
    table: &str,
    entry: &str,
    values: &[String],
) -> Result<(), CompileError> {
    writer.write_event(Event::Start(BytesStart::new(table)))?;
    for value in values {
        if value.is_empty() {
            writer.write_event(Event::Empty(BytesStart::new(entry)))?;
        } else {
            writer.write_event(Event::Start(BytesStart::new(entry)))?;
            writer.write_event(Event::Text(BytesText::new(value)))?;
            writer.write_event(Event::End(BytesEnd::new(entry)))?;
        }
    }
    writer.write_event(Event::End(BytesEnd::new(table)))?;
    Ok(())
}
