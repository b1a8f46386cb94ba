//! Sequence-file → model direction: event-driven XML parsing with
//! referential-integrity validation of the dedup table indices.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::CompileError;
use crate::model::spec::ChannelName;
use crate::sequence::model::{EffectLayer, EffectPlacement, ElementEffects, SequenceHead, XSequence};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Prelude,
    ColorPalettes,
    EffectDb,
    Elements,
}

/// Parse a serialized sequence back into the in-memory model.
///
/// # Errors
///
/// `MalformedSequence` for structural problems (missing root, missing
/// attributes, unparseable numbers, unknown channel names);
/// `InvalidIndex` when a placement references a table entry that does
/// not exist; `XmlError` for XML-level failures.
pub fn parse(bytes: &[u8]) -> Result<XSequence, CompileError> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::with_capacity(4096);

    let mut head: Option<SequenceHead> = None;
    let mut color_palettes: Vec<String> = Vec::new();
    let mut effect_db: Vec<String> = Vec::new();
    let mut elements: Vec<ElementEffects> = Vec::new();

    let mut section = Section::Prelude;
    let mut entry_text: Option<String> = None;
    let mut current_element: Option<ElementEffects> = None;
    let mut current_layer: Option<EffectLayer> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match name.as_str() {
                    "XSequence" => head = Some(parse_head(e)?),
                    "ColorPalettes" => section = Section::ColorPalettes,
                    "EffectDB" => section = Section::EffectDb,
                    "Elements" => section = Section::Elements,
                    "ColorPalette" if section == Section::ColorPalettes => {
                        entry_text = Some(String::new());
                    }
                    "Effect" if section == Section::EffectDb => {
                        entry_text = Some(String::new());
                    }
                    // Placements are written self-closing, but an
                    // equivalent <Effect ...></Effect> form is legal XML
                    // and carries the same attributes.
                    "Effect" if section == Section::Elements => {
                        let placement = parse_placement(e)?;
                        match &mut current_layer {
                            Some(layer) => layer.effects.push(placement),
                            None => {
                                return Err(CompileError::MalformedSequence {
                                    message: "Effect placement outside an EffectLayer".into(),
                                })
                            }
                        }
                    }
                    "Element" if section == Section::Elements => {
                        current_element = Some(ElementEffects {
                            element_name: require_attr(e, "name")?,
                            layers: Vec::new(),
                        });
                    }
                    "EffectLayer" if section == Section::Elements => {
                        current_layer = Some(EffectLayer {
                            channel: parse_channel(e)?,
                            effects: Vec::new(),
                        });
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match name.as_str() {
                    "ColorPalette" if section == Section::ColorPalettes => {
                        color_palettes.push(String::new());
                    }
                    "Effect" if section == Section::EffectDb => {
                        effect_db.push(String::new());
                    }
                    "Effect" if section == Section::Elements => {
                        let placement = parse_placement(e)?;
                        match &mut current_layer {
                            Some(layer) => layer.effects.push(placement),
                            None => {
                                return Err(CompileError::MalformedSequence {
                                    message: "Effect placement outside an EffectLayer".into(),
                                })
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(ref t)) => {
                if let Some(text) = &mut entry_text {
                    text.push_str(&t.unescape()?);
                }
            }
            Ok(Event::End(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match name.as_str() {
                    "ColorPalette" if section == Section::ColorPalettes => {
                        color_palettes.push(entry_text.take().unwrap_or_default());
                    }
                    "Effect" if section == Section::EffectDb => {
                        effect_db.push(entry_text.take().unwrap_or_default());
                    }
                    "EffectLayer" => {
                        if let (Some(element), Some(layer)) =
                            (&mut current_element, current_layer.take())
                        {
                            element.layers.push(layer);
                        }
                    }
                    "Element" => {
                        if let Some(element) = current_element.take() {
                            elements.push(element);
                        }
                    }
                    _ => {}
                }
            }
            Ok(_) => {}
            Err(e) => return Err(e.into()),
        }
        buf.clear();
    }

    let head = head.ok_or_else(|| CompileError::MalformedSequence {
        message: "missing XSequence root element".into(),
    })?;

    let sequence = XSequence {
        head,
        color_palettes,
        effect_db,
        elements,
    };
    validate_references(&sequence)?;
    Ok(sequence)
}

fn parse_head(e: &BytesStart<'_>) -> Result<SequenceHead, CompileError> {
    Ok(SequenceHead {
        version: require_attr(e, "version")?,
        author: attr(e, "author")?.unwrap_or_default(),
        media_file: attr(e, "media")?.unwrap_or_default(),
        duration_ms: parse_u64(&require_attr(e, "durationMs")?, "durationMs")?,
    })
}

fn parse_channel(e: &BytesStart<'_>) -> Result<ChannelName, CompileError> {
    let raw = require_attr(e, "channel")?;
    ChannelName::parse(&raw).ok_or_else(|| CompileError::MalformedSequence {
        message: format!("unknown channel name '{raw}'"),
    })
}

fn parse_placement(e: &BytesStart<'_>) -> Result<EffectPlacement, CompileError> {
    Ok(EffectPlacement {
        name: require_attr(e, "name")?,
        start_ms: parse_u64(&require_attr(e, "startMs")?, "startMs")?,
        end_ms: parse_u64(&require_attr(e, "endMs")?, "endMs")?,
        db_ref: parse_usize(&require_attr(e, "ref")?, "ref")?,
        palette_ref: parse_usize(&require_attr(e, "palette")?, "palette")?,
    })
}

fn attr(e: &BytesStart<'_>, key: &str) -> Result<Option<String>, CompileError> {
    for a in e.attributes().flatten() {
        if a.key.as_ref() == key.as_bytes() {
            return Ok(Some(a.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn require_attr(e: &BytesStart<'_>, key: &str) -> Result<String, CompileError> {
    attr(e, key)?.ok_or_else(|| CompileError::MalformedSequence {
        message: format!(
            "<{}> is missing required attribute '{key}'",
            String::from_utf8_lossy(e.name().as_ref())
        ),
    })
}

fn parse_u64(raw: &str, field: &str) -> Result<u64, CompileError> {
    raw.parse().map_err(|_| CompileError::MalformedSequence {
        message: format!("attribute '{field}' is not a valid integer: '{raw}'"),
    })
}

fn parse_usize(raw: &str, field: &str) -> Result<usize, CompileError> {
    raw.parse().map_err(|_| CompileError::MalformedSequence {
        message: format!("attribute '{field}' is not a valid index: '{raw}'"),
    })
}

/// Every placement's table references must resolve.
fn validate_references(seq: &XSequence) -> Result<(), CompileError> {
    for element in &seq.elements {
        for layer in &element.layers {
            for effect in &layer.effects {
                if effect.db_ref >= seq.effect_db.len() {
                    return Err(CompileError::InvalidIndex {
                        what: "effect_db".into(),
                        index: effect.db_ref,
                    });
                }
                if effect.palette_ref >= seq.color_palettes.len() {
                    return Err(CompileError::InvalidIndex {
                        what: "color_palettes".into(),
                        index: effect.palette_ref,
                    });
                }
            }
        }
    }
    Ok(())
}
