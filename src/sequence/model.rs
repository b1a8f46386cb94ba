use serde::{Deserialize, Serialize};

use crate::model::spec::ChannelName;

/// Metadata block at the top of a sequence file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceHead {
    pub version: String,
    #[serde(default)]
    pub author: String,
    /// Audio file the sequence is choreographed against, if any.
    #[serde(default)]
    pub media_file: String,
    pub duration_ms: u64,
}

impl Default for SequenceHead {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            author: String::new(),
            media_file: String::new(),
            duration_ms: 0,
        }
    }
}

/// One effect placement on a layer. `db_ref` and `palette_ref` index the
/// sequence-level dedup tables; referential integrity is validated by
/// the parser, not by this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectPlacement {
    pub name: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub db_ref: usize,
    pub palette_ref: usize,
}

/// All placements for one channel of one element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectLayer {
    pub channel: ChannelName,
    pub effects: Vec<EffectPlacement>,
}

/// All layers of one show element (one fixture).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementEffects {
    pub element_name: String,
    pub layers: Vec<EffectLayer>,
}

/// In-memory model of the external sequence file: a head, two shared
/// dedup tables, and per-element effect placements referencing the
/// tables by integer index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XSequence {
    pub head: SequenceHead,
    pub color_palettes: Vec<String>,
    /// Effect settings strings. Index 0 is the reserved empty
    /// "no effect" entry.
    pub effect_db: Vec<String>,
    pub elements: Vec<ElementEffects>,
}

impl XSequence {
    /// Total number of effect placements across all elements and layers.
    pub fn placement_count(&self) -> usize {
        self.elements
            .iter()
            .flat_map(|e| &e.layers)
            .map(|l| l.effects.len())
            .sum()
    }
}
