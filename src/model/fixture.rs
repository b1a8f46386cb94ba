use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::spec::ChannelName;

/// Newtype for fixture identity. Prevents mixing up fixture IDs with
/// other integers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FixtureId(pub u32);

/// Role of a fixture within the rig. Informational for the compiler
/// (templates may be authored per role); carried through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureRole {
    #[default]
    Spot,
    Wash,
    Beam,
}

/// Physical calibration for one moving-head fixture: mechanical pan/tilt
/// ranges and the DMX address of each channel. Supplied by the config
/// subsystem; the compiler only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Full mechanical pan travel in degrees (e.g. 540).
    pub pan_range_deg: f64,
    /// Full mechanical tilt travel in degrees (e.g. 270).
    pub tilt_range_deg: f64,
    /// DMX address per channel, within the fixture's footprint.
    pub channels: HashMap<ChannelName, u16>,
}

impl Calibration {
    /// DMX value for a pan pose given in degrees relative to center.
    /// Center pose (0°) maps to mid-range 127.5; not clamped here — the
    /// DMX mapping stage clamps.
    pub fn pan_deg_to_dmx(&self, deg: f64) -> f64 {
        deg_to_dmx(deg, self.pan_range_deg)
    }

    /// DMX value for a tilt pose given in degrees relative to center.
    pub fn tilt_deg_to_dmx(&self, deg: f64) -> f64 {
        deg_to_dmx(deg, self.tilt_range_deg)
    }

    /// DMX span covered by a movement amplitude given in degrees of pan.
    pub fn pan_amplitude_dmx(&self, amplitude_deg: f64) -> f64 {
        amplitude_dmx(amplitude_deg, self.pan_range_deg)
    }

    /// DMX span covered by a movement amplitude given in degrees of tilt.
    pub fn tilt_amplitude_dmx(&self, amplitude_deg: f64) -> f64 {
        amplitude_dmx(amplitude_deg, self.tilt_range_deg)
    }
}

fn deg_to_dmx(deg: f64, range_deg: f64) -> f64 {
    if range_deg <= 0.0 {
        return 127.5;
    }
    (deg / range_deg + 0.5) * 255.0
}

fn amplitude_dmx(amplitude_deg: f64, range_deg: f64) -> f64 {
    if range_deg <= 0.0 {
        return 0.0;
    }
    amplitude_deg / range_deg * 255.0
}

/// One fixture as seen by the compiler: identity plus calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureHandle {
    pub id: FixtureId,
    pub name: String,
    #[serde(default)]
    pub role: FixtureRole,
    pub calibration: Calibration,
}

/// Ordered list of fixtures a compilation targets. Order matters: phase
/// offsets are distributed by position in this list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureContext {
    pub fixtures: Vec<FixtureHandle>,
}

impl FixtureContext {
    pub fn new(fixtures: Vec<FixtureHandle>) -> Self {
        Self { fixtures }
    }

    /// Fixture IDs in context order.
    pub fn ids(&self) -> Vec<FixtureId> {
        self.fixtures.iter().map(|f| f.id).collect()
    }

    pub fn get(&self, id: FixtureId) -> Option<&FixtureHandle> {
        self.fixtures.iter().find(|f| f.id == id)
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }
}
