use serde::{Deserialize, Serialize};

use super::curve::Curve;
use super::fixture::FixtureId;
use super::spec::ChannelName;

/// One occurrence of a repeatable step inside a playback window, in bars
/// relative to the window start. Produced by the repeat scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledInstance {
    pub step_id: String,
    pub start_bars: f64,
    pub end_bars: f64,
    pub cycle_number: usize,
}

impl ScheduledInstance {
    pub fn duration_bars(&self) -> f64 {
        self.end_bars - self.start_bars
    }
}

/// The atomic unit of compiled output: one absolute-time value curve for
/// one channel of one fixture. Curve values are absolute channel values
/// (0-255 DMX) by this point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSegment {
    pub fixture_id: FixtureId,
    pub channel: ChannelName,
    pub start_ms: u64,
    pub end_ms: u64,
    pub curve: Curve,
}

impl ChannelSegment {
    /// Sort key for the compile result's stable ordering.
    pub fn sort_key(&self) -> (FixtureId, ChannelName, u64) {
        (self.fixture_id, self.channel, self.start_ms)
    }
}

/// The full compiled artifact for one (template, plan, fixture set)
/// tuple: every channel segment, ordered by
/// `(fixture_id, channel, start_ms)`, plus non-fatal diagnostics
/// accumulated along the way. Constructed once per compile call,
/// immutable afterwards, consumed by the sequence codec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateCompileResult {
    segments: Vec<ChannelSegment>,
    warnings: Vec<String>,
}

impl TemplateCompileResult {
    /// Build a result, applying the stable ordering invariant.
    pub fn new(mut segments: Vec<ChannelSegment>, warnings: Vec<String>) -> Self {
        segments.sort_by(|a, b| {
            a.sort_key()
                .partial_cmp(&b.sort_key())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Self { segments, warnings }
    }

    pub fn segments(&self) -> &[ChannelSegment] {
        &self.segments
    }

    /// Non-fatal diagnostics (clamping, short windows, skipped modifier
    /// names). Never errors: those propagate instead of landing here.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// First pair of segments for the same (fixture, channel) that
    /// overlap in time, if any. The compiler guarantees there is none;
    /// exposed so callers and tests can verify the property.
    pub fn first_overlap(&self) -> Option<(&ChannelSegment, &ChannelSegment)> {
        self.segments.windows(2).find_map(|w| match w {
            [a, b]
                if a.fixture_id == b.fixture_id
                    && a.channel == b.channel
                    && b.start_ms < a.end_ms =>
            {
                Some((a, b))
            }
            _ => None,
        })
    }
}
