use serde::Serialize;

use crate::{Error, Result};

/// A half-open time interval `[start, end)` in seconds.
///
/// Degenerate segments (`start == end`) are allowed — they mark zero-duration
/// events such as speaker-change points — and contribute zero duration to
/// every metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
}

impl Segment {
    /// Create a segment, rejecting malformed intervals up front.
    ///
    /// `end < start`, a negative start, or a non-finite bound is a caller
    /// error: we fail here rather than silently clamping inside a metric.
    pub fn new(start: f64, end: f64) -> Result<Self> {
        if !start.is_finite() || !end.is_finite() || start < 0.0 || end < start {
            return Err(Error::InvalidSegment { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether this segment has zero duration.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Strict overlap test: shared duration must be positive.
    pub fn overlaps(&self, other: &Segment) -> bool {
        self.start.max(other.start) < self.end.min(other.end)
    }

    /// Duration shared with `other`, zero when disjoint.
    pub fn overlap_duration(&self, other: &Segment) -> f64 {
        (self.end.min(other.end) - self.start.max(other.start)).max(0.0)
    }

    /// The overlapping part of two segments, if any.
    pub fn intersection(&self, other: &Segment) -> Option<Segment> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if start < end {
            Some(Segment { start, end })
        } else {
            None
        }
    }

    /// Ordering by `(start, end)` using total float ordering.
    ///
    /// `Segment` holds `f64` and so cannot implement `Ord`; sorting sites use
    /// this comparator instead.
    pub fn cmp_by_time(&self, other: &Segment) -> std::cmp::Ordering {
        self.start
            .total_cmp(&other.start)
            .then(self.end.total_cmp(&other.end))
    }
}
